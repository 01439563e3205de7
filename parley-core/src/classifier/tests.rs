//! Invariants shared by every classifier strategy

use super::*;

const SAMPLES: &[&str] = &[
    "I love you",
    "I challenge you to fight",
    "Can I hug you",
    "I'm so angry right now",
    "Yeah right, whatever",
    "haha you are joking",
    "Lois Lane says hello",
    "",
    "The weather is nice",
];

fn strategies() -> Vec<Box<dyn UtteranceClassifier>> {
    vec![
        build_classifier(ClassifierStrategy::Lexical, &Vocabulary::default()).unwrap(),
        build_classifier(ClassifierStrategy::Linguistic, &Vocabulary::default()).unwrap(),
    ]
}

#[test]
fn test_question_mark_always_wins() {
    for classifier in strategies() {
        for sample in SAMPLES {
            for text in [format!("{sample}?"), format!("?{sample}"), format!("{sample} ? ok")] {
                let signal = classifier.classify(&text);
                assert_eq!(
                    signal.intent,
                    Intent::Question,
                    "{} classified {:?} as {}",
                    classifier.strategy(),
                    text,
                    signal.intent
                );
            }
        }
    }
}

#[test]
fn test_empty_and_whitespace_input() {
    for classifier in strategies() {
        for text in ["", " ", "   \t  ", "\n"] {
            let signal = classifier.classify(text);
            assert_eq!(signal.intent, Intent::Statement);
            assert_eq!(signal.emotion, None);
            assert_eq!(signal.tone, None);
            assert_eq!(signal.target, None);
            assert_eq!(signal.text, text);
        }
    }
}

#[test]
fn test_classification_is_deterministic() {
    for classifier in strategies() {
        for sample in SAMPLES {
            assert_eq!(classifier.classify(sample), classifier.classify(sample));
        }
    }
}

#[test]
fn test_love_question_scenario() {
    for classifier in strategies() {
        let signal = classifier.classify("I love you?");
        assert_eq!(signal.intent, Intent::Question);
        assert_eq!(signal.emotion, None);
        assert_eq!(signal.tone, None);
        assert_eq!(signal.text, "I love you?");
    }
}

#[test]
fn test_emotion_priority() {
    for classifier in strategies() {
        let signal = classifier.classify("happy and sad and furious");
        assert_eq!(signal.emotion, Some(Emotion::Anger));
        let signal = classifier.classify("happy and sad");
        assert_eq!(signal.emotion, Some(Emotion::Joy));
        let signal = classifier.classify("so sad today");
        assert_eq!(signal.emotion, Some(Emotion::Sadness));
    }
}

#[test]
fn test_tone_priority() {
    for classifier in strategies() {
        let signal = classifier.classify("seriously, obviously lol");
        assert_eq!(signal.tone, Some(Tone::Sarcastic));
        let signal = classifier.classify("seriously lol");
        assert_eq!(signal.tone, Some(Tone::Serious));
        let signal = classifier.classify("lol");
        assert_eq!(signal.tone, Some(Tone::Playful));
    }
}

#[test]
fn test_intent_is_independent_of_emotion() {
    for classifier in strategies() {
        let signal = classifier.classify("I am happy to battle you");
        assert_eq!(signal.intent, Intent::Challenge);
        assert_eq!(signal.emotion, Some(Emotion::Joy));
    }
}

#[test]
fn test_custom_intent_category() {
    let mut vocabulary = Vocabulary::default();
    vocabulary
        .intents
        .insert(0, Category::new("greeting", &["hello", "hi"]));

    let classifier = build_classifier(ClassifierStrategy::Lexical, &vocabulary).unwrap();
    let signal = classifier.classify("hello, I love you");
    assert_eq!(signal.intent, Intent::Custom("greeting".to_string()));
}

#[test]
fn test_configured_question_marker() {
    let vocabulary = Vocabulary {
        question_markers: vec!["?".to_string(), "¿".to_string()],
        ..Default::default()
    };
    let classifier = build_classifier(ClassifierStrategy::Linguistic, &vocabulary).unwrap();
    assert_eq!(classifier.classify("¿me amas").intent, Intent::Question);
}

#[test]
fn test_build_rejects_malformed_vocabulary() {
    let vocabulary = Vocabulary {
        intents: vec![Category {
            label: String::new(),
            words: vec!["hello".to_string()],
        }],
        ..Default::default()
    };
    let result = build_classifier(ClassifierStrategy::Lexical, &vocabulary);
    assert!(matches!(result, Err(ParleyError::Configuration(_))));
}

#[test]
fn test_invalid_bytes_rejected() {
    for classifier in strategies() {
        let result = classifier.classify_bytes(&[0xff, 0xfe, 0x00]);
        assert!(matches!(result, Err(ParleyError::InvalidInput(_))));

        let result = classifier.classify_bytes(b"hello\x00world");
        assert!(matches!(result, Err(ParleyError::InvalidInput(_))));

        let signal = classifier.classify_bytes(b"I adore you").unwrap();
        assert_eq!(signal.intent, Intent::Flirt);
    }
}

#[test]
fn test_strategy_parsing() {
    assert_eq!(
        "Linguistic".parse::<ClassifierStrategy>().unwrap(),
        ClassifierStrategy::Linguistic
    );
    assert_eq!(
        "keyword".parse::<ClassifierStrategy>().unwrap(),
        ClassifierStrategy::Lexical
    );
    assert!("neural".parse::<ClassifierStrategy>().is_err());
}
