//! End-to-end conversations over files on disk

use std::io::Cursor;
use std::path::Path;

use parley_core::prelude::*;
use tempfile::TempDir;

fn config_in(root: &Path) -> ParleyConfig {
    let mut config = ParleyConfig::default();
    config.storage = StorageConfig {
        characters_dir: root.join("characters"),
        state_dir: root.join("logs"),
        transcript_dir: root.join("logs"),
    };
    config
}

fn write_profile(root: &Path, id: &str, json: &str) {
    let dir = root.join("characters");
    std::fs::create_dir_all(&dir).expect("Failed to create characters dir");
    std::fs::write(dir.join(format!("{id}.json")), json).expect("Failed to write profile");
}

fn transcripts(root: &Path) -> Vec<std::path::PathBuf> {
    let mut files: Vec<_> = std::fs::read_dir(root.join("logs"))
        .expect("Failed to read logs dir")
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("conversation_"))
        })
        .collect();
    files.sort();
    files
}

#[test]
fn test_conversation_persists_state_and_transcript() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = temp_dir.path();
    write_profile(root, "superman", r#"{"name": "Superman", "aliases": "Clark Kent\nKal-El"}"#);

    let config = config_in(root);
    let mut session = SessionBuilder::from_config(&config)
        .unwrap()
        .start("superman")
        .unwrap();

    let input = Cursor::new("I love you?\nI adore you\nQuit\n");
    let mut output = Vec::new();
    let summary = session.run(input, &mut output).unwrap();

    assert_eq!(summary.turns, 2);
    assert!(summary.persisted);

    let raw = std::fs::read_to_string(root.join("logs/superman_memory.json")).unwrap();
    let saved: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(saved, serde_json::json!({"attraction": 6, "trust": 5}));

    let files = transcripts(root);
    assert_eq!(files.len(), 1);
    let transcript = std::fs::read_to_string(&files[0]).unwrap();
    assert_eq!(
        transcript,
        "You: I love you?\n\
         Superman: Superman ponders your question thoughtfully.\n\
         You: I adore you\n\
         Superman: Superman smiles warmly at you.\n"
    );

    let output = String::from_utf8(output).unwrap();
    assert!(output.starts_with("Starting conversation with Superman."));
    assert!(output.ends_with("Conversation ended.\n"));
}

#[test]
fn test_state_carries_over_between_sessions() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = temp_dir.path();
    write_profile(root, "batman", r#"{"name": "Batman"}"#);
    let config = config_in(root);

    for _ in 0..2 {
        let mut session = SessionBuilder::from_config(&config)
            .unwrap()
            .start("batman")
            .unwrap();
        session
            .run(Cursor::new("I challenge you to fight\nexit\n"), std::io::sink())
            .unwrap();
    }

    let session = SessionBuilder::from_config(&config)
        .unwrap()
        .start("batman")
        .unwrap();
    assert_eq!(session.relationship().get("trust"), Some(3));
    assert_eq!(session.relationship().get("attraction"), Some(5));
}

#[test]
fn test_out_of_range_state_is_clamped_on_load() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = temp_dir.path();
    write_profile(root, "joker", r#"{"name": "Joker"}"#);
    std::fs::create_dir_all(root.join("logs")).unwrap();
    std::fs::write(
        root.join("logs/joker_memory.json"),
        r#"{"trust": -4, "attraction": 99}"#,
    )
    .unwrap();

    let session = SessionBuilder::from_config(&config_in(root))
        .unwrap()
        .start("joker")
        .unwrap();
    assert_eq!(session.relationship().get("trust"), Some(0));
    assert_eq!(session.relationship().get("attraction"), Some(10));
}

#[test]
fn test_missing_profile_creates_nothing() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = temp_dir.path();

    let err = SessionBuilder::from_config(&config_in(root))
        .unwrap()
        .start("lex_luthor")
        .unwrap_err();

    assert!(matches!(err, ParleyError::ProfileNotFound(_)));
    assert_eq!(err.to_string(), "Character profile 'lex_luthor' not found");
    assert!(!root.join("logs").exists());
}

#[test]
fn test_personas_from_profile_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = temp_dir.path();
    write_profile(
        root,
        "superman",
        r#"{
            "name": "Superman",
            "personas": {
                "clark": {"description": "Mild-mannered reporter", "stat": "trust", "min": 0},
                "superman": {"description": "The Man of Steel", "stat": "trust", "min": 7}
            }
        }"#,
    );

    let mut config = config_in(root);
    config.classifier.strategy = ClassifierStrategy::Linguistic;
    let mut session = SessionBuilder::from_config(&config)
        .unwrap()
        .start("superman")
        .unwrap();

    assert_eq!(
        session.handle_text("Do you love Lois Lane?"),
        TurnOutcome::Reply("[Clark] Superman ponders your question thoughtfully.".to_string())
    );
    session.end();
}

#[test]
fn test_invalid_bytes_are_skipped_in_run() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = temp_dir.path();
    write_profile(root, "flash", r#"{"name": "The Flash"}"#);

    let mut session = SessionBuilder::from_config(&config_in(root))
        .unwrap()
        .start("flash")
        .unwrap();

    let mut input = b"hello\n".to_vec();
    input.extend_from_slice(&[0xc3, 0x28, b'\n']);
    input.extend_from_slice(b"quit\n");

    let mut output = Vec::new();
    let summary = session.run(Cursor::new(input), &mut output).unwrap();
    assert_eq!(summary.turns, 1);
    assert_eq!(summary.skipped, 1);
    assert!(String::from_utf8(output).unwrap().contains("Input skipped"));
}

#[test]
fn test_unwritable_transcript_dir_still_chats() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = temp_dir.path();
    write_profile(root, "superman", r#"{"name": "Superman"}"#);
    std::fs::write(root.join("blocker"), "not a directory").unwrap();

    let mut config = config_in(root);
    config.storage.transcript_dir = root.join("blocker/logs");

    let mut session = SessionBuilder::from_config(&config)
        .unwrap()
        .start("superman")
        .unwrap();
    let mut output = Vec::new();
    let summary = session
        .run(Cursor::new("I adore you\nquit\n"), &mut output)
        .unwrap();

    assert_eq!(summary.turns, 1);
    assert!(summary.persisted);
    assert_eq!(summary.write_failures, 1);

    let raw = std::fs::read_to_string(root.join("logs/superman_memory.json")).unwrap();
    let saved: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(saved["attraction"], 6);
    assert!(
        String::from_utf8(output)
            .unwrap()
            .contains("Superman smiles warmly at you.")
    );
}
