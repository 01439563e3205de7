//! Conversation Session
//!
//! Drives the turn loop for one character:
//!
//! ```text
//! AwaitingInput --line--> Processing --reply--> AwaitingInput
//!       |
//!       +--sentinel / end of input--> Ended
//! ```
//!
//! Each turn classifies the input, replaces the in-memory relationship state
//! with the updated one, renders a reply and appends both lines to the
//! transcript. Ending persists the final state (retried once) and closes the
//! transcript.

use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use crate::classifier::{
    ClassifierStrategy, UtteranceClassifier, Vocabulary, build_classifier, validate_utterance,
};
use crate::config::ParleyConfig;
use crate::error::{ParleyError, Result};
use crate::profile::{CharacterProfile, JsonProfileDirectory, ProfileSource};
use crate::relationship::{
    JsonFileRelationships, RelationshipState, RelationshipStore, check_character_id,
};
use crate::responder::{ResponseGenerator, title_case};
use crate::transcript::{FileTranscript, TranscriptSink};


/// Turn loop settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Inputs that end the session, compared trimmed and case-insensitively
    pub sentinels: Vec<String>,

    /// Persist relationship state after every turn, not only at the end
    pub persist_every_turn: bool,

    /// Speaker label for user lines
    pub user_label: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sentinels: vec!["quit".to_string(), "exit".to_string()],
            persist_every_turn: true,
            user_label: "You".to_string(),
        }
    }
}

impl SessionConfig {
    /// Check the settings are usable.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if there is no usable sentinel or the
    /// user label is blank.
    pub fn validate(&self) -> Result<()> {
        if self.sentinels.is_empty() || self.sentinels.iter().any(|s| s.trim().is_empty()) {
            return Err(ParleyError::Configuration(
                "session.sentinels must list at least one non-blank word".to_string(),
            ));
        }
        if self.user_label.trim().is_empty() {
            return Err(ParleyError::Configuration(
                "session.user_label must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether `input` ends the session
    pub fn is_sentinel(&self, input: &str) -> bool {
        let input = input.trim();
        self.sentinels
            .iter()
            .any(|s| s.trim().to_lowercase() == input.to_lowercase())
    }
}

/// Turn loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnState {
    /// Waiting for the next line
    AwaitingInput,
    /// Running classify, update, generate and record for one line
    Processing,
    /// Terminal
    Ended,
}

/// Result of handling one line of input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The character's reply
    Reply(String),
    /// The input was rejected; the notice is shown to the user
    Skipped(String),
    /// The session has ended
    Ended,
}

/// What a finished session did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub character_id: String,
    /// Turns that produced a reply
    pub turns: usize,
    /// Turns rejected as invalid input
    pub skipped: usize,
    /// Relationship state at the end of the session
    pub final_state: RelationshipState,
    /// Whether the final state reached persistence
    pub persisted: bool,
    /// Relationship or transcript writes that failed during the session
    pub write_failures: usize,
}

/// Assembles the collaborators of a [`ConversationSession`]
pub struct SessionBuilder {
    profiles: Arc<dyn ProfileSource>,
    store: RelationshipStore,
    classifier: Option<Box<dyn UtteranceClassifier>>,
    strategy: ClassifierStrategy,
    vocabulary: Vocabulary,
    generator: Option<ResponseGenerator>,
    transcript: Option<Box<dyn TranscriptSink>>,
    transcript_dir: Option<PathBuf>,
    settings: SessionConfig,
}

impl std::fmt::Debug for SessionBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBuilder")
            .field("store", &self.store)
            .field("strategy", &self.strategy)
            .field("transcript_dir", &self.transcript_dir)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl SessionBuilder {
    /// Builder over a profile source and relationship store. Defaults to the
    /// lexical classifier over the default vocabulary, default templates and
    /// no transcript.
    pub fn new(profiles: Arc<dyn ProfileSource>, store: RelationshipStore) -> Self {
        Self {
            profiles,
            store,
            classifier: None,
            strategy: ClassifierStrategy::default(),
            vocabulary: Vocabulary::default(),
            generator: None,
            transcript: None,
            transcript_dir: None,
            settings: SessionConfig::default(),
        }
    }

    /// Builder wired from configuration: JSON profile directory, JSON
    /// relationship files, configured classifier and templates, and a
    /// timestamped transcript file.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if any section fails validation.
    pub fn from_config(config: &ParleyConfig) -> Result<Self> {
        config.validate()?;

        let vocabulary = config.resolve_vocabulary()?;
        let profiles = Arc::new(JsonProfileDirectory::new(&config.storage.characters_dir));
        let store = RelationshipStore::new(
            Arc::new(JsonFileRelationships::new(&config.storage.state_dir)),
            config.relationship.clone(),
        )?;
        let generator = ResponseGenerator::new(config.responses.clone(), config.persona.clone())?
            .with_stat_default(config.relationship.initial_value);

        Ok(Self::new(profiles, store)
            .with_vocabulary(config.classifier.strategy, vocabulary)
            .with_generator(generator)
            .with_transcript_dir(&config.storage.transcript_dir)
            .with_settings(config.session.clone()))
    }

    /// Build the classifier with `strategy` over `vocabulary`. The character's
    /// own names are added to its people list when the session starts.
    pub fn with_vocabulary(mut self, strategy: ClassifierStrategy, vocabulary: Vocabulary) -> Self {
        self.strategy = strategy;
        self.vocabulary = vocabulary;
        self
    }

    /// Use a specific classifier instead of building one
    pub fn with_classifier(mut self, classifier: Box<dyn UtteranceClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Use a specific response generator
    pub fn with_generator(mut self, generator: ResponseGenerator) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Record the session to this sink
    pub fn with_transcript(mut self, transcript: Box<dyn TranscriptSink>) -> Self {
        self.transcript = Some(transcript);
        self
    }

    /// Record the session to a timestamped file in `dir`, unless a sink was
    /// given with [`with_transcript`](Self::with_transcript)
    pub fn with_transcript_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.transcript_dir = Some(dir.into());
        self
    }

    /// Turn loop settings
    pub fn with_settings(mut self, settings: SessionConfig) -> Self {
        self.settings = settings;
        self
    }

    /// Start a session with a character.
    ///
    /// # Errors
    ///
    /// - [`ParleyError::InvalidInput`] for an unusable identifier
    /// - [`ParleyError::ProfileNotFound`] if the character has no profile
    /// - [`ParleyError::Configuration`] for invalid settings or vocabulary
    /// - any error from loading the persisted relationship state
    ///
    /// Nothing is created on failure. A transcript file that cannot be
    /// created is logged and counted as a write failure; the session runs
    /// without one.
    pub fn start(self, character_id: &str) -> Result<ConversationSession> {
        self.settings.validate()?;
        check_character_id(character_id)?;

        let profile = self.profiles.require(character_id)?;
        let relationship = self.store.load(character_id)?;

        let classifier = match self.classifier {
            Some(classifier) => classifier,
            None => {
                let vocabulary = self.vocabulary.with_people(profile.known_names());
                build_classifier(self.strategy, &vocabulary)?
            }
        };
        let generator = self.generator.unwrap_or_else(|| {
            ResponseGenerator::default().with_stat_default(self.store.config().initial_value)
        });

        let id = Uuid::new_v4();
        let span = tracing::info_span!("session", id = %id, character = %character_id);

        let mut write_failures = 0;
        let transcript = match (self.transcript, &self.transcript_dir) {
            (Some(sink), _) => Some(sink),
            (None, Some(dir)) => match FileTranscript::create(dir, character_id) {
                Ok(file) => Some(Box::new(file) as Box<dyn TranscriptSink>),
                Err(e) => {
                    write_failures += 1;
                    span.in_scope(|| {
                        tracing::warn!(error = %e, "Transcript unavailable, continuing without one");
                    });
                    None
                }
            },
            (None, None) => None,
        };

        span.in_scope(|| {
            tracing::info!(
                strategy = %classifier.strategy(),
                state = %relationship,
                "Session started"
            );
        });

        Ok(ConversationSession {
            id,
            character_id: character_id.to_string(),
            profile,
            classifier,
            store: self.store,
            generator,
            transcript,
            settings: self.settings,
            relationship,
            state: TurnState::AwaitingInput,
            turns: 0,
            skipped: 0,
            write_failures,
            persisted: None,
            span,
        })
    }
}

/// One conversation between the user and a character
pub struct ConversationSession {
    id: Uuid,
    character_id: String,
    profile: CharacterProfile,
    classifier: Box<dyn UtteranceClassifier>,
    store: RelationshipStore,
    generator: ResponseGenerator,
    transcript: Option<Box<dyn TranscriptSink>>,
    settings: SessionConfig,
    relationship: RelationshipState,
    state: TurnState,
    turns: usize,
    skipped: usize,
    write_failures: usize,
    /// Outcome of the final persistence, once ended
    persisted: Option<bool>,
    span: tracing::Span,
}

impl std::fmt::Debug for ConversationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationSession")
            .field("id", &self.id)
            .field("character_id", &self.character_id)
            .field("state", &self.state)
            .field("relationship", &self.relationship)
            .field("turns", &self.turns)
            .finish_non_exhaustive()
    }
}

impl ConversationSession {
    /// Session identifier
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Character identifier
    pub fn character_id(&self) -> &str {
        &self.character_id
    }

    /// Character profile
    pub fn profile(&self) -> &CharacterProfile {
        &self.profile
    }

    /// Current relationship state
    pub fn relationship(&self) -> &RelationshipState {
        &self.relationship
    }

    /// Turn loop state
    pub fn state(&self) -> TurnState {
        self.state
    }

    /// Turns that produced a reply so far
    pub fn turns(&self) -> usize {
        self.turns
    }

    /// Greeting shown before the first turn
    pub fn banner(&self) -> String {
        let sentinel = self
            .settings
            .sentinels
            .first()
            .map(|s| s.trim())
            .unwrap_or("quit");
        format!(
            "Starting conversation with {}. Type '{}' to exit.",
            self.profile.display_name(),
            sentinel
        )
    }

    /// Speaker label for the character's transcript lines
    pub fn speaker(&self) -> String {
        match self.profile.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => title_case(&self.character_id),
        }
    }

    /// Handle one line of raw input, without its line terminator.
    ///
    /// Invalid text is skipped; a sentinel ends the session. After the
    /// session has ended every call returns [`TurnOutcome::Ended`].
    pub fn handle_line(&mut self, raw: &[u8]) -> TurnOutcome {
        if self.state == TurnState::Ended {
            return TurnOutcome::Ended;
        }

        let span = self.span.clone();
        let _enter = span.enter();

        let text = match validate_utterance(raw) {
            Ok(text) => text,
            Err(e) => {
                self.skipped += 1;
                tracing::warn!(error = %e, "Skipping turn");
                return TurnOutcome::Skipped(format!("(Input skipped: {e})"));
            }
        };

        if self.settings.is_sentinel(text) {
            self.end();
            return TurnOutcome::Ended;
        }

        self.state = TurnState::Processing;
        let turn = self.turns + 1;

        let signal = self.classifier.classify(text);
        tracing::debug!(
            turn,
            intent = %signal.intent,
            emotion = ?signal.emotion,
            tone = ?signal.tone,
            target = ?signal.target,
            "Classified input"
        );

        self.relationship = self.store.update(&self.relationship, &signal);
        let reply = self
            .generator
            .generate(&self.profile, &signal, &self.relationship);

        if self.settings.persist_every_turn
            && let Err(e) = self.store.persist(&self.character_id, &self.relationship)
        {
            self.write_failures += 1;
            tracing::warn!(turn, error = %e, "Relationship state not saved, continuing in memory");
        }

        let speaker = self.speaker();
        let lines = [
            format!("{}: {}", self.settings.user_label, text),
            format!("{}: {}", speaker, reply),
        ];
        self.record(&lines);

        self.turns = turn;
        self.state = TurnState::AwaitingInput;
        TurnOutcome::Reply(reply)
    }

    /// Convenience for [`handle_line`](Self::handle_line) with text
    pub fn handle_text(&mut self, text: &str) -> TurnOutcome {
        self.handle_line(text.as_bytes())
    }

    fn record(&mut self, lines: &[String]) {
        let Some(transcript) = self.transcript.as_mut() else {
            return;
        };
        for line in lines {
            if let Err(e) = transcript.append(line) {
                self.write_failures += 1;
                tracing::warn!(error = %e, "Transcript write failed");
                break;
            }
        }
    }

    /// End the session: persist the final state, retrying once, and close
    /// the transcript. Calling it again only returns the summary.
    pub fn end(&mut self) -> SessionSummary {
        if self.persisted.is_none() {
            let span = self.span.clone();
            let _enter = span.enter();

            self.state = TurnState::Ended;
            let persisted = self.persist_final();
            self.persisted = Some(persisted);

            if let Some(transcript) = self.transcript.as_mut()
                && let Err(e) = transcript.close()
            {
                self.write_failures += 1;
                tracing::warn!(error = %e, "Transcript close failed");
            }

            tracing::info!(
                turns = self.turns,
                skipped = self.skipped,
                state = %self.relationship,
                persisted,
                "Session ended"
            );
        }

        self.summary()
    }

    fn persist_final(&mut self) -> bool {
        for attempt in 1..=2 {
            match self.store.persist(&self.character_id, &self.relationship) {
                Ok(()) => return true,
                Err(e) if attempt == 1 => {
                    self.write_failures += 1;
                    tracing::warn!(error = %e, "Final persistence failed, retrying");
                }
                Err(e) => {
                    self.write_failures += 1;
                    tracing::error!(
                        error = %e,
                        state = %self.relationship,
                        "Relationship state lost"
                    );
                }
            }
        }
        false
    }

    /// Summary of the session so far
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.id,
            character_id: self.character_id.clone(),
            turns: self.turns,
            skipped: self.skipped,
            final_state: self.relationship.clone(),
            persisted: self.persisted.unwrap_or(false),
            write_failures: self.write_failures,
        }
    }

    /// Run the whole loop over line-oriented input, writing the banner,
    /// prompts, replies and notices to `output`. End of input ends the
    /// session like a sentinel.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if reading input or writing output fails. The
    /// session is ended (and its state persisted) before the error returns.
    pub fn run<R: BufRead, W: Write>(
        &mut self,
        mut input: R,
        mut output: W,
    ) -> Result<SessionSummary> {
        let result = self.drive(&mut input, &mut output);
        let summary = self.end();
        result?;

        if !summary.persisted {
            writeln!(
                output,
                "Warning: relationship state for {} could not be saved.",
                self.profile.display_name()
            )?;
        }
        writeln!(output, "Conversation ended.")?;
        output.flush()?;
        Ok(summary)
    }

    fn drive<R: BufRead, W: Write>(&mut self, input: &mut R, output: &mut W) -> Result<()> {
        writeln!(output, "{}", self.banner())?;

        let mut buf = Vec::new();
        while self.state != TurnState::Ended {
            write!(output, "{}: ", self.settings.user_label)?;
            output.flush()?;

            buf.clear();
            if input.read_until(b'\n', &mut buf)? == 0 {
                writeln!(output)?;
                tracing::debug!("End of input");
                break;
            }
            let line = trim_line_end(&buf);

            match self.handle_line(line) {
                TurnOutcome::Reply(reply) => writeln!(output, "{reply}")?,
                TurnOutcome::Skipped(notice) => writeln!(output, "{notice}")?,
                TurnOutcome::Ended => break,
            }
        }
        Ok(())
    }
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
