//! Session transcripts
//!
//! A transcript is opened once per session and receives every exchanged
//! line. Each `append` is durable before it returns.

use chrono::Local;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{ParleyError, Result};

/// Append-only sink for transcript lines
pub trait TranscriptSink: Send {
    /// Append one line; flushed before returning
    fn append(&mut self, line: &str) -> Result<()>;

    /// Finish the transcript
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Transcript written to `<dir>/conversation_<id>_<YYYYmmdd_HHMMSS>.txt`
#[derive(Debug)]
pub struct FileTranscript {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl FileTranscript {
    /// Create a timestamped transcript file for a character under `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ParleyError::PersistenceWrite`] if the file cannot be created.
    pub fn create(dir: impl AsRef<Path>, character_id: &str) -> Result<Self> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = dir
            .as_ref()
            .join(format!("conversation_{character_id}_{timestamp}.txt"));
        Self::open(path)
    }

    /// Create (or truncate) a transcript at an explicit path
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| write_error(&path, e))?;
        }
        let file = File::create(&path).map_err(|e| write_error(&path, e))?;
        tracing::debug!(path = %path.display(), "Opened transcript");
        Ok(Self {
            path,
            writer: Some(BufWriter::new(file)),
        })
    }

    /// Transcript file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn write_error(path: &Path, e: std::io::Error) -> ParleyError {
    ParleyError::PersistenceWrite(format!("{}: {}", path.display(), e))
}

impl TranscriptSink for FileTranscript {
    fn append(&mut self, line: &str) -> Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            ParleyError::PersistenceWrite(format!("{}: transcript closed", self.path.display()))
        })?;
        writeln!(writer, "{line}")
            .and_then(|_| writer.flush())
            .map_err(|e| write_error(&self.path, e))
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| write_error(&self.path, e))?;
            tracing::debug!(path = %self.path.display(), "Closed transcript");
        }
        Ok(())
    }
}

/// In-memory transcript; clones share the same buffer
#[derive(Debug, Clone, Default)]
pub struct MemoryTranscript {
    lines: Arc<Mutex<Vec<String>>>,
    closed: Arc<Mutex<bool>>,
}

impl MemoryTranscript {
    /// Create an empty transcript
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines appended so far
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.closed.lock().map(|c| *c).unwrap_or(false)
    }
}

impl TranscriptSink for MemoryTranscript {
    fn append(&mut self, line: &str) -> Result<()> {
        let mut lines = self
            .lines
            .lock()
            .map_err(|e| ParleyError::PersistenceWrite(format!("transcript poisoned: {e}")))?;
        lines.push(line.to_string());
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Ok(mut closed) = self.closed.lock() {
            *closed = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_transcript_naming() {
        let dir = TempDir::new().unwrap();
        let transcript = FileTranscript::create(dir.path().join("logs"), "superman").unwrap();
        let name = transcript
            .path()
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap()
            .to_string();

        assert!(name.starts_with("conversation_superman_"));
        assert!(name.ends_with(".txt"));
        // conversation_superman_YYYYmmdd_HHMMSS.txt
        let stamp = &name["conversation_superman_".len()..name.len() - ".txt".len()];
        assert_eq!(stamp.len(), 15);
        assert_eq!(&stamp[8..9], "_");
    }

    #[test]
    fn test_file_transcript_is_flushed_per_append() {
        let dir = TempDir::new().unwrap();
        let mut transcript = FileTranscript::open(dir.path().join("t.txt")).unwrap();

        transcript.append("You: hello").unwrap();
        let content = std::fs::read_to_string(transcript.path()).unwrap();
        assert_eq!(content, "You: hello\n");

        transcript.append("Superman: Superman nods in acknowledgement.").unwrap();
        transcript.close().unwrap();
        let content = std::fs::read_to_string(transcript.path()).unwrap();
        assert_eq!(
            content,
            "You: hello\nSuperman: Superman nods in acknowledgement.\n"
        );
    }

    #[test]
    fn test_append_after_close_fails() {
        let dir = TempDir::new().unwrap();
        let mut transcript = FileTranscript::open(dir.path().join("t.txt")).unwrap();
        transcript.close().unwrap();
        transcript.close().unwrap();
        assert!(matches!(
            transcript.append("late"),
            Err(ParleyError::PersistenceWrite(_))
        ));
    }

    #[test]
    fn test_memory_transcript_shares_buffer() {
        let observer = MemoryTranscript::new();
        let mut sink = observer.clone();
        sink.append("You: hi").unwrap();
        sink.close().unwrap();
        assert_eq!(observer.lines(), vec!["You: hi"]);
        assert!(observer.is_closed());
    }
}
