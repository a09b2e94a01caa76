//! Plain-text transcripts of finished sessions.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::info;

use crate::core::message::ConversationLog;
use crate::core::session::Session;

const TITLE: &str = "=== Goblin Chat Log ===";
const RULE_WIDTH: usize = 28;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug)]
pub enum SaveError {
    /// The session log has no messages.
    NothingToSave,
    /// The session was saved before.
    AlreadySaved,
    /// Creating the log directory or writing the file failed.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl fmt::Display for SaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveError::NothingToSave => write!(f, "Nothing to save in this session yet."),
            SaveError::AlreadySaved => write!(f, "This session has already been saved."),
            SaveError::Io { path, source } => {
                write!(f, "Failed to write transcript {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for SaveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SaveError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Render a log and its metadata as a human-readable transcript.
///
/// Message content is embedded verbatim, so content that itself looks like a
/// rule or block header is indistinguishable from real structure.
pub fn format_transcript(
    log: &ConversationLog,
    model: &str,
    persona_refs: &[String],
    personas_root: &Path,
    started_at: DateTime<Local>,
    ended_at: DateTime<Local>,
) -> String {
    let mut lines: Vec<String> = Vec::with_capacity(8 + log.len() * 3);
    lines.push(TITLE.to_string());
    lines.push(format!("Model: {model}"));
    if persona_refs.is_empty() {
        lines.push("PersonaXML: None".to_string());
    } else {
        lines.push("PersonaXMLs:".to_string());
        for persona in persona_refs {
            lines.push(format!("  - {}", persona_location(personas_root, persona).display()));
        }
    }
    lines.push(format!("StartedAt: {}", started_at.format(TIMESTAMP_FORMAT)));
    lines.push(format!("EndedAt:   {}", ended_at.format(TIMESTAMP_FORMAT)));
    lines.push("=".repeat(RULE_WIDTH));
    lines.push(String::new());

    for (index, message) in log.iter().enumerate() {
        lines.push(format!("[{index:03}] Role: {}", message.role));
        lines.push(message.content.clone());
        lines.push("-".repeat(RULE_WIDTH));
    }

    let mut text = lines.join("\n");
    text.push('\n');
    text
}

fn persona_location(root: &Path, persona: &str) -> PathBuf {
    let joined = root.join(persona);
    std::path::absolute(&joined).unwrap_or(joined)
}

/// File name for a transcript of a session started at `started_at`.
pub fn transcript_file_name(started_at: DateTime<Local>) -> String {
    format!("goblin_chat_{}.txt", started_at.format("%Y%m%d_%H%M%S"))
}

/// Writes session transcripts into one directory.
#[derive(Debug, Clone)]
pub struct TranscriptWriter {
    log_dir: PathBuf,
    personas_root: PathBuf,
}

impl TranscriptWriter {
    pub fn new(log_dir: impl Into<PathBuf>, personas_root: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
            personas_root: personas_root.into(),
        }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Write the session's transcript once and mark it saved.
    ///
    /// A same-second filename collision overwrites the earlier file.
    pub fn save(&self, session: &mut Session) -> Result<PathBuf, SaveError> {
        if session.log().is_empty() {
            return Err(SaveError::NothingToSave);
        }
        if session.is_saved() {
            return Err(SaveError::AlreadySaved);
        }

        fs::create_dir_all(&self.log_dir).map_err(|source| SaveError::Io {
            path: self.log_dir.clone(),
            source,
        })?;

        let path = self.log_dir.join(transcript_file_name(session.started_at()));
        let text = format_transcript(
            session.log(),
            session.model(),
            session.persona_refs(),
            &self.personas_root,
            session.started_at(),
            Local::now(),
        );
        fs::write(&path, text).map_err(|source| SaveError::Io {
            path: path.clone(),
            source,
        })?;

        session.mark_saved();
        info!(path = %path.display(), messages = session.log().len(), "transcript saved");
        Ok(path)
    }
}
