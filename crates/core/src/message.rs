//! Transcript domain types.
//!
//! These are the value objects handed to the engine by the capture
//! collaborator: an ordered list of user/assistant turns plus, optionally,
//! the file changes observed while the conversation happened.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// The role of a message author in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human side of the conversation
    User,
    /// The reasoning system being handed off from
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message in a transcript. Never mutated by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who wrote this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// When the message was captured, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    /// Session the message belongs to
    #[serde(default)]
    pub session_id: String,
}

impl Message {
    /// Create a new user message with a random ID.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new assistant message with a random ID.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: None,
            session_id: String::new(),
        }
    }

    /// Replace the generated ID (tests and importers need stable IDs).
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// What happened to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}

/// A file-change event observed during the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileChange {
    /// Path as reported by the collaborator (relative or absolute)
    pub path: String,

    /// Kind of change
    pub change: ChangeKind,

    /// Message during which the change was observed, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

impl FileChange {
    pub fn new(path: impl Into<String>, change: ChangeKind) -> Self {
        Self {
            path: path.into(),
            change,
            message_id: None,
        }
    }

    /// Lowercased file name without extension, e.g. `src/db/pool.rs` → `pool`.
    ///
    /// Stems shorter than three characters are too ambiguous to match
    /// against prose and yield `None`.
    pub fn stem(&self) -> Option<String> {
        let stem = std::path::Path::new(&self.path)
            .file_stem()?
            .to_string_lossy()
            .to_lowercase();
        (stem.chars().count() >= 3).then_some(stem)
    }
}

/// A full transcript as handed over by the capture collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    /// Session identifier; falls back to the first message's session.
    #[serde(default)]
    pub session_id: String,

    /// Ordered messages (the engine trusts this order)
    pub messages: Vec<Message>,

    /// File changes, in observation order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_changes: Vec<FileChange>,
}

impl Transcript {
    pub fn new(messages: Vec<Message>) -> Self {
        let session_id = messages
            .iter()
            .map(|m| m.session_id.as_str())
            .find(|s| !s.is_empty())
            .unwrap_or_default()
            .to_string();
        Self {
            session_id,
            messages,
            file_changes: Vec::new(),
        }
    }

    pub fn with_file_changes(mut self, file_changes: Vec<FileChange>) -> Self {
        self.file_changes = file_changes;
        self
    }

    /// Check the structural preconditions the engine relies on:
    /// a non-empty list whose IDs are non-blank and unique.
    pub fn validate(&self) -> crate::Result<()> {
        if self.messages.is_empty() {
            return Err(crate::Error::InvalidInput("transcript has no messages".into()));
        }

        let mut seen = HashSet::with_capacity(self.messages.len());
        for (index, message) in self.messages.iter().enumerate() {
            if message.id.trim().is_empty() {
                return Err(crate::Error::InvalidInput(format!(
                    "message at position {index} has a blank id"
                )));
            }
            if !seen.insert(message.id.as_str()) {
                return Err(crate::Error::InvalidInput(format!(
                    "duplicate message id '{}' at position {index}",
                    message.id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = Message::user("Hello there");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello there");
        assert!(msg.timestamp.is_none());
        assert!(!msg.id.is_empty());
    }

    #[test]
    fn message_serialization_roundtrip() {
        let msg = Message::assistant("Use a pool").with_id("m1").with_session("s1");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"role\":\"assistant\""));
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn file_stem_is_lowercased() {
        let change = FileChange::new("src/db/ConnectionPool.rs", ChangeKind::Modified);
        assert_eq!(change.stem().as_deref(), Some("connectionpool"));
        assert!(FileChange::new("a.rs", ChangeKind::Created).stem().is_none());
    }

    #[test]
    fn transcript_takes_first_session() {
        let t = Transcript::new(vec![
            Message::user("a"),
            Message::assistant("b").with_session("abc"),
        ]);
        assert_eq!(t.session_id, "abc");
    }

    #[test]
    fn empty_transcript_is_invalid() {
        assert!(Transcript::default().validate().is_err());
    }

    #[test]
    fn duplicate_ids_are_invalid() {
        let t = Transcript::new(vec![
            Message::user("a").with_id("x"),
            Message::assistant("b").with_id("x"),
        ]);
        let err = t.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }
}
