use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What produced a document: a file upload, an audio recording, or a typed
/// note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
  Upload,
  Recording,
  Note,
}

/// Server-side processing pipeline state for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
  Pending,
  Processing,
  Ready,
  Failed,
}

/// A document in the workspace library.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
  pub id: String,
  pub title: String,
  pub kind: DocumentKind,
  pub status: ProcessingStatus,
  pub starred: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// An AI chat conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
  pub id: String,
  pub title: String,
  pub message_count: u32,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// A mirrored Gmail message.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
  pub id: String,
  pub subject: String,
  pub sender: String,
  pub unread: bool,
  pub starred: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}
