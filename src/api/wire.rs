//! Serde-deserializable types matching backend API responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! of the backend's camelCase JSON while keeping domain types focused on
//! application needs.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::types::{Conversation, Document, DocumentKind, EmailMessage, ProcessingStatus};

/// Bulk-list envelope shared by every collection endpoint.
///
/// The default is spelled as `Vec::new` so the derived impl only requires
/// `T: Deserialize`; a bare `#[serde(default)]` would also demand
/// `T: Default`, which the wire types do not implement.
#[derive(Debug, Deserialize)]
pub struct ApiListResponse<T> {
  #[serde(default = "Vec::new")]
  pub items: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDocument {
  pub id: String,
  #[serde(default)]
  pub title: String,
  pub kind: DocumentKind,
  pub status: ProcessingStatus,
  #[serde(default)]
  pub starred: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl ApiDocument {
  pub fn into_document(self) -> Document {
    Document {
      id: self.id,
      title: self.title,
      kind: self.kind,
      status: self.status,
      starred: self.starred,
      created_at: self.created_at,
      updated_at: self.updated_at,
    }
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConversation {
  pub id: String,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub message_count: u32,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl ApiConversation {
  pub fn into_conversation(self) -> Conversation {
    Conversation {
      id: self.id,
      title: self.title,
      message_count: self.message_count,
      created_at: self.created_at,
      updated_at: self.updated_at,
    }
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEmailMessage {
  pub id: String,
  #[serde(default)]
  pub subject: String,
  #[serde(default)]
  pub sender: String,
  #[serde(default)]
  pub unread: bool,
  #[serde(default)]
  pub starred: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl ApiEmailMessage {
  pub fn into_email(self) -> EmailMessage {
    EmailMessage {
      id: self.id,
      subject: self.subject,
      sender: self.sender,
      unread: self.unread,
      starred: self.starred,
      created_at: self.created_at,
      updated_at: self.updated_at,
    }
  }
}
