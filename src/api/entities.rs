//! Entity implementations for the workspace types.

use crate::store::Entity;

use super::types::{Conversation, Document, EmailMessage};

impl Entity for Document {
  fn id(&self) -> &str {
    &self.id
  }
}

impl Entity for Conversation {
  fn id(&self) -> &str {
    &self.id
  }
}

impl Entity for EmailMessage {
  fn id(&self) -> &str {
    &self.id
  }
}
