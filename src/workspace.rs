//! Aggregate owning one cached collection per backend collection.
//!
//! The host UI constructs a [`Workspace`] once, calls [`Workspace::load_all`]
//! on startup, and drives [`Workspace::poll`] from its event loop tick.
//! Collections are fully independent of each other; the only cross-collection
//! operations are the atomic clear on logout/unauthorized and the dashboard
//! stats rollup.

use chrono::Utc;
use tracing::info;

use crate::api::{self, Client, Conversation, Document, EmailMessage};
use crate::cache::CollectionCache;
use crate::config::Config;
use crate::session::Session;
use crate::stats::{self, DocumentStats, EmailStats, WorkspaceStats};
use crate::store::Position;

pub struct Workspace {
  pub documents: CollectionCache<Document, DocumentStats>,
  pub conversations: CollectionCache<Conversation>,
  pub emails: CollectionCache<EmailMessage, EmailStats>,
  session: Session,
}

impl Workspace {
  pub fn new(client: Client, config: &Config) -> Self {
    let session = Session::new();
    let stale_after = config.cache.stale_after();

    let documents = {
      let client = client.clone();
      CollectionCache::with_stats(
        "documents",
        session.clone(),
        stale_after,
        move |_force| {
          let client = client.clone();
          async move { client.list_documents().await.map_err(api::to_fetch_error) }
        },
        stats::document_stats,
      )
    };

    let conversations = {
      let client = client.clone();
      CollectionCache::new("conversations", session.clone(), stale_after, move |_force| {
        let client = client.clone();
        async move {
          client
            .list_conversations()
            .await
            .map_err(api::to_fetch_error)
        }
      })
    };

    let emails = CollectionCache::with_stats(
      "emails",
      session.clone(),
      stale_after,
      move |_force| {
        let client = client.clone();
        async move { client.list_emails().await.map_err(api::to_fetch_error) }
      },
      stats::email_stats,
    );

    Self {
      documents,
      conversations,
      emails,
      session,
    }
  }

  /// Request a load of every collection.
  pub fn load_all(&mut self, force: bool) {
    self.documents.load(force);
    self.conversations.load(force);
    self.emails.load(force);
  }

  /// Complete pending fetches. Returns `true` if anything changed.
  ///
  /// An auth rejection observed by any fetch clears the whole workspace,
  /// same as an explicit logout.
  pub fn poll(&mut self) -> bool {
    let mut changed = self.documents.poll();
    changed |= self.conversations.poll();
    changed |= self.emails.poll();

    if self.documents.saw_unauthorized()
      || self.conversations.saw_unauthorized()
      || self.emails.saw_unauthorized()
    {
      self.handle_unauthorized();
      changed = true;
    }
    changed
  }

  /// Background-refresh stale collections when the app regains foreground
  /// visibility.
  pub fn on_visible(&mut self) {
    self.documents.on_visible();
    self.conversations.on_visible();
    self.emails.on_visible();
  }

  /// React to the backend rejecting the session token.
  pub fn handle_unauthorized(&mut self) {
    info!("session rejected by the API, clearing cached collections");
    self.clear_all();
  }

  /// Explicit logout.
  pub fn logout(&mut self) {
    info!("logout, clearing cached collections");
    self.clear_all();
  }

  /// Clear every collection and staleness record together, and fence any
  /// in-flight fetch so it cannot write into the cleared stores.
  fn clear_all(&mut self) {
    self.session.bump();
    self.documents.reset();
    self.conversations.reset();
    self.emails.reset();
  }

  /// Dashboard rollup. Assembled from the per-collection stats that are
  /// recomputed on every mutation, so it is always consistent with the
  /// current contents.
  pub fn stats(&self) -> WorkspaceStats {
    WorkspaceStats {
      documents: self.documents.stats().clone(),
      emails: self.emails.stats().clone(),
      conversations: self.conversations.items().len(),
    }
  }

  pub fn session(&self) -> &Session {
    &self.session
  }

  // ==========================================================================
  // Optimistic mutations, each invoked after the matching API call succeeded
  // ==========================================================================

  /// A document was deleted server-side.
  pub fn note_document_deleted(&mut self, id: &str) {
    self.documents.remove(id);
  }

  /// A document was created server-side (upload, recording, or note).
  pub fn note_document_added(&mut self, document: Document) {
    self.documents.insert(document, Position::Append);
  }

  /// A conversation was started server-side.
  pub fn note_conversation_started(&mut self, conversation: Conversation) {
    self.conversations.insert(conversation, Position::Prepend);
  }

  /// A message was appended to a conversation server-side.
  pub fn note_conversation_message(&mut self, id: &str) {
    if let Some(mut conversation) = self.conversations.get(id).cloned() {
      conversation.message_count += 1;
      conversation.updated_at = Utc::now();
      self.conversations.update(conversation);
    }
  }

  /// An email's star was toggled server-side.
  pub fn note_email_starred(&mut self, id: &str, starred: bool) {
    if let Some(mut email) = self.emails.get(id).cloned() {
      email.starred = starred;
      self.emails.update(email);
    }
  }

  /// An email was opened and marked read server-side.
  pub fn note_email_read(&mut self, id: &str) {
    if let Some(mut email) = self.emails.get(id).cloned() {
      email.unread = false;
      self.emails.update(email);
    }
  }
}
