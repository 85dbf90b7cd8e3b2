//! Derived statistics, recomputed from collection contents on every change.
//!
//! These are pure functions of the current items; the cache controller calls
//! them synchronously after each mutation so the exposed values can never
//! drift from the collections they derive from.

use crate::api::{Document, DocumentKind, EmailMessage, ProcessingStatus};

/// Dashboard counters over the documents collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentStats {
  pub total: usize,
  pub uploads: usize,
  pub recordings: usize,
  pub notes: usize,
  pub pending: usize,
  pub processing: usize,
  pub ready: usize,
  pub failed: usize,
}

pub fn document_stats(items: &[Document]) -> DocumentStats {
  let mut stats = DocumentStats {
    total: items.len(),
    ..DocumentStats::default()
  };
  for document in items {
    match document.kind {
      DocumentKind::Upload => stats.uploads += 1,
      DocumentKind::Recording => stats.recordings += 1,
      DocumentKind::Note => stats.notes += 1,
    }
    match document.status {
      ProcessingStatus::Pending => stats.pending += 1,
      ProcessingStatus::Processing => stats.processing += 1,
      ProcessingStatus::Ready => stats.ready += 1,
      ProcessingStatus::Failed => stats.failed += 1,
    }
  }
  stats
}

/// Inbox counters over the emails collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailStats {
  pub total: usize,
  pub unread: usize,
  pub starred: usize,
}

pub fn email_stats(items: &[EmailMessage]) -> EmailStats {
  EmailStats {
    total: items.len(),
    unread: items.iter().filter(|e| e.unread).count(),
    starred: items.iter().filter(|e| e.starred).count(),
  }
}

/// Workspace-wide rollup exposed to the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceStats {
  pub documents: DocumentStats,
  pub emails: EmailStats,
  pub conversations: usize,
}
