//! Session identity used to fence async fetch completions.
//!
//! Every fetch captures the epoch at the moment it starts; the controller
//! discards any completion whose epoch no longer matches. Logout and
//! unauthorized handling bump the epoch, so a fetch that was in flight when
//! the session ended can never write into a cleared store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared session epoch, cheap to clone into fetch tasks.
#[derive(Debug, Clone, Default)]
pub struct Session {
  epoch: Arc<AtomicU64>,
}

impl Session {
  pub fn new() -> Self {
    Self::default()
  }

  /// Current epoch. Captured at fetch start, compared at completion.
  pub fn epoch(&self) -> u64 {
    self.epoch.load(Ordering::Acquire)
  }

  /// Invalidate everything captured under the current epoch.
  pub fn bump(&self) {
    self.epoch.fetch_add(1, Ordering::AcqRel);
  }
}
