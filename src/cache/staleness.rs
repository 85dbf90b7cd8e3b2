//! Elapsed-time gate for fetch decisions.

use chrono::{DateTime, Duration, Utc};

/// Records the last successful fetch time for one collection.
///
/// `None` means "never successfully fetched", which always reads as stale.
/// The TTL is not stored here; the controller passes its configured window on
/// every check.
#[derive(Debug, Clone, Default)]
pub struct Staleness {
  last_fetched_at: Option<DateTime<Utc>>,
}

impl Staleness {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record now as the last successful fetch time.
  pub fn mark_fresh(&mut self) {
    self.last_fetched_at = Some(Utc::now());
  }

  /// Stale when never marked, or when the mark is older than `ttl`.
  pub fn is_stale(&self, ttl: Duration) -> bool {
    match self.last_fetched_at {
      None => true,
      Some(at) => Utc::now() - at > ttl,
    }
  }

  /// Drop the mark so the next check reports stale (force refresh).
  pub fn invalidate(&mut self) {
    self.last_fetched_at = None;
  }

  pub fn last_fetched_at(&self) -> Option<DateTime<Utc>> {
    self.last_fetched_at
  }
}
