//! Core types for the caching system.

use futures::future::BoxFuture;

/// Error from a fetch attempt, as observed by the cache controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
  /// The backend rejected the session token. The workspace reacts by
  /// clearing every collection, equivalent to a process restart for cache
  /// purposes.
  Unauthorized,
  /// Network failure, non-success HTTP status, or malformed payload.
  Failed(String),
}

impl std::fmt::Display for FetchError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      FetchError::Unauthorized => write!(f, "the API rejected the session token"),
      FetchError::Failed(message) => write!(f, "{}", message),
    }
  }
}

impl std::error::Error for FetchError {}

/// A boxed future producing a full ordered snapshot of one collection.
pub type FetchFuture<T> = BoxFuture<'static, Result<Vec<T>, FetchError>>;

/// Factory invoked by the controller for each fetch.
///
/// The flag carries the caller's force-refresh intent through to the remote
/// source, for backends that distinguish a cache-busting read.
pub type FetchFn<T> = Box<dyn Fn(bool) -> FetchFuture<T> + Send + Sync>;

/// Per-collection load state.
///
/// "Show the full-page loading view" is exactly the predicate
/// [`LoadState::is_initial_loading`]: it holds only before the first
/// successful fetch. Once a collection has been populated, every subsequent
/// load passes through `Refreshing` so the UI never regresses to a blank
/// loading screen over data it already has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
  /// No fetch has ever succeeded.
  Uninitialized,
  /// First fetch in flight; nothing to display yet.
  Loading,
  /// Populated by at least one successful fetch.
  Ready,
  /// Populated, with a background fetch in flight.
  Refreshing,
}

impl LoadState {
  /// True only during the very first fetch.
  pub fn is_initial_loading(&self) -> bool {
    matches!(self, LoadState::Loading)
  }

  /// True once any fetch has succeeded, refreshing or not.
  pub fn is_ready(&self) -> bool {
    matches!(self, LoadState::Ready | LoadState::Refreshing)
  }

  pub fn is_refreshing(&self) -> bool {
    matches!(self, LoadState::Refreshing)
  }
}
