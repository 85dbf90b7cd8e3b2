//! Staleness-gated cache layer for remote collections.
//!
//! This module provides the controller that decides fetch-vs-serve-cached:
//! - at most one outstanding fetch per collection (in-flight deduplication)
//! - cached contents are served while fresh and non-empty
//! - a failed fetch never clears previously cached data
//! - optimistic local mutations apply immediately and recompute derived
//!   stats synchronously

mod controller;
mod staleness;
mod traits;

pub use controller::CollectionCache;
pub use staleness::Staleness;
pub use traits::{FetchError, FetchFn, FetchFuture, LoadState};
