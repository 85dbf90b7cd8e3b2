//! Cache controller: the only component that decides whether to fetch.
//!
//! A [`CollectionCache`] pairs one [`Collection`] with an injected fetcher
//! and a staleness window. Fetches run on the tokio runtime and report back
//! over a channel; the host completes them by calling [`CollectionCache::poll`]
//! from its event loop tick, so every state change happens on the owning
//! thread and mutations never interleave with a half-applied fetch.

use chrono::{DateTime, Duration, Utc};
use std::future::Future;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::session::Session;
use crate::store::{Collection, Entity, Position};

use super::staleness::Staleness;
use super::traits::{FetchError, FetchFn, LoadState};

/// Completed fetch, tagged with the session epoch it started under.
struct FetchOutcome<T> {
  epoch: u64,
  result: Result<Vec<T>, FetchError>,
}

type StatsFn<T, S> = Box<dyn Fn(&[T]) -> S + Send + Sync>;

/// Cached view of one backend collection with derived stats of type `S`.
///
/// The stats value is a pure function of the current contents, recomputed
/// synchronously on every mutation so it can never drift from the items it
/// derives from.
pub struct CollectionCache<T: Entity, S = ()> {
  name: &'static str,
  store: Collection<T>,
  staleness: Staleness,
  stale_after: Duration,
  state: LoadState,
  error: Option<String>,
  unauthorized: bool,
  fetcher: FetchFn<T>,
  receiver: Option<mpsc::UnboundedReceiver<FetchOutcome<T>>>,
  session: Session,
  stats_fn: StatsFn<T, S>,
  stats: S,
}

fn no_stats<T>(_: &[T]) {}

impl<T: Entity> CollectionCache<T> {
  /// Create a cache without derived stats.
  pub fn new<F, Fut>(
    name: &'static str,
    session: Session,
    stale_after: Duration,
    fetcher: F,
  ) -> Self
  where
    F: Fn(bool) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<T>, FetchError>> + Send + 'static,
  {
    Self::with_stats(name, session, stale_after, fetcher, no_stats::<T>)
  }
}

impl<T: Entity, S> CollectionCache<T, S> {
  /// Create a cache whose stats are recomputed from the contents on every
  /// mutation.
  pub fn with_stats<F, Fut, G>(
    name: &'static str,
    session: Session,
    stale_after: Duration,
    fetcher: F,
    stats_fn: G,
  ) -> Self
  where
    F: Fn(bool) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<T>, FetchError>> + Send + 'static,
    G: Fn(&[T]) -> S + Send + Sync + 'static,
  {
    let stats = stats_fn(&[]);
    Self {
      name,
      store: Collection::new(),
      staleness: Staleness::new(),
      stale_after,
      state: LoadState::Uninitialized,
      error: None,
      unauthorized: false,
      fetcher: Box::new(move |force| Box::pin(fetcher(force))),
      receiver: None,
      session,
      stats_fn: Box::new(stats_fn),
      stats,
    }
  }

  /// Request a load of this collection.
  ///
  /// 1. If a fetch is already in flight, this is a no-op (at most one
  ///    outstanding fetch per collection).
  /// 2. Without `force`, fresh non-empty contents are served as-is.
  /// 3. Otherwise a fetch starts; complete it via [`Self::poll`].
  pub fn load(&mut self, force: bool) {
    if self.receiver.is_some() {
      trace!(collection = self.name, "load ignored, fetch already in flight");
      return;
    }
    if !force && !self.staleness.is_stale(self.stale_after) && !self.store.is_empty() {
      trace!(collection = self.name, "serving cached contents");
      return;
    }
    if force {
      self.staleness.invalidate();
    }
    self.start_fetch(force);
  }

  /// Background refresh on foreground-visibility regain.
  ///
  /// Only acts when the collection is currently stale, and never through the
  /// initial-loading state once data exists, so the UI keeps rendering what
  /// it has while the refresh runs.
  pub fn on_visible(&mut self) {
    if self.receiver.is_some() {
      return;
    }
    if !self.staleness.is_stale(self.stale_after) {
      return;
    }
    debug!(collection = self.name, "stale on visibility regain, refreshing");
    self.start_fetch(false);
  }

  fn start_fetch(&mut self, force: bool) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.state = if self.state == LoadState::Uninitialized {
      LoadState::Loading
    } else {
      LoadState::Refreshing
    };

    let epoch = self.session.epoch();
    let future = (self.fetcher)(force);
    debug!(collection = self.name, force, "fetch started");

    tokio::spawn(async move {
      let result = future.await;
      // Ignore send errors - the receiver is dropped on reset
      let _ = tx.send(FetchOutcome { epoch, result });
    });
  }

  /// Poll for the result of a pending fetch.
  ///
  /// Returns `true` if observable state changed. A completion from a session
  /// that has since ended is discarded without touching the store.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    match receiver.try_recv() {
      Ok(outcome) => {
        self.receiver = None;
        if outcome.epoch != self.session.epoch() {
          debug!(
            collection = self.name,
            "discarding fetch completion from an ended session"
          );
          let previous = self.state;
          self.state = if self.store.has_loaded() {
            LoadState::Ready
          } else {
            LoadState::Uninitialized
          };
          // The store is untouched, but leaving Loading/Refreshing is an
          // observable change the host must re-render for
          return self.state != previous;
        }
        match outcome.result {
          Ok(entities) => {
            let count = entities.len();
            self.store.replace_all(entities);
            self.staleness.mark_fresh();
            self.error = None;
            self.unauthorized = false;
            self.state = LoadState::Ready;
            self.recompute_stats();
            debug!(collection = self.name, count, "fetch succeeded");
          }
          Err(error) => {
            // Degraded-but-available: cached contents and the staleness
            // mark stay exactly as they were.
            warn!(collection = self.name, %error, "fetch failed, keeping cached contents");
            self.unauthorized = matches!(error, FetchError::Unauthorized);
            self.error = Some(error.to_string());
            self.state = if self.store.has_loaded() {
              LoadState::Ready
            } else {
              LoadState::Uninitialized
            };
          }
        }
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        // Sender dropped without sending - treat as a failed fetch
        self.receiver = None;
        self.error = Some("fetch was cancelled".to_string());
        self.state = if self.store.has_loaded() {
          LoadState::Ready
        } else {
          LoadState::Uninitialized
        };
        true
      }
    }
  }

  // ==========================================================================
  // Optimistic mutations
  //
  // Invoked only after an external create/update/delete call already
  // succeeded; they never perform network calls themselves. A later full
  // fetch is authoritative and may overwrite them.
  // ==========================================================================

  /// Insert a confirmed new entity at the given position.
  pub fn insert(&mut self, entity: T, position: Position) {
    if self.store.insert(entity, position) {
      self.recompute_stats();
    } else {
      trace!(collection = self.name, "insert ignored, id already present");
    }
  }

  /// Replace a confirmed updated entity in place.
  pub fn update(&mut self, entity: T) {
    if self.store.update(entity) {
      self.recompute_stats();
    }
  }

  /// Remove a confirmed deleted entity.
  pub fn remove(&mut self, id: &str) {
    if self.store.remove(id) {
      self.recompute_stats();
    }
  }

  /// Clear contents, staleness, and error state together (logout/reset).
  pub fn reset(&mut self) {
    self.receiver = None;
    self.store.clear();
    self.staleness.invalidate();
    self.error = None;
    self.unauthorized = false;
    self.state = LoadState::Uninitialized;
    self.recompute_stats();
    debug!(collection = self.name, "cache reset");
  }

  fn recompute_stats(&mut self) {
    self.stats = (self.stats_fn)(self.store.items());
  }

  // Accessors

  pub fn name(&self) -> &'static str {
    self.name
  }

  /// Read-only ordered snapshot of the cached contents.
  pub fn items(&self) -> &[T] {
    self.store.items()
  }

  pub fn get(&self, id: &str) -> Option<&T> {
    self.store.get(id)
  }

  pub fn state(&self) -> LoadState {
    self.state
  }

  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }

  /// Derived stats for the current contents.
  pub fn stats(&self) -> &S {
    &self.stats
  }

  pub fn is_fetching(&self) -> bool {
    self.receiver.is_some()
  }

  /// Whether the last completed fetch failed with an auth rejection.
  /// Cleared by the next successful fetch or by [`Self::reset`].
  pub fn saw_unauthorized(&self) -> bool {
    self.unauthorized
  }

  pub fn last_fetched_at(&self) -> Option<DateTime<Utc>> {
    self.staleness.last_fetched_at()
  }
}

impl<T: Entity + std::fmt::Debug, S: std::fmt::Debug> std::fmt::Debug for CollectionCache<T, S> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CollectionCache")
      .field("name", &self.name)
      .field("state", &self.state)
      .field("len", &self.store.len())
      .field("error", &self.error)
      .field("stats", &self.stats)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
  use std::sync::Arc;
  use std::time::Duration as StdDuration;

  #[derive(Debug, Clone, PartialEq)]
  struct Item {
    id: String,
    kind: &'static str,
  }

  impl Entity for Item {
    fn id(&self) -> &str {
      &self.id
    }
  }

  fn item(id: &str) -> Item {
    Item {
      id: id.to_string(),
      kind: "document",
    }
  }

  fn ids(cache: &CollectionCache<Item, impl Sized>) -> Vec<String> {
    cache.items().iter().map(|e| e.id.clone()).collect()
  }

  fn count_documents(items: &[Item]) -> usize {
    items.iter().filter(|i| i.kind == "document").count()
  }

  /// Cache whose fetcher counts invocations and returns the given items,
  /// failing while `fail` is set.
  fn counting_cache(
    stale_after: Duration,
    result: Vec<Item>,
    calls: Arc<AtomicU32>,
    fail: Arc<AtomicBool>,
  ) -> CollectionCache<Item> {
    CollectionCache::new("items", Session::new(), stale_after, move |_force| {
      let result = result.clone();
      let calls = calls.clone();
      let fail = fail.clone();
      async move {
        calls.fetch_add(1, Ordering::SeqCst);
        if fail.load(Ordering::SeqCst) {
          Err(FetchError::Failed("boom".to_string()))
        } else {
          Ok(result)
        }
      }
    })
  }

  /// Sleep-and-poll until the pending fetch completes.
  async fn settle<S>(cache: &mut CollectionCache<Item, S>) {
    for _ in 0..100 {
      tokio::time::sleep(StdDuration::from_millis(5)).await;
      if cache.poll() {
        return;
      }
    }
    panic!("fetch never completed");
  }

  #[tokio::test]
  async fn test_first_load_populates_and_marks_fresh() {
    let calls = Arc::new(AtomicU32::new(0));
    let fail = Arc::new(AtomicBool::new(false));
    let mut cache = counting_cache(
      Duration::minutes(3),
      vec![item("a"), item("b")],
      calls.clone(),
      fail,
    );

    assert_eq!(cache.state(), LoadState::Uninitialized);
    cache.load(false);
    assert_eq!(cache.state(), LoadState::Loading);
    assert!(cache.state().is_initial_loading());

    settle(&mut cache).await;
    assert_eq!(ids(&cache), vec!["a", "b"]);
    assert_eq!(cache.state(), LoadState::Ready);
    assert_eq!(cache.error(), None);
    assert!(cache.last_fetched_at().is_some());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_fresh_cache_skips_fetch() {
    let calls = Arc::new(AtomicU32::new(0));
    let fail = Arc::new(AtomicBool::new(false));
    let mut cache = counting_cache(Duration::minutes(3), vec![item("a")], calls.clone(), fail);

    cache.load(false);
    settle(&mut cache).await;

    cache.load(false);
    assert!(!cache.is_fetching());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(ids(&cache), vec!["a"]);
  }

  #[tokio::test]
  async fn test_force_fetches_regardless_of_freshness() {
    let calls = Arc::new(AtomicU32::new(0));
    let fail = Arc::new(AtomicBool::new(false));
    let mut cache = counting_cache(Duration::minutes(3), vec![item("a")], calls.clone(), fail);

    cache.load(false);
    settle(&mut cache).await;

    cache.load(true);
    assert!(cache.is_fetching());
    settle(&mut cache).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_in_flight_dedup() {
    let calls = Arc::new(AtomicU32::new(0));
    let calls_clone = calls.clone();
    let mut cache = CollectionCache::new(
      "items",
      Session::new(),
      Duration::minutes(3),
      move |_force| {
        let calls = calls_clone.clone();
        async move {
          calls.fetch_add(1, Ordering::SeqCst);
          tokio::time::sleep(StdDuration::from_millis(30)).await;
          Ok(vec![item("a")])
        }
      },
    );

    cache.load(false);
    cache.load(false);
    cache.load(true);

    settle(&mut cache).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(ids(&cache), vec!["a"]);
  }

  #[tokio::test]
  async fn test_failure_preserves_cache_and_mark() {
    let calls = Arc::new(AtomicU32::new(0));
    let fail = Arc::new(AtomicBool::new(false));
    let mut cache = counting_cache(
      Duration::minutes(3),
      vec![item("a")],
      calls,
      fail.clone(),
    );

    cache.load(false);
    settle(&mut cache).await;

    fail.store(true, Ordering::SeqCst);
    cache.load(true);
    settle(&mut cache).await;

    assert_eq!(ids(&cache), vec!["a"]);
    assert_eq!(cache.error(), Some("boom"));
    assert_eq!(cache.state(), LoadState::Ready);
    // mark_fresh is only called on success; force invalidated the mark and
    // the failure left it that way
    assert_eq!(cache.last_fetched_at(), None);

    // An unforced failing load leaves an existing mark untouched
    fail.store(false, Ordering::SeqCst);
    cache.load(false);
    settle(&mut cache).await;
    let fetched_at = cache.last_fetched_at();
    assert!(fetched_at.is_some());

    fail.store(true, Ordering::SeqCst);
    // Stale window still open, but the store being non-empty and fresh means
    // no fetch happens at all; drive one with a zero-TTL cache instead
    cache.load(false);
    assert!(!cache.is_fetching());
    assert_eq!(cache.last_fetched_at(), fetched_at);
  }

  #[tokio::test]
  async fn test_unforced_failure_keeps_staleness_mark() {
    let calls = Arc::new(AtomicU32::new(0));
    let fail = Arc::new(AtomicBool::new(false));
    // Zero TTL: every load fetches without needing force
    let mut cache = counting_cache(Duration::zero(), vec![item("a")], calls, fail.clone());

    cache.load(false);
    settle(&mut cache).await;
    let fetched_at = cache.last_fetched_at();
    assert!(fetched_at.is_some());

    fail.store(true, Ordering::SeqCst);
    tokio::time::sleep(StdDuration::from_millis(2)).await;
    cache.load(false);
    settle(&mut cache).await;

    assert_eq!(ids(&cache), vec!["a"]);
    assert_eq!(cache.error(), Some("boom"));
    assert_eq!(cache.last_fetched_at(), fetched_at);
  }

  #[tokio::test]
  async fn test_initial_failure_returns_to_uninitialized() {
    let calls = Arc::new(AtomicU32::new(0));
    let fail = Arc::new(AtomicBool::new(true));
    let mut cache = counting_cache(Duration::minutes(3), vec![item("a")], calls, fail.clone());

    cache.load(false);
    settle(&mut cache).await;

    assert_eq!(cache.state(), LoadState::Uninitialized);
    assert_eq!(cache.error(), Some("boom"));
    assert!(cache.items().is_empty());

    // Recoverable by a retry once the backend is healthy again
    fail.store(false, Ordering::SeqCst);
    cache.load(false);
    assert_eq!(cache.state(), LoadState::Loading);
    settle(&mut cache).await;
    assert_eq!(cache.state(), LoadState::Ready);
    assert_eq!(cache.error(), None);
  }

  #[tokio::test]
  async fn test_never_regresses_to_initial_loading() {
    let calls = Arc::new(AtomicU32::new(0));
    let fail = Arc::new(AtomicBool::new(false));
    let mut cache = counting_cache(Duration::minutes(3), vec![item("a")], calls, fail.clone());

    cache.load(false);
    settle(&mut cache).await;

    cache.load(true);
    assert_eq!(cache.state(), LoadState::Refreshing);
    assert!(!cache.state().is_initial_loading());
    settle(&mut cache).await;
    assert_eq!(cache.state(), LoadState::Ready);

    fail.store(true, Ordering::SeqCst);
    cache.load(true);
    assert_eq!(cache.state(), LoadState::Refreshing);
    settle(&mut cache).await;
    assert_eq!(cache.state(), LoadState::Ready);
    assert_eq!(cache.error(), Some("boom"));
  }

  #[tokio::test]
  async fn test_empty_collection_refetches_even_when_fresh() {
    let calls = Arc::new(AtomicU32::new(0));
    let fail = Arc::new(AtomicBool::new(false));
    let mut cache = counting_cache(Duration::minutes(3), Vec::new(), calls.clone(), fail);

    cache.load(false);
    settle(&mut cache).await;
    assert_eq!(cache.state(), LoadState::Ready);
    assert!(cache.items().is_empty());

    // Fresh but empty: a load still goes to the network
    cache.load(false);
    settle(&mut cache).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_visibility_refresh_only_when_stale() {
    let calls = Arc::new(AtomicU32::new(0));
    let fail = Arc::new(AtomicBool::new(false));
    let mut cache = counting_cache(Duration::minutes(3), vec![item("a")], calls.clone(), fail);

    cache.load(false);
    settle(&mut cache).await;

    cache.on_visible();
    assert!(!cache.is_fetching());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_visibility_refresh_when_stale_is_silent() {
    let calls = Arc::new(AtomicU32::new(0));
    let fail = Arc::new(AtomicBool::new(false));
    let mut cache = counting_cache(Duration::zero(), vec![item("a")], calls.clone(), fail);

    cache.load(false);
    settle(&mut cache).await;

    tokio::time::sleep(StdDuration::from_millis(2)).await;
    cache.on_visible();
    assert_eq!(cache.state(), LoadState::Refreshing);
    settle(&mut cache).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_mutations_are_immediately_visible() {
    let calls = Arc::new(AtomicU32::new(0));
    let fail = Arc::new(AtomicBool::new(false));
    let mut cache = counting_cache(
      Duration::minutes(3),
      vec![item("a"), item("b")],
      calls,
      fail,
    );

    cache.load(false);
    settle(&mut cache).await;

    cache.insert(item("c"), Position::Append);
    assert_eq!(ids(&cache), vec!["a", "b", "c"]);

    cache.insert(item("d"), Position::Prepend);
    assert_eq!(ids(&cache), vec!["d", "a", "b", "c"]);

    cache.remove("a");
    assert_eq!(ids(&cache), vec!["d", "b", "c"]);

    let mut updated = item("b");
    updated.kind = "note";
    cache.update(updated.clone());
    assert_eq!(cache.get("b"), Some(&updated));
    assert_eq!(ids(&cache), vec!["d", "b", "c"]);
  }

  #[tokio::test]
  async fn test_fetch_overwrites_in_flight_mutation() {
    let mut cache = CollectionCache::new(
      "items",
      Session::new(),
      Duration::minutes(3),
      move |_force| async move {
        tokio::time::sleep(StdDuration::from_millis(30)).await;
        Ok(vec![item("b")])
      },
    );

    cache.load(false);
    cache.insert(item("a"), Position::Append);
    assert_eq!(ids(&cache), vec!["a"]);

    // Last full fetch wins; the optimistic insert was a display optimization
    settle(&mut cache).await;
    assert_eq!(ids(&cache), vec!["b"]);
  }

  #[tokio::test]
  async fn test_stats_track_every_mutation() {
    let mut cache = CollectionCache::with_stats(
      "items",
      Session::new(),
      Duration::minutes(3),
      move |_force| async move { Ok(vec![item("a"), item("b")]) },
      count_documents,
    );
    assert_eq!(*cache.stats(), 0);

    cache.load(false);
    settle(&mut cache).await;
    assert_eq!(*cache.stats(), count_documents(cache.items()));
    assert_eq!(*cache.stats(), 2);

    cache.insert(item("c"), Position::Append);
    assert_eq!(*cache.stats(), 3);

    let mut note = item("b");
    note.kind = "note";
    cache.update(note);
    assert_eq!(*cache.stats(), 2);

    cache.remove("a");
    assert_eq!(*cache.stats(), count_documents(cache.items()));
    assert_eq!(*cache.stats(), 1);

    cache.reset();
    assert_eq!(*cache.stats(), 0);
  }

  #[tokio::test]
  async fn test_completion_from_ended_session_is_discarded() {
    let session = Session::new();
    let mut cache = CollectionCache::new(
      "items",
      session.clone(),
      Duration::minutes(3),
      move |_force| async move {
        tokio::time::sleep(StdDuration::from_millis(20)).await;
        Ok(vec![item("a")])
      },
    );

    cache.load(false);
    assert_eq!(cache.state(), LoadState::Loading);
    session.bump();
    tokio::time::sleep(StdDuration::from_millis(60)).await;

    // The store is untouched, but the loading indicator must come down and
    // that is a change the host has to re-render for
    assert!(cache.poll());
    assert!(cache.items().is_empty());
    assert_eq!(cache.state(), LoadState::Uninitialized);
    assert_eq!(cache.last_fetched_at(), None);

    assert!(!cache.poll());
  }

  #[tokio::test]
  async fn test_discarded_completion_ends_background_refresh() {
    let session = Session::new();
    let mut cache = CollectionCache::new(
      "items",
      session.clone(),
      Duration::minutes(3),
      move |_force| async move {
        tokio::time::sleep(StdDuration::from_millis(20)).await;
        Ok(vec![item("a")])
      },
    );

    cache.load(false);
    settle(&mut cache).await;
    assert_eq!(ids(&cache), vec!["a"]);

    cache.load(true);
    assert_eq!(cache.state(), LoadState::Refreshing);
    session.bump();
    tokio::time::sleep(StdDuration::from_millis(60)).await;

    assert!(cache.poll());
    assert_eq!(cache.state(), LoadState::Ready);
    assert_eq!(ids(&cache), vec!["a"]);
  }

  #[tokio::test]
  async fn test_reset_drops_in_flight_fetch() {
    let mut cache = CollectionCache::new(
      "items",
      Session::new(),
      Duration::minutes(3),
      move |_force| async move {
        tokio::time::sleep(StdDuration::from_millis(20)).await;
        Ok(vec![item("a")])
      },
    );

    cache.load(false);
    cache.reset();
    tokio::time::sleep(StdDuration::from_millis(60)).await;

    assert!(!cache.poll());
    assert!(cache.items().is_empty());
    assert_eq!(cache.state(), LoadState::Uninitialized);
  }

  #[tokio::test]
  async fn test_unauthorized_failure_is_flagged() {
    let mut cache = CollectionCache::new(
      "items",
      Session::new(),
      Duration::minutes(3),
      move |_force| async move { Err(FetchError::Unauthorized) },
    );

    cache.load(false);
    settle(&mut cache).await;

    assert!(cache.saw_unauthorized());
    assert!(cache.error().is_some());

    cache.reset();
    assert!(!cache.saw_unauthorized());
  }
}
