//! In-memory ordered entity store for a single collection.
//!
//! A [`Collection`] holds the current authoritative client-side view of one
//! backend collection: entities keyed by id, with an explicit display order
//! that callers control on insert. It performs no I/O; the cache controller
//! and the optimistic mutation helpers are the only writers.

use std::collections::HashSet;

/// Trait for records mirrored from the backend.
///
/// Implementors carry a stable unique identifier within their collection.
/// Timestamps on the concrete types are for display and sorting only, never
/// for cache coherence.
pub trait Entity: Clone + Send + 'static {
  /// Stable unique identifier (e.g. document id, Gmail message id).
  fn id(&self) -> &str;
}

/// Where an optimistically inserted entity lands in the display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
  /// Front of the list (e.g. a newly started conversation).
  Prepend,
  /// End of the list (e.g. a newly uploaded document).
  Append,
}

/// Ordered, keyed collection of entities.
#[derive(Debug, Clone)]
pub struct Collection<T: Entity> {
  items: Vec<T>,
  ids: HashSet<String>,
  loaded: bool,
}

impl<T: Entity> Collection<T> {
  pub fn new() -> Self {
    Self {
      items: Vec::new(),
      ids: HashSet::new(),
      loaded: false,
    }
  }

  /// Atomically swap the full contents and order with a fetch result.
  ///
  /// Marks the collection as loaded even when the result is empty. Should the
  /// server ever return duplicate ids, later occurrences are dropped so the
  /// id-uniqueness invariant holds.
  pub fn replace_all(&mut self, entities: Vec<T>) {
    self.items.clear();
    self.ids.clear();
    for entity in entities {
      if self.ids.insert(entity.id().to_string()) {
        self.items.push(entity);
      }
    }
    self.loaded = true;
  }

  /// Insert an entity at the requested position.
  ///
  /// Returns `false` without touching the collection when an entity with the
  /// same id is already present; add and update are deliberately distinct
  /// operations so callers cannot duplicate by accident.
  pub fn insert(&mut self, entity: T, position: Position) -> bool {
    if !self.ids.insert(entity.id().to_string()) {
      return false;
    }
    match position {
      Position::Prepend => self.items.insert(0, entity),
      Position::Append => self.items.push(entity),
    }
    true
  }

  /// Replace the entity with a matching id in place, keeping its position.
  ///
  /// Returns `false` when no entity with that id is present.
  pub fn update(&mut self, entity: T) -> bool {
    match self.items.iter().position(|e| e.id() == entity.id()) {
      Some(index) => {
        self.items[index] = entity;
        true
      }
      None => false,
    }
  }

  /// Remove the entity with a matching id. Returns `false` when absent.
  pub fn remove(&mut self, id: &str) -> bool {
    match self.items.iter().position(|e| e.id() == id) {
      Some(index) => {
        self.items.remove(index);
        self.ids.remove(id);
        true
      }
      None => false,
    }
  }

  pub fn get(&self, id: &str) -> Option<&T> {
    self.items.iter().find(|e| e.id() == id)
  }

  /// Read-only ordered snapshot of the current contents.
  pub fn items(&self) -> &[T] {
    &self.items
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  /// Whether any fetch result has ever been applied, including an empty one.
  pub fn has_loaded(&self) -> bool {
    self.loaded
  }

  /// Drop all contents and the loaded mark (logout/reset).
  pub fn clear(&mut self) {
    self.items.clear();
    self.ids.clear();
    self.loaded = false;
  }
}

impl<T: Entity> Default for Collection<T> {
  fn default() -> Self {
    Self::new()
  }
}
