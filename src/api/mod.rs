//! REST adapter over the workspace backend.
//!
//! Bulk-list endpoints populate the cached collections on load; the
//! single-entity create/update/delete endpoints are called by the host UI,
//! and their *successful* responses are what trigger the optimistic mutation
//! helpers on [`crate::Workspace`] - never the reverse.

mod client;
mod entities;
mod types;
mod wire;

pub use client::{to_fetch_error, Client, Unauthorized};
pub use types::{Conversation, Document, DocumentKind, EmailMessage, ProcessingStatus};
