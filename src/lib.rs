//! Client-side cached collection layer for the Satchel knowledge workspace.
//!
//! The backend owns documents, AI conversations, and connected Gmail messages;
//! this crate keeps an in-memory mirror of each of those collections on the
//! client, gated by a staleness window so the UI can render instantly from
//! cache and only hit the network when the data is old, missing, or explicitly
//! force-refreshed.
//!
//! The host application owns a [`Workspace`] and drives it from its event
//! loop:
//!
//! ```ignore
//! let config = Config::load(None)?;
//! let client = api::Client::new(&config)?;
//! let mut workspace = Workspace::new(client, &config);
//!
//! workspace.load_all(false);
//!
//! // In the event loop tick
//! if workspace.poll() {
//!     // State changed, re-render from workspace.documents.items() etc.
//! }
//! ```
//!
//! Local mutations (delete a document, star an email, start a conversation)
//! are applied optimistically after the corresponding API call succeeded; a
//! later full fetch is always authoritative and simply overwrites them.

pub mod api;
pub mod cache;
pub mod config;
pub mod logging;
pub mod session;
pub mod stats;
pub mod store;
pub mod workspace;

pub use cache::{CollectionCache, FetchError, LoadState};
pub use config::Config;
pub use session::Session;
pub use store::{Collection, Entity, Position};
pub use workspace::Workspace;
