//! mediathek — conference-recording sync engine and local media cache.
//!
//! The crate keeps a SQLite cache of conference/talk/recording metadata in
//! sync with a voctoweb-style REST API. Synced data (conference groups,
//! conferences, events, recordings, related-event links) is owned by the
//! [`sync::SyncEngine`] and can be wiped wholesale; user data (watchlist,
//! playback progress, recommendations, offline download references) is owned
//! by the embedding application through [`repository::MediaRepository`] and
//! survives such a wipe.
//!
//! Sync operations run on background tasks and report progress through
//! [`status::StatusStream`]: one `Running` value, then exactly one terminal
//! `Done`/`Failed`. Failures never escape as panics or unhandled errors;
//! they terminate the stream with a human-readable message.

pub mod api;
pub mod db;
pub mod error;
mod migrations;
pub mod repository;
pub mod status;
pub mod sync;
pub mod util;
mod worker;

pub use api::{ApiError, ClientConfig, RecordingApi, RecordingClient};
pub use db::types::DbError;
pub use db::MediaDb;
pub use error::SyncError;
pub use repository::MediaRepository;
pub use status::{StatusStream, SyncStatus};
pub use sync::{SearchResult, SyncEngine};
