//! Top-level error type for sync operations.
//!
//! Status-reporting operations funnel these into a terminal `Failed` status;
//! best-effort operations log and discard them. Nothing here is a panic path.

use thiserror::Error;

use crate::api::ApiError;
use crate::db::types::DbError;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("network error: {0}")]
    Api(#[from] ApiError),

    #[error("database error: {0}")]
    Db(#[from] DbError),

    /// The event's conference could not be resolved even after a full
    /// conference-list refresh.
    #[error("no conference found for acronym '{0}'")]
    UnknownConference(String),

    /// The remote event payload carried no usable conference reference.
    #[error("event {0} has no conference url")]
    MissingConferenceUrl(String),
}
