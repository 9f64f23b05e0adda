use thiserror::Error;

/// Failures of a publish cycle.
///
/// Only [`SyncError::SourceQueryFailed`] aborts a cycle. Every other variant is
/// scoped to one entry (or, for [`SyncError::PushFailed`], to the push) and is
/// recorded on the [`crate::synchronise::SyncReport`] while the batch carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("querying entries from the source store failed: {0}")]
    SourceQueryFailed(String),

    #[error("entry {entry_id} is missing required field `{field}`")]
    MalformedEntry {
        entry_id: String,
        field: &'static str,
    },

    #[error("fetching blocks for entry {entry_id} failed: {reason}")]
    FetchBlocksFailed { entry_id: String, reason: String },

    #[error("writing the document for entry {entry_id} failed: {reason}")]
    PersistFailed { entry_id: String, reason: String },

    #[error("committing the document for entry {entry_id} failed: {reason}")]
    CommitFailed { entry_id: String, reason: String },

    #[error("marking entry {entry_id} as published failed: {reason}")]
    AcknowledgeFailed { entry_id: String, reason: String },

    #[error("pushing commits failed: {0}")]
    PushFailed(String),

    #[error("listing documents in the output directory failed: {0}")]
    ListDocumentsFailed(String),
}

impl SyncError {
    /// The entry this error belongs to, if it is entry-scoped.
    pub fn entry_id(&self) -> Option<&str> {
        match self {
            SyncError::MalformedEntry { entry_id, .. }
            | SyncError::FetchBlocksFailed { entry_id, .. }
            | SyncError::PersistFailed { entry_id, .. }
            | SyncError::CommitFailed { entry_id, .. }
            | SyncError::AcknowledgeFailed { entry_id, .. } => Some(entry_id),
            SyncError::SourceQueryFailed(_)
            | SyncError::PushFailed(_)
            | SyncError::ListDocumentsFailed(_) => None,
        }
    }
}
