use tvault_types::{ObjectId, StatusCode};

use crate::handle::DataFlags;

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    /// Create without `OVERWRITE` on an existing id.
    #[error("object already exists: {0}")]
    AlreadyExists(ObjectId),

    /// The handle lacks the access right the operation needs.
    #[error("access denied on {id}: handle lacks {needed}")]
    AccessDenied { id: ObjectId, needed: &'static str },

    /// Another open handle on the object excludes the requested access.
    #[error("access conflict on {id}: open with {held:?}, requested {requested:?}")]
    AccessConflict {
        id: ObjectId,
        held: DataFlags,
        requested: DataFlags,
    },

    /// The backing store cannot hold the write.
    #[error("no space for {requested} bytes on {id} ({available} available)")]
    NoSpace {
        id: ObjectId,
        requested: u64,
        available: u64,
    },

    /// The object would grow past the per-object limit.
    #[error("object {id} would reach {size} bytes (max {max})")]
    ObjectTooLarge { id: ObjectId, size: u64, max: u64 },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Status code reported across the boundary for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::ItemNotFound,
            Self::AccessConflict { .. } => StatusCode::AccessConflict,
            Self::NoSpace { .. } | Self::ObjectTooLarge { .. } => StatusCode::StorageNoSpace,
            Self::AlreadyExists(_) | Self::AccessDenied { .. } | Self::Io(_) => StatusCode::Generic,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
