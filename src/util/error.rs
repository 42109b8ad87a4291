//! Error types for the serializer.

use thiserror::Error;

use crate::container::BackendError;

/// Main error type for serialization calls.
#[derive(Error, Debug)]
pub enum Error {
    /// `serialize` was called without a value
    #[error("Cannot serialize a null value")]
    NullInput,

    /// The container backend rejected a write
    #[error("Backend write failed at {path}: {source}")]
    BackendWrite {
        path: String,
        #[source]
        source: BackendError,
    },

    /// No compound writer is registered for an array element type
    #[error("No compound writer registered for element type {type_name} (at {path})")]
    DispatchResolution { type_name: String, path: String },

    /// Rows of a compound array cannot share one layout
    #[error("Invalid compound layout for {type_name} at row {row}: {reason}")]
    CompoundLayout {
        type_name: String,
        row: usize,
        reason: String,
    },

    /// An object was reached again through its own descendants
    #[error("Cycle detected at {path}: {type_name} is already being serialized")]
    CycleDetected { path: String, type_name: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON export error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wrap a backend failure with the path of the node being written.
    pub fn backend(path: impl Into<String>, source: BackendError) -> Self {
        Self::BackendWrite {
            path: path.into(),
            source,
        }
    }

    /// Create a compound layout error.
    pub fn layout(type_name: impl Into<String>, row: usize, reason: impl Into<String>) -> Self {
        Self::CompoundLayout {
            type_name: type_name.into(),
            row,
            reason: reason.into(),
        }
    }

    /// Path of the failing node, for the variants that carry one.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::BackendWrite { path, .. }
            | Self::DispatchResolution { path, .. }
            | Self::CycleDetected { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Result type alias for serializer operations.
pub type Result<T> = std::result::Result<T, Error>;
