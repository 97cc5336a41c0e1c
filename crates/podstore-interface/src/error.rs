//! Error types shared by local and foreign-owned entities

use thiserror::Error;

use crate::types::EntityKind;

/// Opaque failure surfaced by a conduit implementation
pub type ConduitFailure = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum StoreError {
    /// The operation requires local authority over an entity this pod does not own.
    ///
    /// This is a caller bug: code paths must check ownership before reaching it.
    #[error("{entity}: {operation} not supported on a foreign-owned entity")]
    NotSupported {
        entity: EntityKind,
        operation: &'static str,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conduit error: {0}")]
    Conduit(#[source] ConduitFailure),

    #[error("Malformed {record} record: {reason}")]
    Deserialize {
        record: &'static str,
        reason: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl StoreError {
    pub fn not_supported(entity: EntityKind, operation: &'static str) -> Self {
        StoreError::NotSupported { entity, operation }
    }

    pub fn conduit(err: impl Into<ConduitFailure>) -> Self {
        StoreError::Conduit(err.into())
    }

    /// True for failures that indicate a caller invoked a forbidden operation
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, StoreError::NotSupported { .. })
    }

    /// True for failures raised while talking to (or decoding replies from) another pod
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            StoreError::Conduit(_) | StoreError::Deserialize { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
