//! Error types for the podstore-connect crate

use podstore_interface::{PodId, StoreError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConduitError {
    #[error("No route to pod {0}")]
    UnknownPod(PodId),

    #[error("Owner {0} is not hosted by any known pod")]
    UnknownOwner(String),

    #[error("Pod {pod} rejected request: {message}")]
    Remote { pod: PodId, message: String },

    #[error("Attachment stream error: {0}")]
    Stream(#[from] std::io::Error),

    #[error("Failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<ConduitError> for StoreError {
    fn from(err: ConduitError) -> Self {
        StoreError::conduit(err)
    }
}
