/*!
 * Error types for the podstore pod
 */

use podstore_interface::StoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PodstoreError>;

#[derive(Error, Debug)]
pub enum PodstoreError {
    /// Invalid or inconsistent configuration
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Failed to serialize configuration: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure raised by a home, calendar or object, local or foreign
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Attachment migration could not complete
    #[error("Migration of {owner} failed: {reason}")]
    Migration { owner: String, reason: String },
}

impl PodstoreError {
    /// Whether this wraps a call to an operation a foreign entity refuses
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, PodstoreError::Store(err) if err.is_contract_violation())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use podstore_interface::EntityKind;

    #[test]
    fn test_store_errors_pass_through() {
        let err: PodstoreError =
            StoreError::not_supported(EntityKind::Home, "get_availability").into();
        assert!(err.is_contract_violation());
        assert_eq!(
            err.to_string(),
            "CalendarHome: get_availability not supported on a foreign-owned entity"
        );

        let err = PodstoreError::Config("pod_id must not be empty".to_string());
        assert!(!err.is_contract_violation());
    }
}
