// Metadata Mapper Port
// Transforms a loaded deposit into the repository's dataset representation

use crate::domain::Deposit;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Dataset representation sent to the remote repository (JSON)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetPayload(serde_json::Value);

impl DatasetPayload {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

/// Ancillary information the mapping may depend on
#[derive(Debug, Clone, Default)]
pub struct MappingContext {
    /// Task originates from the migration area
    pub is_migration: bool,
    /// Licences accepted for new or updated datasets (empty = any)
    pub allowed_licenses: Vec<String>,
}

/// Domain-rule violations found while mapping; they reject the deposit
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    #[error("Missing required field: {0}")]
    MissingRequiredField(String),

    #[error("License not allowed: {0}")]
    LicenseNotAllowed(String),

    #[error("Invalid file path: {0}")]
    InvalidFilePath(String),

    #[error("Unreadable metadata: {0}")]
    Unreadable(String),
}

pub trait MetadataMapper: Send + Sync {
    fn to_dataset_payload(
        &self,
        deposit: &Deposit,
        ctx: &MappingContext,
    ) -> Result<DatasetPayload, MappingError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;

    /// Maps every deposit to a minimal payload, or always fails with `error`
    pub struct MockMetadataMapper {
        error: Option<MappingError>,
    }

    impl MockMetadataMapper {
        pub fn new_success() -> Self {
            Self { error: None }
        }

        pub fn new_fail(error: MappingError) -> Self {
            Self { error: Some(error) }
        }
    }

    impl MetadataMapper for MockMetadataMapper {
        fn to_dataset_payload(
            &self,
            deposit: &Deposit,
            _ctx: &MappingContext,
        ) -> Result<DatasetPayload, MappingError> {
            match &self.error {
                Some(err) => Err(err.clone()),
                None => Ok(DatasetPayload::new(serde_json::json!({
                    "depositId": deposit.id.to_string(),
                }))),
            }
        }
    }
}
