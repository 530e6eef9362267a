// Deposit Domain Model

use super::bag_info::BagInfo;
use super::error::{DomainError, Result};
use super::properties::{
    DepositProperties, KEY_DOI, KEY_ID_AUTHORITY, KEY_ID_IDENTIFIER, KEY_ID_PROTOCOL,
    KEY_STATE_DESCRIPTION, KEY_STATE_LABEL,
};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Deposit identifier: the UUID-formatted name of the deposit directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DepositId(Uuid);

impl DepositId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    pub fn parse(value: &str) -> Result<Self> {
        Uuid::parse_str(value)
            .map(Self)
            .map_err(|source| DomainError::InvalidDepositId {
                value: value.to_string(),
                source,
            })
    }
}

impl std::fmt::Display for DepositId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a deposit creates a new dataset or updates the one behind `target`.
///
/// Resolved once when the deposit location is read; downstream code matches
/// on this instead of re-inspecting the package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepositKind {
    NewDeposit,
    UpdateOf { target: String },
}

impl DepositKind {
    pub fn is_update(&self) -> bool {
        matches!(self, DepositKind::UpdateOf { .. })
    }
}

/// Lifecycle label written back into the deposit's own properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DepositState {
    Submitted,
    InProgress,
    Accepted,
    Published,
    Rejected,
    Failed,
}

impl DepositState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DepositState::Accepted
                | DepositState::Published
                | DepositState::Rejected
                | DepositState::Failed
        )
    }

    pub fn parse(label: &str) -> Result<Self> {
        match label.trim() {
            "SUBMITTED" => Ok(DepositState::Submitted),
            "IN_PROGRESS" => Ok(DepositState::InProgress),
            "ACCEPTED" => Ok(DepositState::Accepted),
            "PUBLISHED" => Ok(DepositState::Published),
            "REJECTED" => Ok(DepositState::Rejected),
            "FAILED" => Ok(DepositState::Failed),
            other => Err(DomainError::UnknownStateLabel(other.to_string())),
        }
    }
}

impl std::fmt::Display for DepositState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DepositState::Submitted => write!(f, "SUBMITTED"),
            DepositState::InProgress => write!(f, "IN_PROGRESS"),
            DepositState::Accepted => write!(f, "ACCEPTED"),
            DepositState::Published => write!(f, "PUBLISHED"),
            DepositState::Rejected => write!(f, "REJECTED"),
            DepositState::Failed => write!(f, "FAILED"),
        }
    }
}

/// A payload file listed in the package manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositFile {
    /// Path relative to the bag directory (e.g. `data/report.pdf`)
    pub path: String,
    pub checksum: String,
}

/// Persistent identifier resolved for the dataset a deposit ended up in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistentId {
    pub protocol: String,
    pub authority: String,
    pub identifier: String,
}

impl PersistentId {
    /// Split `doi:10.5072/FK2/ABCDEF` into protocol, authority and identifier
    pub fn parse(pid: &str) -> Option<Self> {
        let (protocol, rest) = pid.split_once(':')?;
        let (authority, identifier) = rest.split_once('/')?;
        if protocol.is_empty() || authority.is_empty() || identifier.is_empty() {
            return None;
        }
        Some(Self {
            protocol: protocol.to_string(),
            authority: authority.to_string(),
            identifier: identifier.to_string(),
        })
    }
}

impl std::fmt::Display for PersistentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}/{}", self.protocol, self.authority, self.identifier)
    }
}

/// Fully loaded deposit package
#[derive(Debug, Clone)]
pub struct Deposit {
    pub id: DepositId,
    pub dir: PathBuf,
    pub bag_dir: PathBuf,
    pub kind: DepositKind,
    pub target: String,
    pub created: DateTime<FixedOffset>,
    pub depositor: Option<String>,
    pub doi: Option<String>,
    pub state: DepositState,
    pub state_description: String,
    pub bag_info: BagInfo,
    pub files: Vec<DepositFile>,
    /// Descriptive metadata documents, relative to the bag directory
    pub metadata_documents: Vec<String>,
    pub properties: DepositProperties,
}

impl Deposit {
    pub fn is_update(&self) -> bool {
        self.kind.is_update()
    }

    /// Move into IN_PROGRESS; only allowed from a non-terminal state
    pub fn start(&mut self) -> Result<()> {
        if self.state.is_terminal() {
            return Err(DomainError::InvalidStateTransition {
                from: self.state.to_string(),
                to: DepositState::InProgress.to_string(),
            });
        }
        self.state = DepositState::InProgress;
        self.state_description = "Processing started".to_string();
        Ok(())
    }

    /// Record a terminal state
    pub fn finish(&mut self, state: DepositState, description: impl Into<String>) {
        self.state = state;
        self.state_description = description.into();
    }

    /// Record the persistent identifier of the dataset this deposit resolved to
    pub fn resolve_pid(&mut self, pid: &str) {
        self.doi = Some(pid.to_string());
    }

    /// Properties as they must be persisted: state plus resolved identifiers
    pub fn to_properties(&self) -> DepositProperties {
        let mut props = self.properties.clone();
        props.set(KEY_STATE_LABEL, self.state.to_string());
        props.set(KEY_STATE_DESCRIPTION, self.state_description.clone());
        if let Some(doi) = &self.doi {
            props.set(KEY_DOI, doi.clone());
            if let Some(pid) = PersistentId::parse(doi) {
                props.set(KEY_ID_PROTOCOL, pid.protocol);
                props.set(KEY_ID_AUTHORITY, pid.authority);
                props.set(KEY_ID_IDENTIFIER, pid.identifier);
            }
        }
        props
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deposit() -> Deposit {
        Deposit {
            id: DepositId::parse("a5d9c5d4-1a47-4bb6-8a1c-5a2d2c4f0e11").unwrap(),
            dir: PathBuf::from("/inbox/batch/a5d9c5d4-1a47-4bb6-8a1c-5a2d2c4f0e11"),
            bag_dir: PathBuf::from("/inbox/batch/a5d9c5d4-1a47-4bb6-8a1c-5a2d2c4f0e11/bag"),
            kind: DepositKind::NewDeposit,
            target: "sword:a5d9c5d4".to_string(),
            created: DateTime::parse_from_rfc3339("2020-02-15T08:01:00Z").unwrap(),
            depositor: Some("user001".to_string()),
            doi: None,
            state: DepositState::Submitted,
            state_description: String::new(),
            bag_info: BagInfo::default(),
            files: vec![],
            metadata_documents: vec![],
            properties: DepositProperties::parse("custom=1\nstate.label=SUBMITTED\n"),
        }
    }

    #[test]
    fn test_deposit_id_must_be_uuid() {
        assert!(DepositId::parse("not-a-uuid").is_err());
        assert!(DepositId::parse("a5d9c5d4-1a47-4bb6-8a1c-5a2d2c4f0e11").is_ok());
    }

    #[test]
    fn test_state_label_roundtrip() {
        for state in [
            DepositState::Submitted,
            DepositState::InProgress,
            DepositState::Accepted,
            DepositState::Published,
            DepositState::Rejected,
            DepositState::Failed,
        ] {
            assert_eq!(DepositState::parse(&state.to_string()).unwrap(), state);
        }
        assert!(DepositState::parse("ARCHIVED?").is_err());
    }

    #[test]
    fn test_start_from_terminal_state_is_rejected() {
        let mut d = deposit();
        d.finish(DepositState::Published, "done");
        assert!(d.start().is_err());
    }

    #[test]
    fn test_to_properties_writes_state_and_pid_components() {
        let mut d = deposit();
        d.start().unwrap();
        d.resolve_pid("doi:10.5072/FK2/ABCDEF");
        d.finish(DepositState::Published, "The deposit was successfully ingested");

        let props = d.to_properties();
        assert_eq!(props.get(KEY_STATE_LABEL), Some("PUBLISHED"));
        assert_eq!(props.get(KEY_DOI), Some("doi:10.5072/FK2/ABCDEF"));
        assert_eq!(props.get(KEY_ID_PROTOCOL), Some("doi"));
        assert_eq!(props.get(KEY_ID_AUTHORITY), Some("10.5072"));
        assert_eq!(props.get(KEY_ID_IDENTIFIER), Some("FK2/ABCDEF"));
        assert_eq!(props.get("custom"), Some("1"));
    }

    #[test]
    fn test_kind_is_update() {
        let update = DepositKind::UpdateOf {
            target: "sword:123".to_string(),
        };
        assert!(update.is_update());
        assert!(!DepositKind::NewDeposit.is_update());
    }
}
