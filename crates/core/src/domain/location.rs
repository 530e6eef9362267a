// Deposit Location: the cheap, metadata-only pointer used for ordering and target resolution

use super::bag_info::BagInfo;
use super::deposit::{DepositId, DepositKind};
use super::error::{DomainError, Result};
use super::properties::{DepositProperties, KEY_DOI, KEY_SWORD_TOKEN};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositLocation {
    dir: PathBuf,
    deposit_id: DepositId,
    target: String,
    created: DateTime<FixedOffset>,
    kind: DepositKind,
}

impl DepositLocation {
    /// Build a location. A blank target is rejected.
    pub fn new(
        dir: impl Into<PathBuf>,
        deposit_id: DepositId,
        target: impl Into<String>,
        created: DateTime<FixedOffset>,
        kind: DepositKind,
    ) -> Result<Self> {
        let target = target.into();
        if target.trim().is_empty() {
            return Err(DomainError::BlankTarget);
        }
        Ok(Self {
            dir: dir.into(),
            deposit_id,
            target,
            created,
            kind,
        })
    }

    /// Resolve a location from the already-read header documents of a deposit.
    ///
    /// The target prefers the update token over the persistent identifier.
    /// The deposit is an update iff bag-info names a predecessor.
    pub fn resolve(
        dir: &Path,
        properties: &DepositProperties,
        bag_info: &BagInfo,
    ) -> Result<Self> {
        let dir_name = dir
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                DomainError::InvalidDeposit(format!("{} has no directory name", dir.display()))
            })?;
        let deposit_id = DepositId::parse(dir_name)?;
        let created = bag_info.created()?;
        let target = resolve_target(properties)
            .ok_or_else(|| DomainError::MissingTarget(deposit_id.to_string()))?;
        let kind = match bag_info.is_version_of() {
            Some(_) => DepositKind::UpdateOf {
                target: target.to_string(),
            },
            None => DepositKind::NewDeposit,
        };
        Self::new(dir, deposit_id, target, created, kind)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn deposit_id(&self) -> DepositId {
        self.deposit_id
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn created(&self) -> DateTime<FixedOffset> {
        self.created
    }

    pub fn kind(&self) -> &DepositKind {
        &self.kind
    }
}

/// Update token if present, else persistent identifier
pub fn resolve_target(properties: &DepositProperties) -> Option<&str> {
    properties
        .get_non_blank(KEY_SWORD_TOKEN)
        .or_else(|| properties.get_non_blank(KEY_DOI))
        .map(str::trim)
}

/// Sort locations by creation instant, oldest first.
///
/// Instants are compared as absolute points in time, so differing UTC
/// offsets order correctly. The sort is stable for equal instants.
pub fn sort_by_created(locations: &mut [DepositLocation]) {
    locations.sort_by_key(|l| l.created);
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "0b9bb5ee-3187-4387-bb39-2c09536c79f7";

    fn location(created: &str) -> DepositLocation {
        DepositLocation::new(
            format!("/inbox/{}", created),
            DepositId::parse(ID).unwrap(),
            "sword:target",
            DateTime::parse_from_rfc3339(created).unwrap(),
            DepositKind::NewDeposit,
        )
        .unwrap()
    }

    #[test]
    fn test_blank_target_is_rejected() {
        let result = DepositLocation::new(
            "/inbox/x",
            DepositId::parse(ID).unwrap(),
            "  ",
            DateTime::parse_from_rfc3339("2020-02-15T08:01:00Z").unwrap(),
            DepositKind::NewDeposit,
        );
        assert!(matches!(result, Err(DomainError::BlankTarget)));
    }

    #[test]
    fn test_sort_normalizes_offsets() {
        let mut locations = vec![
            location("2020-02-15T09:01:00+01:00"),
            location("2020-02-15T08:02:00Z"),
            location("2020-02-15T03:03:00-05:00"),
            location("2020-02-15T07:04:00+01:00"),
            location("2020-02-15T08:04:00Z"),
        ];

        sort_by_created(&mut locations);

        let utc: Vec<String> = locations
            .iter()
            .map(|l| {
                l.created()
                    .with_timezone(&chrono::Utc)
                    .format("%H:%MZ")
                    .to_string()
            })
            .collect();
        assert_eq!(utc, vec!["06:04Z", "08:01Z", "08:02Z", "08:03Z", "08:04Z"]);
    }

    #[test]
    fn test_resolve_prefers_update_token() {
        let props = DepositProperties::parse(
            "dataverse.sword-token=sword:123\nidentifier.doi=doi:10.5072/FK2/XYZ\n",
        );
        let info = BagInfo::parse("Created: 2020-02-15T08:01:00Z\nIs-Version-Of: urn:uuid:1\n");
        let dir = PathBuf::from(format!("/inbox/batch/{}", ID));

        let loc = DepositLocation::resolve(&dir, &props, &info).unwrap();

        assert_eq!(loc.target(), "sword:123");
        assert_eq!(
            loc.kind(),
            &DepositKind::UpdateOf {
                target: "sword:123".to_string()
            }
        );
    }

    #[test]
    fn test_resolve_falls_back_to_pid() {
        let props = DepositProperties::parse("identifier.doi=doi:10.5072/FK2/XYZ\n");
        let info = BagInfo::parse("Created: 2020-02-15T08:01:00Z\n");
        let dir = PathBuf::from(format!("/inbox/batch/{}", ID));

        let loc = DepositLocation::resolve(&dir, &props, &info).unwrap();

        assert_eq!(loc.target(), "doi:10.5072/FK2/XYZ");
        assert_eq!(loc.kind(), &DepositKind::NewDeposit);
    }

    #[test]
    fn test_resolve_without_any_target_fails() {
        let props = DepositProperties::parse("depositor.userId=user001\n");
        let info = BagInfo::parse("Created: 2020-02-15T08:01:00Z\n");
        let dir = PathBuf::from(format!("/inbox/batch/{}", ID));

        let err = DepositLocation::resolve(&dir, &props, &info).unwrap_err();
        assert!(matches!(err, DomainError::MissingTarget(_)));
    }

    #[test]
    fn test_resolve_requires_uuid_directory_name() {
        let props = DepositProperties::parse("identifier.doi=doi:10.5072/FK2/XYZ\n");
        let info = BagInfo::parse("Created: 2020-02-15T08:01:00Z\n");

        let err = DepositLocation::resolve(Path::new("/inbox/batch/deposit-1"), &props, &info)
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidDepositId { .. }));
    }
}
