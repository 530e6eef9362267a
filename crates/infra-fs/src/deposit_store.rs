// Filesystem DepositStore
// Deposit directories live in inbox batches and are relocated into outboxes by rename

use crate::bag::{find_bag_dir, list_metadata_documents, read_bag_info, read_manifest};
use ingestflow_core::domain::properties::{
    KEY_DEPOSITOR, KEY_DOI, KEY_STATE_DESCRIPTION, KEY_STATE_LABEL, PROPERTIES_FILE,
};
use ingestflow_core::domain::{
    Deposit, DepositLocation, DepositProperties, DepositState, DomainError,
};
use ingestflow_core::error::{AppError, Result};
use ingestflow_core::port::deposit_store::{OUTBOX_FAILED, OUTBOX_PROCESSED, OUTBOX_REJECTED};
use ingestflow_core::port::DepositStore;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const TEMP_PROPERTIES_FILE: &str = ".deposit.properties.tmp";

#[derive(Debug, Clone, Default)]
pub struct FsDepositStore;

impl FsDepositStore {
    pub fn new() -> Self {
        Self
    }

    fn read_properties(dir: &Path) -> Result<DepositProperties> {
        let path = dir.join(PROPERTIES_FILE);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(DepositProperties::parse(&content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(DomainError::InvalidDeposit(
                format!("{} has no {}", dir.display(), PROPERTIES_FILE),
            )
            .into()),
            Err(e) => Err(e.into()),
        }
    }

    /// True if the directory has entries besides the empty outbox sub-directories
    fn has_content(outbox: &Path) -> Result<bool> {
        for entry in fs::read_dir(outbox)? {
            let path = entry?.path();
            let is_subdir = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| [OUTBOX_PROCESSED, OUTBOX_REJECTED, OUTBOX_FAILED].contains(&n))
                .unwrap_or(false);
            if !is_subdir || !path.is_dir() || fs::read_dir(&path)?.next().is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl DepositStore for FsDepositStore {
    fn is_deposit_dir(&self, dir: &Path) -> bool {
        dir.is_dir() && dir.join(PROPERTIES_FILE).is_file()
    }

    fn list_deposit_dirs(&self, batch_dir: &Path) -> Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(batch_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(AppError::NotFound(format!(
                    "Batch directory {}",
                    batch_dir.display()
                )))
            }
            Err(e) => return Err(e.into()),
        };

        let mut dirs = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                dirs.push(entry.path());
            }
        }
        dirs.sort();
        Ok(dirs)
    }

    fn read_location(&self, dir: &Path) -> Result<DepositLocation> {
        let properties = Self::read_properties(dir)?;
        let bag_dir = find_bag_dir(dir)?;
        let bag_info = read_bag_info(&bag_dir)?;
        Ok(DepositLocation::resolve(dir, &properties, &bag_info)?)
    }

    fn read_deposit(&self, location: &DepositLocation) -> Result<Deposit> {
        let dir = location.dir();
        let properties = Self::read_properties(dir)?;
        let bag_dir = find_bag_dir(dir)?;
        let bag_info = read_bag_info(&bag_dir)?;

        let state = match properties.get_non_blank(KEY_STATE_LABEL) {
            Some(label) => DepositState::parse(label)?,
            None => DepositState::Submitted,
        };

        Ok(Deposit {
            id: location.deposit_id(),
            dir: dir.to_path_buf(),
            kind: location.kind().clone(),
            target: location.target().to_string(),
            created: location.created(),
            depositor: properties.get_non_blank(KEY_DEPOSITOR).map(str::to_string),
            doi: properties.get_non_blank(KEY_DOI).map(str::to_string),
            state,
            state_description: properties
                .get(KEY_STATE_DESCRIPTION)
                .unwrap_or_default()
                .to_string(),
            files: read_manifest(&bag_dir)?,
            metadata_documents: list_metadata_documents(&bag_dir)?,
            bag_info,
            bag_dir,
            properties,
        })
    }

    fn write_properties(&self, dir: &Path, update: &DepositProperties) -> Result<()> {
        let mut properties = match Self::read_properties(dir) {
            Ok(existing) => existing,
            Err(AppError::Domain(DomainError::InvalidDeposit(_))) => DepositProperties::default(),
            Err(e) => return Err(e),
        };
        properties.merge(update);

        let temp = dir.join(TEMP_PROPERTIES_FILE);
        fs::write(&temp, properties.render())?;
        fs::rename(&temp, dir.join(PROPERTIES_FILE))?;
        debug!(deposit = %dir.display(), "Deposit properties written");
        Ok(())
    }

    fn move_to_outbox(&self, dir: &Path, target_dir: &Path) -> Result<PathBuf> {
        let name = dir
            .file_name()
            .ok_or_else(|| AppError::Validation(format!("{} has no name", dir.display())))?;
        let destination = target_dir.join(name);

        match (dir.exists(), destination.exists()) {
            (false, true) => {
                debug!(
                    deposit = %dir.display(),
                    destination = %destination.display(),
                    "Deposit already relocated"
                );
                return Ok(destination);
            }
            (true, true) => {
                return Err(AppError::Conflict(format!(
                    "{} already exists",
                    destination.display()
                )))
            }
            (false, false) => {
                return Err(AppError::NotFound(format!("Deposit {}", dir.display())))
            }
            (true, false) => {}
        }

        fs::create_dir_all(target_dir)?;
        fs::rename(dir, &destination)?;
        info!(
            deposit = %dir.display(),
            destination = %destination.display(),
            "Deposit moved to outbox"
        );
        Ok(destination)
    }

    fn is_relocated(&self, dir: &Path, target_dir: &Path) -> bool {
        match dir.file_name() {
            Some(name) => !dir.exists() && target_dir.join(name).is_dir(),
            None => false,
        }
    }

    fn prepare_outbox(&self, outbox: &Path, resume: bool) -> Result<()> {
        if outbox.is_dir() && !resume && Self::has_content(outbox)? {
            return Err(AppError::Conflict(format!(
                "Outbox {} is not empty; continue the previous run or clear it",
                outbox.display()
            )));
        }
        for subdir in [OUTBOX_PROCESSED, OUTBOX_REJECTED, OUTBOX_FAILED] {
            fs::create_dir_all(outbox.join(subdir))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{DepositFixture, DEPOSIT_ID};
    use ingestflow_core::domain::DepositKind;
    use tempfile::TempDir;

    const UPDATE_ID: &str = "2a7c9e11-5b3d-4c8f-9e0a-1b2c3d4e5f60";

    #[test]
    fn test_is_deposit_dir_requires_properties() {
        let fixture = DepositFixture::new().write();
        let store = FsDepositStore::new();
        assert!(store.is_deposit_dir(&fixture.dir));

        fs::remove_file(fixture.dir.join(PROPERTIES_FILE)).unwrap();
        assert!(!store.is_deposit_dir(&fixture.dir));
    }

    #[test]
    fn test_list_skips_files_and_sorts() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("b")).unwrap();
        fs::create_dir(tmp.path().join("a")).unwrap();
        fs::write(tmp.path().join("README"), "x").unwrap();

        let dirs = FsDepositStore::new().list_deposit_dirs(tmp.path()).unwrap();
        assert_eq!(dirs, vec![tmp.path().join("a"), tmp.path().join("b")]);
    }

    #[test]
    fn test_list_missing_batch_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let result = FsDepositStore::new().list_deposit_dirs(&tmp.path().join("nope"));
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_read_location_of_new_deposit() {
        let fixture = DepositFixture::new().write();
        let location = FsDepositStore::new().read_location(&fixture.dir).unwrap();

        assert_eq!(location.deposit_id().to_string(), DEPOSIT_ID);
        assert_eq!(location.target(), format!("sword:{}", DEPOSIT_ID));
        assert_eq!(location.kind(), &DepositKind::NewDeposit);
        assert_eq!(location.created().to_rfc3339(), "2020-02-15T08:01:00+01:00");
    }

    #[test]
    fn test_read_location_of_update_uses_token_target() {
        let fixture = DepositFixture::new()
            .with_id(UPDATE_ID)
            .with_properties(
                "dataverse.sword-token=sword:first\nidentifier.doi=doi:10.5072/FK2/XYZ\n",
            )
            .with_bag_info(
                "Created: 2020-02-16T10:00:00Z\nIs-Version-Of: urn:uuid:0b9bb5ee-3187-4387-bb39-2c09536c79f7\n",
            )
            .write();

        let location = FsDepositStore::new().read_location(&fixture.dir).unwrap();
        assert_eq!(location.target(), "sword:first");
        assert!(location.kind().is_update());
    }

    #[test]
    fn test_read_location_rejects_offsetless_created() {
        let fixture = DepositFixture::new()
            .with_bag_info("Created: 2020-02-15T08:01:00\n")
            .write();

        let result = FsDepositStore::new().read_location(&fixture.dir);
        assert!(matches!(
            result,
            Err(AppError::Domain(DomainError::InvalidTimestamp { .. }))
        ));
    }

    #[test]
    fn test_read_location_rejects_non_uuid_name() {
        let fixture = DepositFixture::new().with_id("not-a-uuid").write();
        let result = FsDepositStore::new().read_location(&fixture.dir);
        assert!(matches!(
            result,
            Err(AppError::Domain(DomainError::InvalidDepositId { .. }))
        ));
    }

    #[test]
    fn test_read_deposit_loads_payload_and_metadata() {
        let fixture = DepositFixture::new()
            .with_file("data/report.pdf", "pdf")
            .with_file("data/sub/table.csv", "a,b")
            .write();
        let store = FsDepositStore::new();
        let location = store.read_location(&fixture.dir).unwrap();

        let deposit = store.read_deposit(&location).unwrap();
        assert_eq!(deposit.state, DepositState::Submitted);
        assert_eq!(deposit.depositor.as_deref(), Some("user001"));
        assert_eq!(deposit.doi, None);
        assert_eq!(deposit.bag_dir, fixture.dir.join("bag"));
        assert_eq!(
            deposit.files.iter().map(|f| f.path.as_str()).collect::<Vec<_>>(),
            vec!["data/report.pdf", "data/sub/table.csv"]
        );
        assert_eq!(deposit.metadata_documents, vec!["metadata/dataset.json"]);
    }

    #[test]
    fn test_write_properties_preserves_unknown_keys() {
        let fixture = DepositFixture::new()
            .with_properties(&format!(
                "custom.key=kept\nstate.label=SUBMITTED\ndataverse.sword-token=sword:{}\n",
                DEPOSIT_ID
            ))
            .write();
        let mut update = DepositProperties::default();
        update.set(KEY_STATE_LABEL, "REJECTED");
        update.set(KEY_STATE_DESCRIPTION, "no title");

        FsDepositStore::new()
            .write_properties(&fixture.dir, &update)
            .unwrap();

        let content = fs::read_to_string(fixture.dir.join(PROPERTIES_FILE)).unwrap();
        assert_eq!(
            content,
            format!(
                "custom.key=kept\nstate.label=REJECTED\ndataverse.sword-token=sword:{}\nstate.description=no title\n",
                DEPOSIT_ID
            )
        );
        assert!(!fixture.dir.join(TEMP_PROPERTIES_FILE).exists());
    }

    #[test]
    fn test_move_to_outbox_is_idempotent() {
        let fixture = DepositFixture::new().write();
        let store = FsDepositStore::new();
        let target = fixture.root.join("outbox/processed");

        let destination = store.move_to_outbox(&fixture.dir, &target).unwrap();
        assert_eq!(destination, target.join(DEPOSIT_ID));
        assert!(!fixture.dir.exists());
        assert!(destination.join(PROPERTIES_FILE).is_file());

        // a re-run after a crash finds the deposit already relocated
        let again = store.move_to_outbox(&fixture.dir, &target).unwrap();
        assert_eq!(again, destination);
    }

    #[test]
    fn test_is_relocated_only_after_move() {
        let fixture = DepositFixture::new().write();
        let store = FsDepositStore::new();
        let target = fixture.root.join("outbox/rejected");

        assert!(!store.is_relocated(&fixture.dir, &target));
        store.move_to_outbox(&fixture.dir, &target).unwrap();
        assert!(store.is_relocated(&fixture.dir, &target));
        assert!(!store.is_relocated(&fixture.dir, &fixture.root.join("outbox/failed")));
    }

    #[test]
    fn test_move_conflicts_when_both_exist() {
        let fixture = DepositFixture::new().write();
        let target = fixture.root.join("outbox/failed");
        fs::create_dir_all(target.join(DEPOSIT_ID)).unwrap();

        let result = FsDepositStore::new().move_to_outbox(&fixture.dir, &target);
        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert!(fixture.dir.exists());
    }

    #[test]
    fn test_prepare_outbox_creates_subdirs() {
        let tmp = TempDir::new().unwrap();
        let outbox = tmp.path().join("out/batch-1");

        FsDepositStore::new().prepare_outbox(&outbox, false).unwrap();
        for subdir in [OUTBOX_PROCESSED, OUTBOX_REJECTED, OUTBOX_FAILED] {
            assert!(outbox.join(subdir).is_dir());
        }
        // a freshly prepared outbox counts as empty
        FsDepositStore::new().prepare_outbox(&outbox, false).unwrap();
    }

    #[test]
    fn test_prepare_non_empty_outbox_requires_resume() {
        let tmp = TempDir::new().unwrap();
        let outbox = tmp.path().join("batch-1");
        fs::create_dir_all(outbox.join(OUTBOX_PROCESSED).join(DEPOSIT_ID)).unwrap();
        let store = FsDepositStore::new();

        let result = store.prepare_outbox(&outbox, false);
        assert!(matches!(result, Err(AppError::Conflict(_))));

        store.prepare_outbox(&outbox, true).unwrap();
        assert!(outbox.join(OUTBOX_PROCESSED).join(DEPOSIT_ID).is_dir());
    }
}
