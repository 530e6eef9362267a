// Deposit Store Port
// Filesystem-side operations on deposit directories, inboxes and outboxes

use crate::domain::{Deposit, DepositLocation, DepositProperties, DepositState};
use crate::error::Result;
use std::path::{Path, PathBuf};

/// Outbox sub-directory names
pub const OUTBOX_PROCESSED: &str = "processed";
pub const OUTBOX_REJECTED: &str = "rejected";
pub const OUTBOX_FAILED: &str = "failed";

/// Outbox sub-directory receiving deposits that ended in `state`
pub fn outbox_subdir(state: DepositState) -> &'static str {
    match state {
        DepositState::Accepted | DepositState::Published => OUTBOX_PROCESSED,
        DepositState::Rejected => OUTBOX_REJECTED,
        _ => OUTBOX_FAILED,
    }
}

/// Deposit directory access.
///
/// Implementations are synchronous; calls are short filesystem operations.
pub trait DepositStore: Send + Sync {
    /// A directory is a deposit iff it contains the properties file
    fn is_deposit_dir(&self, dir: &Path) -> bool;

    /// Immediate sub-directories of a batch directory, sorted by name
    fn list_deposit_dirs(&self, batch_dir: &Path) -> Result<Vec<PathBuf>>;

    /// Cheap metadata-only read sufficient for ordering and target resolution
    fn read_location(&self, dir: &Path) -> Result<DepositLocation>;

    /// Full load of the deposit behind a location
    fn read_deposit(&self, location: &DepositLocation) -> Result<Deposit>;

    /// Merge `update` into the deposit's properties file
    fn write_properties(&self, dir: &Path, update: &DepositProperties) -> Result<()>;

    /// Relocate a deposit directory into `target_dir` with a single rename.
    ///
    /// If the deposit was already relocated (source gone, destination present)
    /// this succeeds without moving anything.
    fn move_to_outbox(&self, dir: &Path, target_dir: &Path) -> Result<PathBuf>;

    /// True when `dir` is gone and its counterpart in `target_dir` exists
    fn is_relocated(&self, dir: &Path, target_dir: &Path) -> bool;

    /// Create an outbox with its processed/rejected/failed sub-directories.
    ///
    /// An existing non-empty outbox is only accepted when `resume` is set.
    fn prepare_outbox(&self, outbox: &Path, resume: bool) -> Result<()>;
}

pub mod mocks {
    use super::*;
    use crate::domain::DomainError;
    use crate::error::AppError;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// In-memory deposit store; deposits are registered up front
    #[derive(Clone, Default)]
    pub struct InMemoryDepositStore {
        state: Arc<Mutex<StoreState>>,
    }

    #[derive(Default)]
    struct StoreState {
        deposits: HashMap<PathBuf, Deposit>,
        unreadable: HashMap<PathBuf, String>,
        plain_dirs: Vec<PathBuf>,
        written: Vec<(PathBuf, DepositProperties)>,
        moves: Vec<(PathBuf, PathBuf)>,
        outboxes: Vec<PathBuf>,
    }

    impl InMemoryDepositStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_deposit(&self, deposit: Deposit) {
            self.state
                .lock()
                .unwrap()
                .deposits
                .insert(deposit.dir.clone(), deposit);
        }

        /// Register a directory whose location cannot be read
        pub fn add_unreadable(&self, dir: impl Into<PathBuf>, message: impl Into<String>) {
            self.state
                .lock()
                .unwrap()
                .unreadable
                .insert(dir.into(), message.into());
        }

        /// Register a directory without a properties file
        pub fn add_plain_dir(&self, dir: impl Into<PathBuf>) {
            self.state.lock().unwrap().plain_dirs.push(dir.into());
        }

        pub fn written(&self) -> Vec<(PathBuf, DepositProperties)> {
            self.state.lock().unwrap().written.clone()
        }

        pub fn moves(&self) -> Vec<(PathBuf, PathBuf)> {
            self.state.lock().unwrap().moves.clone()
        }

        pub fn outboxes(&self) -> Vec<PathBuf> {
            self.state.lock().unwrap().outboxes.clone()
        }
    }

    impl DepositStore for InMemoryDepositStore {
        fn is_deposit_dir(&self, dir: &Path) -> bool {
            let state = self.state.lock().unwrap();
            state.deposits.contains_key(dir) || state.unreadable.contains_key(dir)
        }

        fn list_deposit_dirs(&self, batch_dir: &Path) -> Result<Vec<PathBuf>> {
            let state = self.state.lock().unwrap();
            let mut dirs: Vec<PathBuf> = state
                .deposits
                .keys()
                .chain(state.unreadable.keys())
                .chain(state.plain_dirs.iter())
                .filter(|d| d.parent() == Some(batch_dir))
                .cloned()
                .collect();
            dirs.sort();
            Ok(dirs)
        }

        fn read_location(&self, dir: &Path) -> Result<DepositLocation> {
            let state = self.state.lock().unwrap();
            if let Some(message) = state.unreadable.get(dir) {
                return Err(AppError::Domain(DomainError::InvalidDeposit(message.clone())));
            }
            let deposit = state
                .deposits
                .get(dir)
                .ok_or_else(|| AppError::NotFound(dir.display().to_string()))?;
            Ok(DepositLocation::new(
                deposit.dir.clone(),
                deposit.id,
                deposit.target.clone(),
                deposit.created,
                deposit.kind.clone(),
            )?)
        }

        fn read_deposit(&self, location: &DepositLocation) -> Result<Deposit> {
            self.state
                .lock()
                .unwrap()
                .deposits
                .get(location.dir())
                .cloned()
                .ok_or_else(|| AppError::NotFound(location.dir().display().to_string()))
        }

        fn write_properties(&self, dir: &Path, update: &DepositProperties) -> Result<()> {
            self.state
                .lock()
                .unwrap()
                .written
                .push((dir.to_path_buf(), update.clone()));
            Ok(())
        }

        fn move_to_outbox(&self, dir: &Path, target_dir: &Path) -> Result<PathBuf> {
            let mut state = self.state.lock().unwrap();
            let name = dir
                .file_name()
                .ok_or_else(|| AppError::Validation(format!("{} has no name", dir.display())))?;
            let destination = target_dir.join(name);
            if state.moves.iter().any(|(src, _)| src == dir) {
                return Ok(destination);
            }
            state.deposits.remove(dir);
            state.unreadable.remove(dir);
            state.moves.push((dir.to_path_buf(), destination.clone()));
            Ok(destination)
        }

        fn is_relocated(&self, dir: &Path, target_dir: &Path) -> bool {
            let Some(name) = dir.file_name() else {
                return false;
            };
            let destination = target_dir.join(name);
            self.state
                .lock()
                .unwrap()
                .moves
                .iter()
                .any(|(src, dst)| src == dir && *dst == destination)
        }

        fn prepare_outbox(&self, outbox: &Path, _resume: bool) -> Result<()> {
            self.state.lock().unwrap().outboxes.push(outbox.to_path_buf());
            Ok(())
        }
    }
}
