//! Area Watcher
//!
//! An area is one inbox/outbox pair. Import requests name a batch directory
//! (or a single deposit) below the inbox. The request is validated up front;
//! nothing is touched unless every entry is a deposit directory. Accepted
//! requests are enqueued in the background.

pub mod auto_ingest;

pub use auto_ingest::AutoIngestScanner;

use crate::application::enqueue::{BatchRequest, BatchSource, EnqueuingService};
use crate::application::ingest::{run_blocking, TaskOptions};
use crate::error::{AppError, Result};
use crate::port::DepositStore;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaKind {
    Import,
    Migration,
    AutoIngest,
}

impl std::fmt::Display for AreaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AreaKind::Import => write!(f, "import"),
            AreaKind::Migration => write!(f, "migration"),
            AreaKind::AutoIngest => write!(f, "auto_ingest"),
        }
    }
}

impl std::str::FromStr for AreaKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "import" => Ok(AreaKind::Import),
            "migration" => Ok(AreaKind::Migration),
            "auto_ingest" => Ok(AreaKind::AutoIngest),
            other => Err(AppError::Validation(format!("Unknown area: {}", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AreaConfig {
    pub kind: AreaKind,
    pub inbox: PathBuf,
    pub outbox: PathBuf,
    pub publish: bool,
}

impl AreaConfig {
    pub fn task_options(&self) -> TaskOptions {
        TaskOptions {
            is_migration: self.kind == AreaKind::Migration,
            publish: self.publish,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRequest {
    /// Batch or deposit directory, absolute or relative to the inbox
    pub path: PathBuf,
    /// `path` is one deposit rather than a batch of deposits
    #[serde(default)]
    pub single_deposit: bool,
    /// Resume an interrupted batch into its existing outbox
    #[serde(default)]
    pub continue_previous: bool,
}

pub struct Area {
    config: AreaConfig,
    store: Arc<dyn DepositStore>,
    enqueuer: Arc<EnqueuingService>,
}

impl Area {
    pub fn new(
        config: AreaConfig,
        store: Arc<dyn DepositStore>,
        enqueuer: Arc<EnqueuingService>,
    ) -> Self {
        Self {
            config,
            store,
            enqueuer,
        }
    }

    pub fn config(&self) -> &AreaConfig {
        &self.config
    }

    pub fn kind(&self) -> AreaKind {
        self.config.kind
    }

    /// Validate the request, prepare the outbox and start enqueuing.
    ///
    /// Returns the batch name (path relative to the inbox).
    pub async fn start_import(&self, request: ImportRequest) -> Result<String> {
        let relative = self.relative_path(&request.path)?;
        let name = relative.to_string_lossy().into_owned();
        let path = self.config.inbox.join(&relative);

        let (source, outbox, resume) = if request.single_deposit {
            // Single deposits share the outbox of the directory holding them
            let outbox = match relative.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => self.config.outbox.join(parent),
                _ => self.config.outbox.clone(),
            };
            (BatchSource::Single(path.clone()), outbox, true)
        } else {
            (
                BatchSource::Batch(path.clone()),
                self.config.outbox.join(&relative),
                request.continue_previous,
            )
        };

        let check = source.clone();
        let prepared = outbox.clone();
        run_blocking(&self.store, move |store| {
            validate_source(store, &check)?;
            store.prepare_outbox(&prepared, resume)
        })
        .await?;

        info!(
            area = %self.config.kind,
            batch = %name,
            single_deposit = request.single_deposit,
            continue_previous = request.continue_previous,
            "Import accepted"
        );

        self.enqueuer.spawn(BatchRequest {
            name: name.clone(),
            source,
            outbox,
            options: self.config.task_options(),
        });
        Ok(name)
    }

    /// Path relative to the inbox; must name something strictly below it
    fn relative_path(&self, path: &Path) -> Result<PathBuf> {
        let relative = if path.is_absolute() {
            path.strip_prefix(&self.config.inbox)
                .map_err(|_| {
                    AppError::Validation(format!(
                        "{} is not inside the {} inbox {}",
                        path.display(),
                        self.config.kind,
                        self.config.inbox.display()
                    ))
                })?
                .to_path_buf()
        } else {
            path.to_path_buf()
        };

        if relative.as_os_str().is_empty() {
            return Err(AppError::Validation(
                "Path must name a directory below the inbox, not the inbox itself".to_string(),
            ));
        }
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(AppError::Validation(format!(
                "Path {} must not contain '..' or root components",
                path.display()
            )));
        }
        Ok(relative)
    }
}

/// A deposit directory must hold the properties file; a batch is valid iff
/// every immediate sub-directory is a deposit directory.
fn validate_source(store: &dyn DepositStore, source: &BatchSource) -> Result<()> {
    match source {
        BatchSource::Single(dir) => {
            if !store.is_deposit_dir(dir) {
                return Err(AppError::Validation(format!(
                    "{} is not a deposit directory",
                    dir.display()
                )));
            }
        }
        BatchSource::Batch(dir) => {
            let entries = store.list_deposit_dirs(dir)?;
            if entries.is_empty() {
                return Err(AppError::Validation(format!(
                    "Batch {} contains no deposits",
                    dir.display()
                )));
            }
            let invalid: Vec<String> = entries
                .iter()
                .filter(|d| !store.is_deposit_dir(d))
                .map(|d| d.display().to_string())
                .collect();
            if !invalid.is_empty() {
                return Err(AppError::Validation(format!(
                    "Batch {} contains directories that are not deposits: {}",
                    dir.display(),
                    invalid.join(", ")
                )));
            }
        }
    }
    Ok(())
}
