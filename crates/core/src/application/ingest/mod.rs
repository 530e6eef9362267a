//! Deposit Ingest Task
//!
//! Per-deposit state machine:
//! load → validate → blocked check → authorize → mutate dataset → await
//! unlock → (publish → await unlock) → finalize.
//!
//! Every outcome is terminal. It is written into the deposit's own
//! properties, appended to the task event log, and the deposit directory is
//! relocated to the batch outbox.

pub mod error;
pub mod unlock;

pub use error::IngestError;
pub use unlock::UnlockPoller;

use crate::application::blocked::BlockedTargetService;
use crate::application::constants::{DEFAULT_UNLOCK_MAX_RETRIES, DEFAULT_UNLOCK_POLL_INTERVAL};
use crate::application::events::TaskEventService;
use crate::application::sequence::TargetedTask;
use crate::domain::properties::{KEY_STATE_DESCRIPTION, KEY_STATE_LABEL};
use crate::domain::{
    Deposit, DepositKind, DepositLocation, DepositProperties, DepositState, EventResult,
    EventType,
};
use crate::error::{AppError, Result};
use crate::port::deposit_store::outbox_subdir;
use crate::port::{
    BagValidator, DatasetMutation, DatasetPayload, DatasetRef, DepositStore, MappingContext,
    MappingError, MetadataMapper, PackageType, RemoteRepository, RoleScope,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Role checks performed before a dataset is created or updated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationSettings {
    pub enabled: bool,
    /// Role required on the collection to create a dataset
    pub create_role: String,
    /// Role required on the dataset to update it
    pub update_role: String,
}

impl Default for AuthorizationSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            create_role: "dsContributor".to_string(),
            update_role: "contributorPlus".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestSettings {
    /// Collection receiving new datasets
    pub collection: String,
    pub authorization: AuthorizationSettings,
    pub allowed_licenses: Vec<String>,
    pub unlock_poll_interval: Duration,
    pub unlock_max_retries: u32,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            collection: "root".to_string(),
            authorization: AuthorizationSettings::default(),
            allowed_licenses: vec![],
            unlock_poll_interval: DEFAULT_UNLOCK_POLL_INTERVAL,
            unlock_max_retries: DEFAULT_UNLOCK_MAX_RETRIES,
        }
    }
}

/// Per-area task options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskOptions {
    /// Keep pre-assigned identifiers and validate as a migration package
    pub is_migration: bool,
    /// Publish after a successful mutation (PUBLISHED), else leave a draft (ACCEPTED)
    pub publish: bool,
}

/// Collaborators shared by every deposit task
pub struct IngestContext {
    pub store: Arc<dyn DepositStore>,
    pub remote: Arc<dyn RemoteRepository>,
    pub validator: Arc<dyn BagValidator>,
    pub mapper: Arc<dyn MetadataMapper>,
    pub blocked: Arc<BlockedTargetService>,
    pub events: Arc<TaskEventService>,
    pub settings: IngestSettings,
}

impl IngestContext {
    fn poller(&self) -> UnlockPoller {
        UnlockPoller::new(
            self.settings.unlock_poll_interval,
            self.settings.unlock_max_retries,
        )
    }
}

/// Run a synchronous deposit-store call on the blocking pool
pub async fn run_blocking<T, F>(store: &Arc<dyn DepositStore>, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn DepositStore) -> Result<T> + Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || f(store.as_ref()))
        .await
        .map_err(|e| AppError::Internal(format!("Deposit store task failed: {}", e)))?
}

/// Event result recorded for a terminal deposit state
pub fn result_for(state: DepositState) -> EventResult {
    match state {
        DepositState::Rejected => EventResult::Rejected,
        DepositState::Failed => EventResult::Failed,
        _ => EventResult::Ok,
    }
}

pub struct DepositIngestTask {
    location: DepositLocation,
    /// Outbox of the batch this deposit belongs to
    outbox: PathBuf,
    options: TaskOptions,
    ctx: Arc<IngestContext>,
}

impl DepositIngestTask {
    pub fn new(
        location: DepositLocation,
        outbox: impl Into<PathBuf>,
        options: TaskOptions,
        ctx: Arc<IngestContext>,
    ) -> Self {
        Self {
            location,
            outbox: outbox.into(),
            options,
            ctx,
        }
    }

    pub fn location(&self) -> &DepositLocation {
        &self.location
    }

    /// Drive the deposit to a terminal state and return it
    pub async fn execute(&self) -> DepositState {
        let deposit_id = self.location.deposit_id().to_string();
        info!(
            deposit_id = %deposit_id,
            target = %self.location.target(),
            update = self.location.kind().is_update(),
            "Processing deposit"
        );
        self.ctx
            .events
            .record_logged(&deposit_id, EventType::StartProcessing, EventResult::Ok, None)
            .await;

        let mut deposit = match self.load().await {
            Ok(deposit) => deposit,
            Err(e) => return self.fail_unloaded(e).await,
        };

        if deposit.state.is_terminal() {
            return self.resume_finalize(deposit).await;
        }

        let outcome = self.process(&mut deposit).await;
        self.complete(deposit, outcome).await
    }

    async fn load(&self) -> std::result::Result<Deposit, IngestError> {
        let location = self.location.clone();
        run_blocking(&self.ctx.store, move |store| store.read_deposit(&location))
            .await
            .map_err(|e| IngestError::InvalidDeposit(e.to_string()))
    }

    async fn process(
        &self,
        deposit: &mut Deposit,
    ) -> std::result::Result<(DepositState, String), IngestError> {
        deposit
            .start()
            .map_err(|e| IngestError::InvalidDeposit(e.to_string()))?;
        self.persist_progress(deposit).await?;

        let payload = self.validate(deposit).await?;
        self.check_blocked().await?;

        let existing = match &deposit.kind {
            DepositKind::UpdateOf { target } => Some(self.resolve_predecessor(target).await?),
            DepositKind::NewDeposit => {
                self.check_collision(deposit).await?;
                None
            }
        };
        self.authorize(deposit, existing.as_ref()).await?;

        let poller = self.ctx.poller();
        let remote = self.ctx.remote.as_ref();
        let dataset = self.mutate(deposit, existing, &payload).await?;
        deposit.resolve_pid(&dataset.persistent_id);
        poller.await_unlock(remote, &dataset, true).await?;

        if !self.options.publish {
            return Ok((
                DepositState::Accepted,
                format!(
                    "The deposit was successfully ingested as draft of {}",
                    dataset.persistent_id
                ),
            ));
        }

        remote
            .publish(&dataset)
            .await
            .map_err(|e| IngestError::remote(e, true))?;
        poller.await_unlock(remote, &dataset, true).await?;
        self.record(
            deposit,
            EventType::Publish,
            EventResult::Ok,
            Some(dataset.persistent_id.clone()),
        )
        .await;

        Ok((
            DepositState::Published,
            format!(
                "The deposit was successfully ingested and published as {}",
                dataset.persistent_id
            ),
        ))
    }

    async fn persist_progress(&self, deposit: &Deposit) -> std::result::Result<(), IngestError> {
        let dir = deposit.dir.clone();
        let properties = deposit.to_properties();
        run_blocking(&self.ctx.store, move |store| {
            store.write_properties(&dir, &properties)
        })
        .await
        .map_err(|e| IngestError::Storage(e.to_string()))
    }

    /// Compliance checks: external validator, then local rules in the mapper
    async fn validate(&self, deposit: &Deposit) -> std::result::Result<DatasetPayload, IngestError> {
        let package_type = if self.options.is_migration {
            PackageType::Migration
        } else {
            PackageType::Deposit
        };
        let report = self
            .ctx
            .validator
            .validate(deposit.id, &deposit.bag_dir, package_type)
            .await
            .map_err(|e| IngestError::remote(format!("validation service: {}", e), false))?;

        if !report.compliant {
            let message = format!("Bag was not valid:\n{}", report.summary());
            self.record(
                deposit,
                EventType::Validate,
                EventResult::Rejected,
                Some(message.clone()),
            )
            .await;
            return Err(IngestError::rejected(message));
        }

        let mapping = MappingContext {
            is_migration: self.options.is_migration,
            allowed_licenses: self.ctx.settings.allowed_licenses.clone(),
        };
        let payload = match self.ctx.mapper.to_dataset_payload(deposit, &mapping) {
            Ok(payload) => payload,
            Err(MappingError::Unreadable(message)) => {
                return Err(IngestError::InvalidDeposit(message))
            }
            Err(e) => {
                self.record(
                    deposit,
                    EventType::Validate,
                    EventResult::Rejected,
                    Some(e.to_string()),
                )
                .await;
                return Err(IngestError::rejected(e.to_string()));
            }
        };

        self.record(deposit, EventType::Validate, EventResult::Ok, None)
            .await;
        Ok(payload)
    }

    async fn check_blocked(&self) -> std::result::Result<(), IngestError> {
        let target = self.location.target();
        match self.ctx.blocked.is_blocked(target).await {
            Ok(true) => Err(IngestError::TargetBlocked(target.to_string())),
            Ok(false) => Ok(()),
            Err(e) => Err(IngestError::Storage(e.to_string())),
        }
    }

    async fn resolve_predecessor(
        &self,
        target: &str,
    ) -> std::result::Result<DatasetRef, IngestError> {
        self.ctx
            .remote
            .find_dataset(target)
            .await
            .map_err(|e| IngestError::remote(e, false))?
            .ok_or_else(|| IngestError::Rejected {
                message: format!("Update of non-existing dataset: nothing found for {}", target),
                unresolved_predecessor: true,
            })
    }

    /// A new deposit must not submit an identifier that is already taken
    async fn check_collision(&self, deposit: &Deposit) -> std::result::Result<(), IngestError> {
        let Some(doi) = deposit.doi.as_deref().filter(|d| !d.trim().is_empty()) else {
            return Ok(());
        };
        let existing = self
            .ctx
            .remote
            .find_dataset(doi)
            .await
            .map_err(|e| IngestError::remote(e, false))?;
        match existing {
            Some(_) => Err(IngestError::IdentifierCollision(doi.to_string())),
            None => Ok(()),
        }
    }

    async fn authorize(
        &self,
        deposit: &Deposit,
        existing: Option<&DatasetRef>,
    ) -> std::result::Result<(), IngestError> {
        let auth = &self.ctx.settings.authorization;
        if !auth.enabled {
            return Ok(());
        }

        let user = deposit
            .depositor
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| IngestError::Unauthorized("Deposit names no depositor".to_string()))?;

        let (scope, role, action) = match existing {
            Some(dataset) => (
                RoleScope::Dataset(dataset.clone()),
                &auth.update_role,
                "update dataset",
            ),
            None => (
                RoleScope::Collection(self.ctx.settings.collection.clone()),
                &auth.create_role,
                "create a dataset in collection",
            ),
        };

        let roles = self
            .ctx
            .remote
            .get_role_assignments(user, &scope)
            .await
            .map_err(|e| IngestError::remote(e, false))?;
        if roles.iter().any(|r| r == role) {
            return Ok(());
        }

        let object = match &scope {
            RoleScope::Dataset(dataset) => dataset.persistent_id.clone(),
            RoleScope::Collection(alias) => alias.clone(),
        };
        Err(IngestError::Unauthorized(format!(
            "User '{}' lacks role '{}' required to {} {}",
            user, role, action, object
        )))
    }

    async fn mutate(
        &self,
        deposit: &Deposit,
        existing: Option<DatasetRef>,
        payload: &DatasetPayload,
    ) -> std::result::Result<DatasetRef, IngestError> {
        let remote = self.ctx.remote.as_ref();
        let mutation = match existing {
            Some(dataset) => {
                // A previous attempt may still hold the lock
                self.ctx
                    .poller()
                    .await_unlock(remote, &dataset, false)
                    .await?;
                DatasetMutation::Update { dataset }
            }
            None => DatasetMutation::Create {
                collection: self.ctx.settings.collection.clone(),
                persistent_id: if self.options.is_migration {
                    deposit.doi.clone()
                } else {
                    None
                },
            },
        };

        let dataset = remote
            .create_or_update_dataset(&mutation, payload)
            .await
            .map_err(|e| IngestError::remote(e, true))?;
        self.record(
            deposit,
            EventType::UpdateDataset,
            EventResult::Ok,
            Some(dataset.persistent_id.clone()),
        )
        .await;
        Ok(dataset)
    }

    async fn complete(
        &self,
        mut deposit: Deposit,
        outcome: std::result::Result<(DepositState, String), IngestError>,
    ) -> DepositState {
        let (state, description) = match outcome {
            Ok(done) => done,
            Err(e) => {
                warn!(
                    deposit_id = %deposit.id,
                    target = %self.location.target(),
                    error = %e,
                    "Deposit did not complete"
                );
                if e.blocks_target(&deposit.kind) {
                    self.block(&deposit, e.state(), &e.to_string()).await;
                }
                (e.state(), e.to_string())
            }
        };
        deposit.finish(state, description.clone());

        let dir = deposit.dir.clone();
        let properties = deposit.to_properties();
        self.finalize(&deposit.id.to_string(), &dir, properties, state, description)
            .await;
        state
    }

    async fn block(&self, deposit: &Deposit, state: DepositState, message: &str) {
        let target = self.location.target();
        let deposit_id = deposit.id.to_string();
        // A target is never blocked twice by the same unresolved problem
        match self.ctx.blocked.is_blocked(target).await {
            Ok(true) => {}
            Ok(false) => {
                if let Err(e) = self
                    .ctx
                    .blocked
                    .block(&deposit_id, target, state, Some(message.to_string()))
                    .await
                {
                    error!(deposit_id = %deposit_id, target, error = %e, "Failed to block target");
                }
            }
            Err(e) => {
                error!(deposit_id = %deposit_id, target, error = %e, "Failed to read blocked state");
            }
        }
    }

    /// The deposit could not be loaded: mark it failed and set it aside
    async fn fail_unloaded(&self, e: IngestError) -> DepositState {
        error!(
            deposit_id = %self.location.deposit_id(),
            error = %e,
            "Could not load deposit"
        );
        self.set_aside(e.to_string()).await
    }

    /// Mark the deposit failed from its location alone and relocate it
    async fn set_aside(&self, reason: String) -> DepositState {
        let deposit_id = self.location.deposit_id().to_string();
        let mut properties = DepositProperties::default();
        properties.set(KEY_STATE_LABEL, DepositState::Failed.to_string());
        properties.set(KEY_STATE_DESCRIPTION, reason.clone());
        self.finalize(
            &deposit_id,
            self.location.dir(),
            properties,
            DepositState::Failed,
            reason,
        )
        .await;
        DepositState::Failed
    }

    /// A previous run wrote a terminal state but stopped before the move
    async fn resume_finalize(&self, deposit: Deposit) -> DepositState {
        info!(
            deposit_id = %deposit.id,
            state = %deposit.state,
            "Deposit already in terminal state, completing relocation"
        );
        let description = format!("Resumed: {}", deposit.state_description);
        self.finalize(
            &deposit.id.to_string(),
            &deposit.dir,
            deposit.to_properties(),
            deposit.state,
            description,
        )
        .await;
        deposit.state
    }

    /// Write final properties, then relocate the directory.
    ///
    /// The rename is the commit point. A deposit already relocated is left
    /// as it is: neither its properties nor its location change.
    async fn finalize(
        &self,
        deposit_id: &str,
        dir: &Path,
        properties: DepositProperties,
        state: DepositState,
        description: String,
    ) {
        let destination = self.outbox.join(outbox_subdir(state));
        let source = dir.to_path_buf();
        let result = run_blocking(&self.ctx.store, move |store| {
            if !store.is_relocated(&source, &destination) {
                store.write_properties(&source, &properties)?;
            }
            store.move_to_outbox(&source, &destination)
        })
        .await;

        match result {
            Ok(moved_to) => {
                info!(
                    deposit_id,
                    state = %state,
                    outbox = %moved_to.display(),
                    "Deposit finished"
                );
                self.ctx
                    .events
                    .record_logged(
                        deposit_id,
                        EventType::EndProcessing,
                        result_for(state),
                        Some(description),
                    )
                    .await;
            }
            Err(e) => {
                error!(deposit_id, state = %state, error = %e, "Failed to finalize deposit");
                self.ctx
                    .events
                    .record_logged(
                        deposit_id,
                        EventType::EndProcessing,
                        EventResult::Failed,
                        Some(format!("Finalization failed after {}: {}", state, e)),
                    )
                    .await;
            }
        }
    }

    async fn record(
        &self,
        deposit: &Deposit,
        event_type: EventType,
        result: EventResult,
        message: Option<String>,
    ) {
        self.ctx
            .events
            .record_logged(&deposit.id.to_string(), event_type, result, message)
            .await;
    }
}

#[async_trait]
impl TargetedTask for DepositIngestTask {
    fn target(&self) -> &str {
        self.location.target()
    }

    fn name(&self) -> String {
        format!("deposit {}", self.location.deposit_id())
    }

    async fn run(&self) {
        self.execute().await;
    }

    async fn abandoned(&self, reason: String) {
        self.set_aside(reason).await;
    }
}
