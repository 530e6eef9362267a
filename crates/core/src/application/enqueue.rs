// Enqueuing Service
// Lists a batch, orders its deposits by creation instant and feeds them to the scheduler

use crate::application::ingest::{run_blocking, DepositIngestTask, IngestContext, TaskOptions};
use crate::application::sequence::TargetedTaskSequenceManager;
use crate::domain::properties::{KEY_STATE_DESCRIPTION, KEY_STATE_LABEL};
use crate::domain::{
    sort_by_created, DepositLocation, DepositProperties, DepositState, EventResult, EventType,
};
use crate::error::{AppError, Result};
use crate::port::deposit_store::OUTBOX_FAILED;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// What to enqueue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchSource {
    /// Every immediate sub-directory is a deposit
    Batch(PathBuf),
    /// The directory itself is a deposit
    Single(PathBuf),
}

#[derive(Debug, Clone)]
pub struct BatchRequest {
    /// Batch name used in logs and for correlation
    pub name: String,
    pub source: BatchSource,
    /// Outbox of this batch (holds processed/rejected/failed)
    pub outbox: PathBuf,
    pub options: TaskOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnqueueSummary {
    pub batch: String,
    /// Deposits handed to the sequence manager
    pub submitted: usize,
    /// Deposits whose location could not be read
    pub failed: usize,
}

pub struct EnqueuingService {
    ctx: Arc<IngestContext>,
    manager: Arc<TargetedTaskSequenceManager>,
    permits: Arc<Semaphore>,
}

impl EnqueuingService {
    /// `max_concurrent` bounds how many batches are listed at the same time
    pub fn new(
        ctx: Arc<IngestContext>,
        manager: Arc<TargetedTaskSequenceManager>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            ctx,
            manager,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Enqueue in the background; the handle resolves once every deposit of
    /// the batch has been submitted (not processed)
    pub fn spawn(self: &Arc<Self>, request: BatchRequest) -> JoinHandle<Result<EnqueueSummary>> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let name = request.name.clone();
            let result = service.enqueue(request).await;
            if let Err(e) = &result {
                error!(batch = %name, error = %e, "Enqueuing batch failed");
            }
            result
        })
    }

    /// List, order and submit one batch.
    ///
    /// A deposit whose location cannot be read is recorded as a failed
    /// enqueue and set aside; the rest of the batch is still submitted.
    pub async fn enqueue(&self, request: BatchRequest) -> Result<EnqueueSummary> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| AppError::Internal(format!("Enqueue permits closed: {}", e)))?;

        let source = request.source.clone();
        let reads = run_blocking(&self.ctx.store, move |store| {
            let dirs = match &source {
                BatchSource::Batch(dir) => store.list_deposit_dirs(dir)?,
                BatchSource::Single(dir) => vec![dir.clone()],
            };
            Ok(dirs
                .into_iter()
                .map(|dir| {
                    let location = store.read_location(&dir);
                    (dir, location)
                })
                .collect::<Vec<_>>())
        })
        .await?;

        let mut locations: Vec<DepositLocation> = Vec::with_capacity(reads.len());
        let mut failed = 0;
        for (dir, read) in reads {
            match read {
                Ok(location) => locations.push(location),
                Err(e) => {
                    failed += 1;
                    self.set_aside(&request, dir, e).await;
                }
            }
        }

        sort_by_created(&mut locations);

        for location in &locations {
            let deposit_id = location.deposit_id().to_string();
            let task = DepositIngestTask::new(
                location.clone(),
                request.outbox.clone(),
                request.options,
                Arc::clone(&self.ctx),
            );
            self.ctx
                .events
                .record_logged(
                    &deposit_id,
                    EventType::Enqueue,
                    EventResult::Ok,
                    Some(format!("batch {}", request.name)),
                )
                .await;
            self.manager.submit(Arc::new(task));
        }

        info!(
            batch = %request.name,
            submitted = locations.len(),
            failed,
            "Batch enqueued"
        );
        Ok(EnqueueSummary {
            batch: request.name,
            submitted: locations.len(),
            failed,
        })
    }

    /// Record the failed enqueue, mark the deposit failed and move it to the failed outbox
    async fn set_aside(&self, request: &BatchRequest, dir: PathBuf, cause: AppError) {
        let deposit_id = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.display().to_string());
        warn!(
            batch = %request.name,
            deposit_id = %deposit_id,
            error = %cause,
            "Cannot enqueue deposit"
        );

        let message = format!("Cannot enqueue deposit: {}", cause);
        self.ctx
            .events
            .record_logged(
                &deposit_id,
                EventType::Enqueue,
                EventResult::Failed,
                Some(message.clone()),
            )
            .await;

        let mut properties = DepositProperties::default();
        properties.set(KEY_STATE_LABEL, DepositState::Failed.to_string());
        properties.set(KEY_STATE_DESCRIPTION, message);
        let destination = request.outbox.join(OUTBOX_FAILED);
        let moved = run_blocking(&self.ctx.store, move |store| {
            store.write_properties(&dir, &properties)?;
            store.move_to_outbox(&dir, &destination)
        })
        .await;
        if let Err(e) = moved {
            error!(deposit_id = %deposit_id, error = %e, "Failed to set aside unreadable deposit");
        }
    }
}
