//! RPC Method Handlers
//!
//! Implements the business logic for each JSON-RPC method.

use crate::error::to_rpc_error;
use crate::types::{
    BlockedListRequest, BlockedListResponse, EventsListRequest, EventsListResponse,
    ImportStartRequest, ImportStartResponse, StatsRequest, StatsResponse, UnblockRequest,
    UnblockResponse,
};
use ingestflow_core::application::{
    Area, AreaKind, BlockedTargetService, ImportRequest, TargetedTaskSequenceManager,
    TaskEventService,
};
use ingestflow_core::error::AppError;
use jsonrpsee::types::ErrorObjectOwned;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    areas: HashMap<AreaKind, Arc<Area>>,
    blocked: Arc<BlockedTargetService>,
    events: Arc<TaskEventService>,
    manager: Arc<TargetedTaskSequenceManager>,
    start_time: std::time::Instant,
}

impl RpcHandler {
    pub fn new(
        areas: Vec<Arc<Area>>,
        blocked: Arc<BlockedTargetService>,
        events: Arc<TaskEventService>,
        manager: Arc<TargetedTaskSequenceManager>,
    ) -> Self {
        Self {
            areas: areas.into_iter().map(|a| (a.kind(), a)).collect(),
            blocked,
            events,
            manager,
            start_time: std::time::Instant::now(),
        }
    }

    /// import.start.v1
    pub async fn start_import(
        &self,
        params: ImportStartRequest,
    ) -> Result<ImportStartResponse, ErrorObjectOwned> {
        if params.area == AreaKind::AutoIngest {
            return Err(to_rpc_error(AppError::Validation(
                "The auto_ingest area is scanned continuously; imports are not started by hand"
                    .to_string(),
            )));
        }
        let area = self.areas.get(&params.area).ok_or_else(|| {
            to_rpc_error(AppError::NotFound(format!(
                "Area {} is not configured",
                params.area
            )))
        })?;

        let batch = area
            .start_import(ImportRequest {
                path: PathBuf::from(&params.path),
                single_deposit: params.single_deposit,
                continue_previous: params.continue_previous,
            })
            .await
            .map_err(to_rpc_error)?;

        Ok(ImportStartResponse {
            area: params.area,
            batch,
            accepted: true,
        })
    }

    /// targets.blocked.v1
    pub async fn blocked_targets(
        &self,
        params: BlockedListRequest,
    ) -> Result<BlockedListResponse, ErrorObjectOwned> {
        let targets = self
            .blocked
            .list(params.target.as_deref())
            .await
            .map_err(to_rpc_error)?;
        Ok(BlockedListResponse { targets })
    }

    /// targets.unblock.v1
    pub async fn unblock(&self, params: UnblockRequest) -> Result<UnblockResponse, ErrorObjectOwned> {
        let unblocked = self
            .blocked
            .unblock(&params.target)
            .await
            .map_err(to_rpc_error)?;
        info!(target = %params.target, unblocked, "Target unblocked by operator");
        Ok(UnblockResponse {
            target: params.target,
            unblocked,
        })
    }

    /// events.list.v1
    pub async fn list_events(
        &self,
        params: EventsListRequest,
    ) -> Result<EventsListResponse, ErrorObjectOwned> {
        let events = match params.deposit_id.as_deref() {
            Some(deposit_id) => self.events.for_deposit(deposit_id).await,
            None => self.events.recent(params.limit).await,
        }
        .map_err(to_rpc_error)?;
        Ok(EventsListResponse { events })
    }

    /// admin.stats.v1
    pub async fn stats(&self, _params: StatsRequest) -> Result<StatsResponse, ErrorObjectOwned> {
        let sequences = self.manager.stats();
        let blocked_targets = self.blocked.list(None).await.map_err(to_rpc_error)?.len();

        let mut areas: Vec<AreaKind> = self.areas.keys().copied().collect();
        areas.sort_by_key(|kind| kind.to_string());

        Ok(StatsResponse {
            version: ingestflow_core::VERSION.to_string(),
            pool_size: sequences.pool_size,
            active_targets: sequences.active_targets,
            running_tasks: sequences.running_tasks,
            pending_tasks: sequences.pending_tasks,
            blocked_targets,
            areas,
            uptime_seconds: self.start_time.elapsed().as_secs() as i64,
        })
    }
}
