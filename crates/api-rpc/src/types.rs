//! RPC Request/Response Types
//!
//! Defines the JSON-RPC method parameters and results.

use ingestflow_core::application::AreaKind;
use ingestflow_core::domain::{BlockedTarget, TaskEvent};
use serde::{Deserialize, Serialize};

/// import.start.v1 - Start an import or migration batch
#[derive(Debug, Deserialize)]
pub struct ImportStartRequest {
    #[serde(default = "default_area")]
    pub area: AreaKind,
    /// Batch (or deposit) directory, absolute or relative to the area inbox
    pub path: String,
    #[serde(default)]
    pub single_deposit: bool,
    #[serde(default)]
    pub continue_previous: bool,
}

fn default_area() -> AreaKind {
    AreaKind::Import
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportStartResponse {
    pub area: AreaKind,
    pub batch: String,
    pub accepted: bool,
}

/// targets.blocked.v1 - List blocked targets (active ones, or the history of one target)
#[derive(Debug, Default, Deserialize)]
pub struct BlockedListRequest {
    #[serde(default)]
    pub target: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockedListResponse {
    pub targets: Vec<BlockedTarget>,
}

/// targets.unblock.v1 - Clear every active block of a target
#[derive(Debug, Deserialize)]
pub struct UnblockRequest {
    pub target: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnblockResponse {
    pub target: String,
    pub unblocked: u64,
}

/// events.list.v1 - Task events of one deposit, or the most recent ones
#[derive(Debug, Deserialize)]
pub struct EventsListRequest {
    #[serde(default)]
    pub deposit_id: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Clone, Serialize)]
pub struct EventsListResponse {
    pub events: Vec<TaskEvent>,
}

/// admin.stats.v1 - Get runtime statistics
#[derive(Debug, Default, Deserialize)]
pub struct StatsRequest {
    // No parameters needed
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub version: String,
    pub pool_size: usize,
    pub active_targets: usize,
    pub running_tasks: usize,
    pub pending_tasks: usize,
    pub blocked_targets: usize,
    pub areas: Vec<AreaKind>,
    pub uptime_seconds: i64,
}
