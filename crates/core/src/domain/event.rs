// Task Event Domain Model (append-only audit trail)

use super::deposit::DepositId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Enqueue,
    StartProcessing,
    Validate,
    UpdateDataset,
    Publish,
    EndProcessing,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventType::Enqueue => write!(f, "ENQUEUE"),
            EventType::StartProcessing => write!(f, "START_PROCESSING"),
            EventType::Validate => write!(f, "VALIDATE"),
            EventType::UpdateDataset => write!(f, "UPDATE_DATASET"),
            EventType::Publish => write!(f, "PUBLISH"),
            EventType::EndProcessing => write!(f, "END_PROCESSING"),
        }
    }
}

impl std::str::FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ENQUEUE" => Ok(EventType::Enqueue),
            "START_PROCESSING" => Ok(EventType::StartProcessing),
            "VALIDATE" => Ok(EventType::Validate),
            "UPDATE_DATASET" => Ok(EventType::UpdateDataset),
            "PUBLISH" => Ok(EventType::Publish),
            "END_PROCESSING" => Ok(EventType::EndProcessing),
            other => Err(format!("unknown event type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventResult {
    Ok,
    Failed,
    Rejected,
}

impl std::fmt::Display for EventResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventResult::Ok => write!(f, "OK"),
            EventResult::Failed => write!(f, "FAILED"),
            EventResult::Rejected => write!(f, "REJECTED"),
        }
    }
}

impl std::str::FromStr for EventResult {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OK" => Ok(EventResult::Ok),
            "FAILED" => Ok(EventResult::Failed),
            "REJECTED" => Ok(EventResult::Rejected),
            other => Err(format!("unknown event result: {}", other)),
        }
    }
}

/// One lifecycle event of a deposit task.
///
/// `deposit_id` is kept as text: enqueue failures are recorded for
/// directories whose name is not a valid deposit id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEvent {
    pub deposit_id: String,
    pub event_type: EventType,
    pub result: EventResult,
    pub message: Option<String>,
    /// epoch ms
    pub created_at: i64,
}

impl TaskEvent {
    pub fn new(
        deposit_id: impl Into<String>,
        event_type: EventType,
        result: EventResult,
        message: Option<String>,
        created_at: i64,
    ) -> Self {
        Self {
            deposit_id: deposit_id.into(),
            event_type,
            result,
            message,
            created_at,
        }
    }

    pub fn for_deposit(
        deposit_id: DepositId,
        event_type: EventType,
        result: EventResult,
        message: Option<String>,
        created_at: i64,
    ) -> Self {
        Self::new(deposit_id.to_string(), event_type, result, message, created_at)
    }
}
