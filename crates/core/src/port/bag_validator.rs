// Bag Validator Port
// External package-compliance validation service

use crate::domain::DepositId;
use crate::port::RemoteError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PackageType {
    Deposit,
    Migration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleViolation {
    pub rule: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub compliant: bool,
    pub violations: Vec<RuleViolation>,
}

impl ValidationReport {
    pub fn compliant() -> Self {
        Self {
            compliant: true,
            violations: vec![],
        }
    }

    /// One line per violation, `[rule] message`
    pub fn summary(&self) -> String {
        self.violations
            .iter()
            .map(|v| format!("[{}] {}", v.rule, v.message))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
pub trait BagValidator: Send + Sync {
    async fn validate(
        &self,
        deposit_id: DepositId,
        bag_location: &Path,
        package_type: PackageType,
    ) -> Result<ValidationReport, RemoteError>;
}

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    pub struct MockBagValidator {
        outcome: Result<ValidationReport, RemoteError>,
        call_count: Arc<Mutex<usize>>,
    }

    impl MockBagValidator {
        pub fn new_compliant() -> Self {
            Self {
                outcome: Ok(ValidationReport::compliant()),
                call_count: Arc::new(Mutex::new(0)),
            }
        }

        pub fn new_violations(violations: &[(&str, &str)]) -> Self {
            Self {
                outcome: Ok(ValidationReport {
                    compliant: false,
                    violations: violations
                        .iter()
                        .map(|(rule, message)| RuleViolation {
                            rule: rule.to_string(),
                            message: message.to_string(),
                        })
                        .collect(),
                }),
                call_count: Arc::new(Mutex::new(0)),
            }
        }

        pub fn new_unavailable(message: impl Into<String>) -> Self {
            Self {
                outcome: Err(RemoteError::Transport(message.into())),
                call_count: Arc::new(Mutex::new(0)),
            }
        }

        pub fn call_count(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl BagValidator for MockBagValidator {
        async fn validate(
            &self,
            _deposit_id: DepositId,
            _bag_location: &Path,
            _package_type: PackageType,
        ) -> Result<ValidationReport, RemoteError> {
            *self.call_count.lock().unwrap() += 1;
            self.outcome.clone()
        }
    }
}
