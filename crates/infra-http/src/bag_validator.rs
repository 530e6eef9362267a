// HTTP BagValidator: asks the validation service whether a bag complies with the deposit rules

use crate::client::{read_json, send, ApiClient};
use async_trait::async_trait;
use ingestflow_core::domain::DepositId;
use ingestflow_core::port::{BagValidator, PackageType, RemoteError, RuleViolation, ValidationReport};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidateRequest<'a> {
    bag_location: &'a str,
    package_type: PackageType,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidateResponse {
    is_compliant: bool,
    #[serde(default)]
    rule_violations: Vec<ViolationBody>,
}

#[derive(Debug, Deserialize)]
struct ViolationBody {
    rule: String,
    violation: String,
}

impl From<ValidateResponse> for ValidationReport {
    fn from(response: ValidateResponse) -> Self {
        Self {
            compliant: response.is_compliant,
            violations: response
                .rule_violations
                .into_iter()
                .map(|v| RuleViolation {
                    rule: v.rule,
                    message: v.violation,
                })
                .collect(),
        }
    }
}

pub struct HttpBagValidator {
    client: ApiClient,
}

impl HttpBagValidator {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RemoteError> {
        Ok(Self {
            client: ApiClient::new(base_url, None, timeout)?,
        })
    }
}

#[async_trait]
impl BagValidator for HttpBagValidator {
    async fn validate(
        &self,
        deposit_id: DepositId,
        bag_location: &Path,
        package_type: PackageType,
    ) -> Result<ValidationReport, RemoteError> {
        let location = bag_location.to_string_lossy();
        let request = ValidateRequest {
            bag_location: &location,
            package_type,
        };
        let builder = self.client.request(Method::POST, "/validate").json(&request);
        let body = read_json(send(builder).await?).await?;
        let response: ValidateResponse = serde_json::from_value(body)
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;

        debug!(
            deposit_id = %deposit_id,
            compliant = response.is_compliant,
            violations = response.rule_violations.len(),
            "Bag validated"
        );
        Ok(response.into())
    }
}
