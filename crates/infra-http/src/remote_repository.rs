// HTTP RemoteRepository against a Dataverse-style native API

use crate::client::{ensure_success, read_json, send, unwrap_envelope, ApiClient};
use async_trait::async_trait;
use ingestflow_core::domain::PersistentId;
use ingestflow_core::port::{
    DatasetMutation, DatasetPayload, DatasetRef, LockState, RemoteError, RemoteRepository,
    RoleScope,
};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

const PERSISTENT_ID_PROTOCOLS: &[&str] = &["doi", "hdl"];

#[derive(Debug, Clone)]
pub struct RemoteSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    /// Search field holding the update token of a dataset
    pub sword_token_field: String,
}

pub struct HttpRemoteRepository {
    client: ApiClient,
    sword_token_field: String,
}

impl HttpRemoteRepository {
    pub fn new(settings: RemoteSettings) -> Result<Self, RemoteError> {
        Ok(Self {
            client: ApiClient::new(&settings.base_url, settings.api_key, settings.timeout)?,
            sword_token_field: settings.sword_token_field,
        })
    }

    async fn data(&self, builder: reqwest::RequestBuilder) -> Result<Value, RemoteError> {
        let response = send(builder).await?;
        unwrap_envelope(read_json(response).await?)
    }

    async fn find_by_persistent_id(&self, pid: &str) -> Result<Option<DatasetRef>, RemoteError> {
        let builder = self
            .client
            .request(Method::GET, "/api/datasets/:persistentId/")
            .query(&[("persistentId", pid)]);
        let response = send(builder).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let data = unwrap_envelope(read_json(response).await?)?;
        Ok(Some(DatasetRef {
            persistent_id: pid.to_string(),
            id: data.get("id").and_then(Value::as_i64),
        }))
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<DatasetRef>, RemoteError> {
        let query = search_query(&self.sword_token_field, token);
        let builder = self
            .client
            .request(Method::GET, "/api/search")
            .query(&[("q", query.as_str()), ("type", "dataset")]);
        let data = self.data(builder).await?;
        Ok(first_search_hit(&data))
    }
}

#[async_trait]
impl RemoteRepository for HttpRemoteRepository {
    async fn find_dataset(&self, target: &str) -> Result<Option<DatasetRef>, RemoteError> {
        if is_persistent_id(target) {
            self.find_by_persistent_id(target).await
        } else {
            self.find_by_token(target).await
        }
    }

    async fn create_or_update_dataset(
        &self,
        mutation: &DatasetMutation,
        payload: &DatasetPayload,
    ) -> Result<DatasetRef, RemoteError> {
        match mutation {
            DatasetMutation::Create {
                collection,
                persistent_id,
            } => {
                let builder = match persistent_id {
                    Some(pid) => self
                        .client
                        .request(
                            Method::POST,
                            &format!("/api/dataverses/{}/datasets/:import", collection),
                        )
                        .query(&[("pid", pid.as_str()), ("release", "no")]),
                    None => self
                        .client
                        .request(Method::POST, &format!("/api/dataverses/{}/datasets", collection)),
                };
                let data = self.data(builder.json(payload.as_value())).await?;
                let dataset = created_dataset_ref(&data)?;
                info!(
                    collection = %collection,
                    persistent_id = %dataset.persistent_id,
                    "Dataset created"
                );
                Ok(dataset)
            }
            DatasetMutation::Update { dataset } => {
                let version = payload
                    .as_value()
                    .get("datasetVersion")
                    .cloned()
                    .unwrap_or_else(|| payload.as_value().clone());
                let builder = self
                    .client
                    .request(Method::PUT, "/api/datasets/:persistentId/versions/:draft")
                    .query(&[("persistentId", dataset.persistent_id.as_str())])
                    .json(&version);
                let data = self.data(builder).await?;
                info!(persistent_id = %dataset.persistent_id, "Dataset draft updated");
                Ok(DatasetRef {
                    persistent_id: dataset.persistent_id.clone(),
                    id: dataset
                        .id
                        .or_else(|| data.get("datasetId").and_then(Value::as_i64)),
                })
            }
        }
    }

    async fn publish(&self, dataset: &DatasetRef) -> Result<(), RemoteError> {
        let builder = self
            .client
            .request(Method::POST, "/api/datasets/:persistentId/actions/:publish")
            .query(&[
                ("persistentId", dataset.persistent_id.as_str()),
                ("type", "major"),
            ]);
        ensure_success(send(builder).await?).await?;
        info!(persistent_id = %dataset.persistent_id, "Dataset publication requested");
        Ok(())
    }

    async fn get_lock_state(&self, dataset: &DatasetRef) -> Result<LockState, RemoteError> {
        let builder = self
            .client
            .request(Method::GET, "/api/datasets/:persistentId/locks")
            .query(&[("persistentId", dataset.persistent_id.as_str())]);
        let data = self.data(builder).await?;
        let state = lock_state(&data);
        debug!(persistent_id = %dataset.persistent_id, ?state, "Lock state polled");
        Ok(state)
    }

    async fn get_role_assignments(
        &self,
        user: &str,
        scope: &RoleScope,
    ) -> Result<Vec<String>, RemoteError> {
        let builder = match scope {
            RoleScope::Collection(alias) => self
                .client
                .request(Method::GET, &format!("/api/dataverses/{}/assignments", alias)),
            RoleScope::Dataset(dataset) => self
                .client
                .request(Method::GET, "/api/datasets/:persistentId/assignments")
                .query(&[("persistentId", dataset.persistent_id.as_str())]),
        };
        let data = self.data(builder).await?;
        Ok(role_aliases_for(&data, user))
    }
}

/// `doi:...` and `hdl:...` targets are looked up directly; anything else is an update token
fn is_persistent_id(target: &str) -> bool {
    PersistentId::parse(target)
        .map(|pid| PERSISTENT_ID_PROTOCOLS.contains(&pid.protocol.as_str()))
        .unwrap_or(false)
}

fn search_query(field: &str, token: &str) -> String {
    format!("{}:\"{}\"", field, token.replace('"', "\\\""))
}

fn first_search_hit(data: &Value) -> Option<DatasetRef> {
    data.get("items")
        .and_then(Value::as_array)?
        .iter()
        .find_map(|item| item.get("global_id").and_then(Value::as_str))
        .map(DatasetRef::new)
}

fn created_dataset_ref(data: &Value) -> Result<DatasetRef, RemoteError> {
    let persistent_id = data
        .get("persistentId")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            RemoteError::InvalidResponse("Created dataset has no persistentId".to_string())
        })?;
    Ok(DatasetRef {
        persistent_id: persistent_id.to_string(),
        id: data.get("id").and_then(Value::as_i64),
    })
}

fn lock_state(data: &Value) -> LockState {
    match data.as_array() {
        Some(locks) if !locks.is_empty() => LockState::Locked,
        _ => LockState::Unlocked,
    }
}

/// Role aliases assigned to `@user`
fn role_aliases_for(data: &Value, user: &str) -> Vec<String> {
    let assignee = format!("@{}", user);
    data.as_array()
        .map(|assignments| {
            assignments
                .iter()
                .filter(|a| a.get("assignee").and_then(Value::as_str) == Some(assignee.as_str()))
                .filter_map(|a| a.get("_roleAlias").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
