// Remote Repository Port
// Abstraction over the research-data repository holding the datasets

use crate::port::metadata_mapper::DatasetPayload;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors talking to a remote collaborator (repository or validator)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Reference to a dataset in the remote repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRef {
    pub persistent_id: String,
    pub id: Option<i64>,
}

impl DatasetRef {
    pub fn new(persistent_id: impl Into<String>) -> Self {
        Self {
            persistent_id: persistent_id.into(),
            id: None,
        }
    }
}

/// Backend busy state of a dataset after a mutating call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Locked,
    Unlocked,
}

/// What a mutating call should do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetMutation {
    /// Create a dataset in `collection`, optionally with a pre-assigned persistent id
    Create {
        collection: String,
        persistent_id: Option<String>,
    },
    /// Replace the draft metadata and files of an existing dataset
    Update { dataset: DatasetRef },
}

/// Object on which role assignments are looked up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleScope {
    Collection(String),
    Dataset(DatasetRef),
}

/// Remote repository client.
///
/// Every call may fail with a transient I/O error; callers treat that as
/// fatal for the current attempt.
#[async_trait]
pub trait RemoteRepository: Send + Sync {
    /// Find the dataset addressed by a target (update token or persistent id)
    async fn find_dataset(&self, target: &str) -> Result<Option<DatasetRef>, RemoteError>;

    /// Create or update a dataset's metadata and files
    async fn create_or_update_dataset(
        &self,
        mutation: &DatasetMutation,
        payload: &DatasetPayload,
    ) -> Result<DatasetRef, RemoteError>;

    /// Publish the current draft of a dataset
    async fn publish(&self, dataset: &DatasetRef) -> Result<(), RemoteError>;

    /// Current lock state of a dataset
    async fn get_lock_state(&self, dataset: &DatasetRef) -> Result<LockState, RemoteError>;

    /// Role aliases assigned to `user` on `scope`
    async fn get_role_assignments(
        &self,
        user: &str,
        scope: &RoleScope,
    ) -> Result<Vec<String>, RemoteError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};

    /// Scripted in-memory repository that counts every call
    #[derive(Clone, Default)]
    pub struct MockRemoteRepository {
        state: Arc<Mutex<MockState>>,
    }

    #[derive(Default)]
    struct MockState {
        datasets: HashMap<String, DatasetRef>,
        roles: Vec<String>,
        lock_script: VecDeque<LockState>,
        always_locked: bool,
        fail_mutation: Option<RemoteError>,
        fail_lock_state: Option<RemoteError>,
        calls: Vec<String>,
        mutations: Vec<DatasetMutation>,
        published: Vec<String>,
        next_id: i64,
    }

    impl MockRemoteRepository {
        pub fn new() -> Self {
            Self::default()
        }

        /// Register an existing dataset reachable through `target`
        pub fn with_dataset(self, target: impl Into<String>, pid: impl Into<String>) -> Self {
            self.state
                .lock()
                .unwrap()
                .datasets
                .insert(target.into(), DatasetRef::new(pid));
            self
        }

        pub fn with_roles(self, roles: &[&str]) -> Self {
            self.state.lock().unwrap().roles = roles.iter().map(|r| r.to_string()).collect();
            self
        }

        /// Lock states returned by successive polls; afterwards always unlocked
        pub fn with_lock_script(self, script: &[LockState]) -> Self {
            self.state.lock().unwrap().lock_script = script.iter().copied().collect();
            self
        }

        pub fn always_locked(self) -> Self {
            self.state.lock().unwrap().always_locked = true;
            self
        }

        pub fn failing_mutation(self, error: RemoteError) -> Self {
            self.state.lock().unwrap().fail_mutation = Some(error);
            self
        }

        pub fn failing_lock_state(self, error: RemoteError) -> Self {
            self.state.lock().unwrap().fail_lock_state = Some(error);
            self
        }

        /// Total number of calls of any kind
        pub fn call_count(&self) -> usize {
            self.state.lock().unwrap().calls.len()
        }

        pub fn calls(&self) -> Vec<String> {
            self.state.lock().unwrap().calls.clone()
        }

        pub fn mutations(&self) -> Vec<DatasetMutation> {
            self.state.lock().unwrap().mutations.clone()
        }

        pub fn published(&self) -> Vec<String> {
            self.state.lock().unwrap().published.clone()
        }

        fn record(&self, call: &str) {
            self.state.lock().unwrap().calls.push(call.to_string());
        }
    }

    #[async_trait]
    impl RemoteRepository for MockRemoteRepository {
        async fn find_dataset(&self, target: &str) -> Result<Option<DatasetRef>, RemoteError> {
            self.record("find_dataset");
            Ok(self.state.lock().unwrap().datasets.get(target).cloned())
        }

        async fn create_or_update_dataset(
            &self,
            mutation: &DatasetMutation,
            _payload: &DatasetPayload,
        ) -> Result<DatasetRef, RemoteError> {
            self.record("create_or_update_dataset");
            let mut state = self.state.lock().unwrap();
            if let Some(err) = state.fail_mutation.clone() {
                return Err(err);
            }
            state.mutations.push(mutation.clone());
            match mutation {
                DatasetMutation::Update { dataset } => Ok(dataset.clone()),
                DatasetMutation::Create { persistent_id, .. } => {
                    state.next_id += 1;
                    let pid = persistent_id
                        .clone()
                        .unwrap_or_else(|| format!("doi:10.5072/FK2/MOCK{}", state.next_id));
                    let dataset = DatasetRef {
                        persistent_id: pid.clone(),
                        id: Some(state.next_id),
                    };
                    state.datasets.insert(pid, dataset.clone());
                    Ok(dataset)
                }
            }
        }

        async fn publish(&self, dataset: &DatasetRef) -> Result<(), RemoteError> {
            self.record("publish");
            self.state
                .lock()
                .unwrap()
                .published
                .push(dataset.persistent_id.clone());
            Ok(())
        }

        async fn get_lock_state(&self, _dataset: &DatasetRef) -> Result<LockState, RemoteError> {
            self.record("get_lock_state");
            let mut state = self.state.lock().unwrap();
            if let Some(err) = state.fail_lock_state.clone() {
                return Err(err);
            }
            if state.always_locked {
                return Ok(LockState::Locked);
            }
            Ok(state.lock_script.pop_front().unwrap_or(LockState::Unlocked))
        }

        async fn get_role_assignments(
            &self,
            _user: &str,
            _scope: &RoleScope,
        ) -> Result<Vec<String>, RemoteError> {
            self.record("get_role_assignments");
            Ok(self.state.lock().unwrap().roles.clone())
        }
    }
}
