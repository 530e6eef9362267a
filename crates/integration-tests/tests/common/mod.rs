//! Shared harness: a real filesystem area, an in-memory SQLite audit store
//! and scripted remote collaborators.

#![allow(dead_code)]

use ingestflow_core::application::{
    Area, AreaConfig, AreaKind, BlockedTargetService, EnqueuingService, ImportRequest,
    IngestContext, IngestSettings, TargetedTaskSequenceManager, TaskEventService,
};
use ingestflow_core::domain::{EventType, TaskEvent};
use ingestflow_core::error::Result;
use ingestflow_core::port::bag_validator::mocks::MockBagValidator;
use ingestflow_core::port::remote_repository::mocks::MockRemoteRepository;
use ingestflow_core::port::time_provider::mocks::SteppingTimeProvider;
use ingestflow_core::port::DepositStore;
use ingestflow_infra_fs::{BagMetadataMapper, FsDepositStore};
use ingestflow_infra_sqlite::{
    create_pool, run_migrations, SqliteBlockedTargetRepository, SqliteTaskEventRepository,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Harness {
    _tmp: TempDir,
    pub inbox: PathBuf,
    pub outbox: PathBuf,
    pub remote: MockRemoteRepository,
    pub validator: MockBagValidator,
    pub events: Arc<TaskEventService>,
    pub blocked: Arc<BlockedTargetService>,
    pub manager: Arc<TargetedTaskSequenceManager>,
    pub area: Arc<Area>,
}

pub struct HarnessBuilder {
    kind: AreaKind,
    publish: bool,
    remote: MockRemoteRepository,
    validator: MockBagValidator,
    settings: IngestSettings,
    pool_size: usize,
}

impl HarnessBuilder {
    pub fn new(kind: AreaKind) -> Self {
        Self {
            kind,
            publish: true,
            remote: MockRemoteRepository::new(),
            validator: MockBagValidator::new_compliant(),
            settings: IngestSettings {
                unlock_poll_interval: Duration::from_millis(1),
                unlock_max_retries: 3,
                ..IngestSettings::default()
            },
            pool_size: 4,
        }
    }

    pub fn publish(mut self, publish: bool) -> Self {
        self.publish = publish;
        self
    }

    pub fn remote(mut self, remote: MockRemoteRepository) -> Self {
        self.remote = remote;
        self
    }

    pub fn validator(mut self, validator: MockBagValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn settings(mut self, f: impl FnOnce(&mut IngestSettings)) -> Self {
        f(&mut self.settings);
        self
    }

    pub async fn build(self) -> Harness {
        let tmp = TempDir::new().unwrap();
        let inbox = tmp.path().join("inbox");
        let outbox = tmp.path().join("outbox");
        fs::create_dir_all(&inbox).unwrap();
        fs::create_dir_all(&outbox).unwrap();

        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();

        let clock = Arc::new(SteppingTimeProvider::new(1_000, 1));
        let events = Arc::new(TaskEventService::new(
            Arc::new(SqliteTaskEventRepository::new(pool.clone())),
            clock.clone(),
        ));
        let blocked = Arc::new(BlockedTargetService::new(
            Arc::new(SqliteBlockedTargetRepository::new(pool)),
            clock,
        ));

        let store: Arc<dyn DepositStore> = Arc::new(FsDepositStore::new());
        let ctx = Arc::new(IngestContext {
            store: store.clone(),
            remote: Arc::new(self.remote.clone()),
            validator: Arc::new(self.validator.clone()),
            mapper: Arc::new(BagMetadataMapper::new()),
            blocked: blocked.clone(),
            events: events.clone(),
            settings: self.settings,
        });
        let manager = Arc::new(TargetedTaskSequenceManager::new(self.pool_size));
        let enqueuer = Arc::new(EnqueuingService::new(ctx, manager.clone(), 3));
        let area = Arc::new(Area::new(
            AreaConfig {
                kind: self.kind,
                inbox: inbox.clone(),
                outbox: outbox.clone(),
                publish: self.publish,
            },
            store,
            enqueuer,
        ));

        Harness {
            _tmp: tmp,
            inbox,
            outbox,
            remote: self.remote,
            validator: self.validator,
            events,
            blocked,
            manager,
            area,
        }
    }
}

impl Harness {
    pub fn batch_dir(&self, batch: &str) -> PathBuf {
        self.inbox.join(batch)
    }

    pub async fn import(&self, batch: &str, continue_previous: bool) -> Result<String> {
        self.area
            .start_import(ImportRequest {
                path: PathBuf::from(batch),
                single_deposit: false,
                continue_previous,
            })
            .await
    }

    pub async fn import_single(&self, path: &str) -> Result<String> {
        self.area
            .start_import(ImportRequest {
                path: PathBuf::from(path),
                single_deposit: true,
                continue_previous: false,
            })
            .await
    }

    /// Wait until `dir` holds no deposit directories and no task is pending
    pub async fn settle(&self, dir: &Path) {
        let wait = async {
            loop {
                if remaining_deposits(dir) == 0 && self.manager.pending_tasks() == 0 {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        };
        tokio::time::timeout(SETTLE_TIMEOUT, wait)
            .await
            .expect("deposits were not processed in time");
    }

    /// Deposit directory in one of the outbox sub-directories of a batch
    pub fn outbox_deposit(&self, batch: &str, subdir: &str, id: &str) -> PathBuf {
        self.outbox.join(batch).join(subdir).join(id)
    }

    pub async fn events_of(&self, id: &str) -> Vec<TaskEvent> {
        self.events.for_deposit(id).await.unwrap()
    }

    /// Timestamp of the first event of `event_type` for a deposit
    pub async fn event_time(&self, id: &str, event_type: EventType) -> i64 {
        self.events_of(id)
            .await
            .into_iter()
            .find(|e| e.event_type == event_type)
            .map(|e| e.created_at)
            .unwrap_or_else(|| panic!("no {} event for {}", event_type, id))
    }
}

fn remaining_deposits(dir: &Path) -> usize {
    if !dir.exists() {
        return 0;
    }
    if dir.join("deposit.properties").is_file() {
        return 1;
    }
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().is_dir())
                .count()
        })
        .unwrap_or(0)
}

/// A deposit directory as produced by the submission service
pub struct TestDeposit {
    id: String,
    target: String,
    created: String,
    is_version_of: Option<String>,
    doi: Option<String>,
    state: Option<String>,
    license: String,
    with_properties: bool,
}

impl TestDeposit {
    pub fn new(id: &str, target: &str) -> Self {
        Self {
            id: id.to_string(),
            target: target.to_string(),
            created: "2020-02-15T08:01:00.000+01:00".to_string(),
            is_version_of: None,
            doi: None,
            state: None,
            license: "CC0-1.0".to_string(),
            with_properties: true,
        }
    }

    pub fn created(mut self, created: &str) -> Self {
        self.created = created.to_string();
        self
    }

    pub fn update_of(mut self, predecessor: &str) -> Self {
        self.is_version_of = Some(predecessor.to_string());
        self
    }

    pub fn doi(mut self, doi: &str) -> Self {
        self.doi = Some(doi.to_string());
        self
    }

    pub fn state(mut self, state: &str) -> Self {
        self.state = Some(state.to_string());
        self
    }

    pub fn license(mut self, license: &str) -> Self {
        self.license = license.to_string();
        self
    }

    pub fn without_properties(mut self) -> Self {
        self.with_properties = false;
        self
    }

    pub fn write(self, batch_dir: &Path) -> PathBuf {
        let dir = batch_dir.join(&self.id);
        let bag = dir.join("bag");
        fs::create_dir_all(bag.join("data")).unwrap();
        fs::create_dir_all(bag.join("metadata")).unwrap();

        if self.with_properties {
            let mut properties = format!(
                "depositor.userId=user001\ndataverse.sword-token={}\n",
                self.target
            );
            if let Some(doi) = &self.doi {
                properties.push_str(&format!("identifier.doi={}\n", doi));
            }
            if let Some(state) = &self.state {
                properties.push_str(&format!("state.label={}\nstate.description=done\n", state));
            }
            fs::write(dir.join("deposit.properties"), properties).unwrap();
        }

        let mut bag_info = format!("Bagging-Date: 2020-02-15\nCreated: {}\n", self.created);
        if let Some(predecessor) = &self.is_version_of {
            bag_info.push_str(&format!("Is-Version-Of: {}\n", predecessor));
        }
        fs::write(bag.join("bag-info.txt"), bag_info).unwrap();

        let content = "a,b\n1,2\n";
        fs::write(bag.join("data/table.csv"), content).unwrap();
        fs::write(
            bag.join("manifest-sha1.txt"),
            "2f1ea8b0f8b5f2a4c3d1e0f9a8b7c6d5e4f3a2b1  data/table.csv\n",
        )
        .unwrap();
        fs::write(
            bag.join("metadata/dataset.json"),
            format!(
                r#"{{"title": "Survey {}", "authors": ["A. Author"], "license": "{}"}}"#,
                self.id, self.license
            ),
        )
        .unwrap();
        dir
    }
}

pub fn read_properties(dir: &Path) -> String {
    fs::read_to_string(dir.join("deposit.properties")).unwrap()
}
