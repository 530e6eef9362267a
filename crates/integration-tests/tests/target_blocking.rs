//! Blocked targets
//!
//! A failure that may have left a dataset half-modified bars every later
//! deposit for the same target until an operator unblocks it. Other
//! targets keep flowing.

mod common;

use common::{read_properties, HarnessBuilder, TestDeposit};
use ingestflow_core::application::AreaKind;
use ingestflow_core::domain::{DepositState, EventResult, EventType};
use ingestflow_core::error::AppError;
use ingestflow_core::port::remote_repository::mocks::MockRemoteRepository;
use tokio_test::assert_ok;

const FIRST: &str = "0b9bb5ee-3187-4387-bb39-2c09536c79f7";
const SECOND: &str = "5e1c3a7d-9f42-4d6b-8a0e-2b7c4d9e1f30";
const OTHER: &str = "a3d8f1e2-6b4c-4f9a-9e7d-1c2b3a4d5e6f";

const EXISTING_PID: &str = "doi:10.5072/FK2/EXISTING";

fn update(id: &str, created: &str) -> TestDeposit {
    TestDeposit::new(id, "sword:t1")
        .created(created)
        .update_of("urn:uuid:11111111-2222-4333-8444-555555555555")
}

#[tokio::test]
async fn test_unlock_timeout_blocks_later_updates_of_same_target() {
    let remote = MockRemoteRepository::new()
        .with_dataset("sword:t1", EXISTING_PID)
        .always_locked();
    let h = HarnessBuilder::new(AreaKind::Import)
        .remote(remote)
        .build()
        .await;
    let batch = h.batch_dir("batch-1");
    update(FIRST, "2020-02-15T08:00:00.000+01:00").write(&batch);
    update(SECOND, "2020-02-15T09:00:00.000+01:00").write(&batch);

    assert_ok!(h.import("batch-1", false).await);
    h.settle(&batch).await;

    let first = read_properties(&h.outbox_deposit("batch-1", "failed", FIRST));
    assert!(first.contains("state.label=FAILED"));
    assert!(first.contains("still locked"));

    let second = read_properties(&h.outbox_deposit("batch-1", "failed", SECOND));
    assert!(second.contains("state.label=FAILED"));
    assert!(second.contains("is blocked by an earlier deposit"));

    let blocked = h.blocked.list(None).await.unwrap();
    assert_eq!(blocked.len(), 1, "a target is blocked only once");
    assert_eq!(blocked[0].target, "sword:t1");
    assert_eq!(blocked[0].deposit_id, FIRST);
    assert_eq!(blocked[0].state, DepositState::Failed);
    assert!(h.remote.mutations().is_empty());
}

#[tokio::test]
async fn test_other_targets_continue_while_one_is_blocked() {
    let remote = MockRemoteRepository::new().with_dataset("sword:t1", EXISTING_PID);
    let h = HarnessBuilder::new(AreaKind::Import)
        .remote(remote)
        .build()
        .await;
    h.blocked
        .block(
            "9d8c7b6a-5f4e-4d3c-8b2a-1f0e9d8c7b6a",
            "sword:t1",
            DepositState::Failed,
            Some("manual".to_string()),
        )
        .await
        .unwrap();

    let batch = h.batch_dir("batch-1");
    update(FIRST, "2020-02-15T08:00:00.000+01:00").write(&batch);
    TestDeposit::new(OTHER, "sword:t2").write(&batch);

    assert_ok!(h.import("batch-1", false).await);
    h.settle(&batch).await;

    assert!(h.outbox_deposit("batch-1", "failed", FIRST).is_dir());
    assert!(h.outbox_deposit("batch-1", "processed", OTHER).is_dir());

    let events = h.events_of(FIRST).await;
    let end = events.last().unwrap();
    assert_eq!(end.event_type, EventType::EndProcessing);
    assert_eq!(end.result, EventResult::Failed);
}

#[tokio::test]
async fn test_unblocked_target_accepts_new_deposits() {
    let remote = MockRemoteRepository::new().with_dataset("sword:t1", EXISTING_PID);
    let h = HarnessBuilder::new(AreaKind::Import)
        .remote(remote)
        .build()
        .await;
    h.blocked
        .block(FIRST, "sword:t1", DepositState::Failed, None)
        .await
        .unwrap();

    assert_eq!(h.blocked.unblock("sword:t1").await.unwrap(), 1);
    assert!(matches!(
        h.blocked.unblock("sword:t1").await,
        Err(AppError::NotFound(_))
    ));

    let batch = h.batch_dir("batch-2");
    update(SECOND, "2020-02-16T08:00:00.000+01:00").write(&batch);

    assert_ok!(h.import("batch-2", false).await);
    h.settle(&batch).await;

    let properties = read_properties(&h.outbox_deposit("batch-2", "processed", SECOND));
    assert!(properties.contains("state.label=PUBLISHED"));
    assert!(properties.contains(&format!("identifier.doi={}", EXISTING_PID)));

    // The history keeps the cleared block
    let history = h.blocked.list(Some("sword:t1")).await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].unblocked_at.is_some());
}

#[tokio::test]
async fn test_identifier_collision_blocks_target() {
    let pid = "doi:10.5072/FK2/TAKEN";
    let remote = MockRemoteRepository::new().with_dataset(pid, pid);
    let h = HarnessBuilder::new(AreaKind::Migration)
        .remote(remote)
        .build()
        .await;
    let batch = h.batch_dir("batch-1");
    TestDeposit::new(FIRST, "sword:t1").doi(pid).write(&batch);

    assert_ok!(h.import("batch-1", false).await);
    h.settle(&batch).await;

    let properties = read_properties(&h.outbox_deposit("batch-1", "failed", FIRST));
    assert!(properties.contains("already assigned to an existing dataset"));
    assert!(assert_ok!(h.blocked.is_blocked("sword:t1").await));
    assert!(h.remote.mutations().is_empty());
}

#[tokio::test]
async fn test_missing_role_fails_without_blocking() {
    let h = HarnessBuilder::new(AreaKind::Import)
        .remote(MockRemoteRepository::new().with_roles(&["curator"]))
        .settings(|s| s.authorization.enabled = true)
        .build()
        .await;
    let batch = h.batch_dir("batch-1");
    TestDeposit::new(FIRST, "sword:t1").write(&batch);

    assert_ok!(h.import("batch-1", false).await);
    h.settle(&batch).await;

    let properties = read_properties(&h.outbox_deposit("batch-1", "failed", FIRST));
    assert!(properties.contains("lacks role 'dsContributor'"));
    assert!(!assert_ok!(h.blocked.is_blocked("sword:t1").await));
}

#[tokio::test]
async fn test_update_of_unknown_dataset_is_rejected_without_blocking() {
    let h = HarnessBuilder::new(AreaKind::Import).build().await;
    let batch = h.batch_dir("batch-1");
    update(FIRST, "2020-02-15T08:00:00.000+01:00").write(&batch);

    assert_ok!(h.import("batch-1", false).await);
    h.settle(&batch).await;

    let properties = read_properties(&h.outbox_deposit("batch-1", "rejected", FIRST));
    assert!(properties.contains("Update of non-existing dataset"));
    assert!(!assert_ok!(h.blocked.is_blocked("sword:t1").await));
}
