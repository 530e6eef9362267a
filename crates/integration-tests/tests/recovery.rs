//! Crash recovery
//!
//! The daemon may stop between any two steps. Re-importing the batch with
//! `continue_previous` completes what was left without redoing finished work.

mod common;

use common::{read_properties, HarnessBuilder, TestDeposit};
use ingestflow_core::application::AreaKind;
use ingestflow_core::error::AppError;
use std::fs;
use tokio_test::assert_ok;

const DONE: &str = "0b9bb5ee-3187-4387-bb39-2c09536c79f7";
const INTERRUPTED: &str = "5e1c3a7d-9f42-4d6b-8a0e-2b7c4d9e1f30";
const FRESH: &str = "a3d8f1e2-6b4c-4f9a-9e7d-1c2b3a4d5e6f";

#[tokio::test]
async fn test_outbox_with_results_requires_continue() {
    let h = HarnessBuilder::new(AreaKind::Import).build().await;
    let batch = h.batch_dir("batch-1");
    TestDeposit::new(FRESH, "sword:t3").write(&batch);
    fs::create_dir_all(h.outbox_deposit("batch-1", "processed", DONE)).unwrap();

    let result = h.import("batch-1", false).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
    assert!(batch.join(FRESH).is_dir());

    assert_ok!(h.import("batch-1", true).await);
    h.settle(&batch).await;

    // Earlier results are left in place
    assert!(h.outbox_deposit("batch-1", "processed", DONE).is_dir());
    assert!(h.outbox_deposit("batch-1", "processed", FRESH).is_dir());
}

#[tokio::test]
async fn test_continue_completes_interrupted_batch() {
    let h = HarnessBuilder::new(AreaKind::Import).build().await;
    let batch = h.batch_dir("batch-1");
    fs::create_dir_all(h.outbox.join("batch-1/processed")).unwrap();

    // Final state written, relocation never happened
    TestDeposit::new(DONE, "sword:t1")
        .state("PUBLISHED")
        .doi("doi:10.5072/FK2/DONE")
        .write(&batch);
    // Stopped while the deposit was being processed
    TestDeposit::new(INTERRUPTED, "sword:t2")
        .state("IN_PROGRESS")
        .write(&batch);

    assert_ok!(h.import("batch-1", true).await);
    h.settle(&batch).await;

    let done = read_properties(&h.outbox_deposit("batch-1", "processed", DONE));
    assert!(done.contains("state.label=PUBLISHED"));
    assert!(done.contains("identifier.doi=doi:10.5072/FK2/DONE"));

    let interrupted = read_properties(&h.outbox_deposit("batch-1", "processed", INTERRUPTED));
    assert!(interrupted.contains("state.label=PUBLISHED"));

    // Only the interrupted deposit talked to the repository
    assert_eq!(h.remote.mutations().len(), 1);
    assert_eq!(h.remote.published().len(), 1);
    assert_eq!(h.validator.call_count(), 1);
}

#[tokio::test]
async fn test_failed_terminal_state_is_relocated_to_failed() {
    let h = HarnessBuilder::new(AreaKind::Import).build().await;
    let batch = h.batch_dir("batch-1");
    TestDeposit::new(DONE, "sword:t1")
        .state("REJECTED")
        .write(&batch);

    assert_ok!(h.import("batch-1", true).await);
    h.settle(&batch).await;

    assert!(h.outbox_deposit("batch-1", "rejected", DONE).is_dir());
    assert_eq!(h.remote.call_count(), 0);
}

#[tokio::test]
async fn test_reimporting_finished_batch_is_refused() {
    let h = HarnessBuilder::new(AreaKind::Import).build().await;
    let batch = h.batch_dir("batch-1");
    TestDeposit::new(FRESH, "sword:t1").write(&batch);

    assert_ok!(h.import("batch-1", false).await);
    h.settle(&batch).await;

    // The batch directory is empty now
    let result = h.import("batch-1", true).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}
