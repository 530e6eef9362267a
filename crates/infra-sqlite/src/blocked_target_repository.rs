// SQLite BlockedTargetRepository Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use ingestflow_core::domain::{BlockedTarget, DepositState};
use ingestflow_core::error::{AppError, Result};
use ingestflow_core::port::BlockedTargetRepository;
use sqlx::SqlitePool;

pub struct SqliteBlockedTargetRepository {
    pool: SqlitePool,
}

impl SqliteBlockedTargetRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BlockedTargetRepository for SqliteBlockedTargetRepository {
    async fn is_blocked(&self, target: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM blocked_targets WHERE target = ? AND unblocked_at IS NULL",
        )
        .bind(target)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(count > 0)
    }

    async fn block(&self, record: &BlockedTarget) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO blocked_targets (deposit_id, target, state, message, created_at, unblocked_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.deposit_id)
        .bind(&record.target)
        .bind(record.state.to_string())
        .bind(&record.message)
        .bind(record.created_at)
        .bind(record.unblocked_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn unblock(&self, target: &str, unblocked_at: i64) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE blocked_targets SET unblocked_at = ? WHERE target = ? AND unblocked_at IS NULL",
        )
        .bind(unblocked_at)
        .bind(target)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn find_by_target(&self, target: &str) -> Result<Vec<BlockedTarget>> {
        let rows = sqlx::query_as::<_, BlockedTargetRow>(
            r#"
            SELECT deposit_id, target, state, message, created_at, unblocked_at
            FROM blocked_targets
            WHERE target = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(target)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(BlockedTargetRow::into_record).collect()
    }

    async fn find_active(&self) -> Result<Vec<BlockedTarget>> {
        let rows = sqlx::query_as::<_, BlockedTargetRow>(
            r#"
            SELECT deposit_id, target, state, message, created_at, unblocked_at
            FROM blocked_targets
            WHERE unblocked_at IS NULL
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(BlockedTargetRow::into_record).collect()
    }
}

#[derive(sqlx::FromRow)]
struct BlockedTargetRow {
    deposit_id: String,
    target: String,
    state: String,
    message: Option<String>,
    created_at: i64,
    unblocked_at: Option<i64>,
}

impl BlockedTargetRow {
    fn into_record(self) -> Result<BlockedTarget> {
        let state = DepositState::parse(&self.state)
            .map_err(|e| AppError::Database(format!("Corrupt blocked target row: {}", e)))?;
        Ok(BlockedTarget {
            deposit_id: self.deposit_id,
            target: self.target,
            state,
            message: self.message,
            created_at: self.created_at,
            unblocked_at: self.unblocked_at,
        })
    }
}
