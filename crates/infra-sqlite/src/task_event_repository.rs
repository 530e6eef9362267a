// SQLite TaskEventRepository Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use ingestflow_core::domain::{EventResult, EventType, TaskEvent};
use ingestflow_core::error::{AppError, Result};
use ingestflow_core::port::TaskEventRepository;
use sqlx::SqlitePool;

pub struct SqliteTaskEventRepository {
    pool: SqlitePool,
}

impl SqliteTaskEventRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskEventRepository for SqliteTaskEventRepository {
    async fn insert(&self, event: &TaskEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO task_events (deposit_id, event_type, result, message, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&event.deposit_id)
        .bind(event.event_type.to_string())
        .bind(event.result.to_string())
        .bind(&event.message)
        .bind(event.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_by_deposit_id(&self, deposit_id: &str) -> Result<Vec<TaskEvent>> {
        let rows = sqlx::query_as::<_, TaskEventRow>(
            r#"
            SELECT deposit_id, event_type, result, message, created_at
            FROM task_events
            WHERE deposit_id = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(deposit_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(TaskEventRow::into_event).collect()
    }

    async fn find_recent(&self, limit: i64) -> Result<Vec<TaskEvent>> {
        let rows = sqlx::query_as::<_, TaskEventRow>(
            r#"
            SELECT deposit_id, event_type, result, message, created_at
            FROM task_events
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(TaskEventRow::into_event).collect()
    }
}

#[derive(sqlx::FromRow)]
struct TaskEventRow {
    deposit_id: String,
    event_type: String,
    result: String,
    message: Option<String>,
    created_at: i64,
}

impl TaskEventRow {
    fn into_event(self) -> Result<TaskEvent> {
        let event_type: EventType = self.event_type.parse().map_err(AppError::Database)?;
        let result: EventResult = self.result.parse().map_err(AppError::Database)?;
        Ok(TaskEvent::new(
            self.deposit_id,
            event_type,
            result,
            self.message,
            self.created_at,
        ))
    }
}
