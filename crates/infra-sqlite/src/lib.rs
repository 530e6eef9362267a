// Ingest Flow Infrastructure - SQLite Adapter
// Implements: TaskEventRepository, BlockedTargetRepository

mod blocked_target_repository;
mod connection;
mod error;
mod migration;
mod task_event_repository;

pub use blocked_target_repository::SqliteBlockedTargetRepository;
pub use connection::{create_pool, database_url};
pub use error::map_sqlx_error;
pub use migration::run_migrations;
pub use task_event_repository::SqliteTaskEventRepository;

// Note: sqlx::Error conversion is handled by map_sqlx_error
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)
