// Domain Layer - Pure business logic and entities

pub mod bag_info;
pub mod blocked;
pub mod deposit;
pub mod error;
pub mod event;
pub mod location;
pub mod properties;

// Re-exports
pub use bag_info::BagInfo;
pub use blocked::BlockedTarget;
pub use deposit::{Deposit, DepositFile, DepositId, DepositKind, DepositState, PersistentId};
pub use error::DomainError;
pub use event::{EventResult, EventType, TaskEvent};
pub use location::{sort_by_created, DepositLocation};
pub use properties::DepositProperties;
