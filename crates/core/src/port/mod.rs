// Port Layer - Interfaces for external dependencies

pub mod bag_validator;
pub mod blocked_target_repository;
pub mod deposit_store;
pub mod metadata_mapper;
pub mod remote_repository;
pub mod task_event_repository;
pub mod time_provider;

// Re-exports
pub use bag_validator::{BagValidator, PackageType, RuleViolation, ValidationReport};
pub use blocked_target_repository::BlockedTargetRepository;
pub use deposit_store::DepositStore;
pub use metadata_mapper::{DatasetPayload, MappingContext, MappingError, MetadataMapper};
pub use remote_repository::{
    DatasetMutation, DatasetRef, LockState, RemoteError, RemoteRepository, RoleScope,
};
pub use task_event_repository::TaskEventRepository;
pub use time_provider::TimeProvider;
