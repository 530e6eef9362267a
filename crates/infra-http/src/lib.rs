// Ingest Flow Infrastructure - HTTP Adapters
// Implements: RemoteRepository (native dataset API), BagValidator

mod bag_validator;
mod client;
mod remote_repository;

pub use bag_validator::HttpBagValidator;
pub use client::API_KEY_HEADER;
pub use remote_repository::{HttpRemoteRepository, RemoteSettings};
