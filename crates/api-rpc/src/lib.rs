//! JSON-RPC API Layer
//!
//! Operator surface of Ingest Flow: start imports, inspect and clear
//! blocked targets, query the task event trail, read runtime stats.

pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use handler::RpcHandler;
pub use server::{RpcServer, RpcServerConfig};
