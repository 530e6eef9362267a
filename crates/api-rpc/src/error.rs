//! RPC Error Types
//!
//! Maps application errors to JSON-RPC error codes.

use ingestflow_core::error::AppError;
use jsonrpsee::types::ErrorObjectOwned;

/// RPC Error Codes
pub mod code {
    pub const VALIDATION_ERROR: i32 = 4000;
    pub const NOT_FOUND: i32 = 4001;
    pub const CONFLICT: i32 = 4002;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const DB_ERROR: i32 = 5001;
    pub const SYSTEM_ERROR: i32 = 5002;
}

/// Convert AppError to JSON-RPC ErrorObject
pub fn to_rpc_error(err: AppError) -> ErrorObjectOwned {
    let code = match &err {
        AppError::Validation(_) | AppError::Domain(_) | AppError::Serialization(_) => {
            code::VALIDATION_ERROR
        }
        AppError::NotFound(_) => code::NOT_FOUND,
        AppError::Conflict(_) | AppError::InvalidState(_) => code::CONFLICT,
        AppError::Database(_) => code::DB_ERROR,
        AppError::Io(_) | AppError::Remote(_) => code::SYSTEM_ERROR,
        AppError::Config(_) | AppError::Internal(_) => code::INTERNAL_ERROR,
    };
    let message = match err {
        // Bare message for the variants carrying one
        AppError::Validation(msg)
        | AppError::NotFound(msg)
        | AppError::Conflict(msg)
        | AppError::Database(msg)
        | AppError::Internal(msg)
        | AppError::Config(msg)
        | AppError::InvalidState(msg) => msg,
        other => other.to_string(),
    };
    ErrorObjectOwned::owned(code, message, None::<()>)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingestflow_core::domain::DomainError;
    use ingestflow_core::port::RemoteError;

    #[test]
    fn test_codes() {
        assert_eq!(
            to_rpc_error(AppError::Validation("bad".into())).code(),
            code::VALIDATION_ERROR
        );
        assert_eq!(
            to_rpc_error(AppError::Domain(DomainError::BlankTarget)).code(),
            code::VALIDATION_ERROR
        );
        assert_eq!(to_rpc_error(AppError::NotFound("x".into())).code(), code::NOT_FOUND);
        assert_eq!(to_rpc_error(AppError::Conflict("x".into())).code(), code::CONFLICT);
        assert_eq!(to_rpc_error(AppError::Database("x".into())).code(), code::DB_ERROR);
        assert_eq!(
            to_rpc_error(AppError::Remote(RemoteError::Transport("down".into()))).code(),
            code::SYSTEM_ERROR
        );
        assert_eq!(to_rpc_error(AppError::Internal("x".into())).code(), code::INTERNAL_ERROR);
    }

    #[test]
    fn test_message_is_not_prefixed() {
        let err = to_rpc_error(AppError::NotFound("Target sword:x is not blocked".into()));
        assert_eq!(err.message(), "Target sword:x is not blocked");
    }
}
