use authz::error::AuthzError;
use database::DatabaseError;
use std::time::Duration;
use thiserror::Error;

/// Failures surfaced by the assignment operations.
///
/// `NotFound` and `PermissionDenied` are distinct: references are resolved
/// before any authorization check, so a caller learns a resource is missing
/// before learning whether it may act on it.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),

    #[error("Authorization error: {0}")]
    Authz(#[from] AuthzError),
}

impl ServiceError {
    pub fn not_found(what: impl Into<String>) -> Self {
        ServiceError::NotFound(what.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound(_))
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, ServiceError::PermissionDenied(_))
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
