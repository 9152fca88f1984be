//! Error types for the authorization system.
//!
//! # Security Note
//! These errors describe failures to *evaluate* a decision. A deny is not an
//! error. Callers must fail closed on any of these and must not echo policy
//! text back to users.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthzError {
    /// Failed to parse a generated Cedar policy.
    #[error("Policy parsing failed: {0}")]
    PolicyParse(String),

    /// Failed to build the Cedar entity hierarchy.
    #[error("Entity creation failed: {0}")]
    EntityCreation(String),

    /// Failed to build or evaluate an authorization request.
    #[error("Authorization evaluation failed: {0}")]
    EvaluationError(String),
}

/// A specialized Result type for authorization operations.
pub type Result<T> = std::result::Result<T, AuthzError>;
