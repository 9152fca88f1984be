use thiserror::Error;

pub type Result<T> = std::result::Result<T, EntitiesError>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EntitiesError {
    #[error("Unknown actor kind: {0}")]
    UnknownActorKind(String),

    #[error("Unknown actee kind: {0}")]
    UnknownActeeKind(String),

    #[error("Unknown audit action: {0}")]
    UnknownAuditAction(String),
}
