//! Role and actor reference resolution.
//!
//! Role references arrive as path segments and name a role either by system
//! name (`app-user`) or by numeric id (`2`). The choice is made once, by
//! [`is_system_name`], and exactly one lookup is attempted.

use database::{Catalog, RoleStore};
use entities::{Actor, Role};
use tracing::debug;

use crate::error::{Result, ServiceError};

/// A reference containing any lowercase ASCII letter names a role by system
/// name. Everything else is taken as a numeric id.
pub fn is_system_name(reference: &str) -> bool {
    reference.bytes().any(|b| b.is_ascii_lowercase())
}

/// How a role reference will be looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleReference {
    SystemName(String),
    Id(i64),
    /// Neither a system name nor an integer; resolves to nothing.
    Malformed(String),
}

impl RoleReference {
    pub fn parse(reference: &str) -> Self {
        if is_system_name(reference) {
            RoleReference::SystemName(reference.to_string())
        } else {
            match reference.parse::<i64>() {
                Ok(id) => RoleReference::Id(id),
                Err(_) => RoleReference::Malformed(reference.to_string()),
            }
        }
    }
}

pub async fn resolve_role(roles: &RoleStore, reference: &str) -> Result<Role> {
    let found = match RoleReference::parse(reference) {
        RoleReference::SystemName(name) => roles.get_by_system_name(&name).await?,
        RoleReference::Id(id) => roles.get_by_id(id).await?,
        RoleReference::Malformed(raw) => {
            debug!("Role reference {:?} is neither a name nor an id", raw);
            None
        }
    };

    found.ok_or_else(|| ServiceError::not_found(format!("role {}", reference)))
}

/// Actor references are numeric ids; deleted actors do not resolve.
pub async fn resolve_actor(catalog: &Catalog, reference: &str) -> Result<Actor> {
    let not_found = || ServiceError::not_found(format!("actor {}", reference));

    let id = reference.parse::<i64>().map_err(|_| not_found())?;
    catalog.get_actor(id).await?.ok_or_else(not_found)
}
