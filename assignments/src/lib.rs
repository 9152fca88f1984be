//! Role assignment for Steward.
//!
//! [`AssignmentService`] exposes the six operations every transport adapter
//! calls: listing a resource's assignments, listing the actors holding one
//! role there, granting, revoking, and the two project-wide form summaries.
//! Resources are addressed through [`ActeeRef`] so the operations never depend
//! on a concrete resource type.

pub mod actees;
pub mod auth;
pub mod error;
pub mod resolver;
pub mod service;

pub use actees::{ActeeRef, FormRef, Locate, Located, ProjectRef, RootRef};
pub use auth::{Auth, GrantCheck};
pub use error::{Result, ServiceError};
pub use resolver::{is_system_name, resolve_actor, resolve_role, RoleReference};
pub use service::{AssignmentService, GrantOutcome, Revocation, ServiceConfig};
