//! Domain model shared by every Steward crate.
//!
//! The types here carry no persistence or policy logic. They describe who
//! acts ([`Actor`]), what bundles of capability exist ([`Role`]), what can be
//! secured ([`Actee`] and the [`Securable`] resources), and the facts linking
//! them ([`Assignment`], [`AuditRecord`]).

pub mod actee;
pub mod actor;
pub mod assignment;
pub mod audit;
pub mod error;
pub mod role;

pub use actee::{Actee, ActeeEdge, ActeeKind, Form, Project, Root, Securable, ROOT_ACTEE_ID};
pub use actor::{Actor, ActorKind};
pub use assignment::{
    Assignment, AssignmentView, ExtendedAssignment, FormRoleSummary, FormSummary, QueryOptions,
};
pub use audit::{AuditAction, AuditRecord};
pub use error::{EntitiesError, Result};
pub use role::{verbs, Role};
