//! Securable resources and their addressable identities.
//!
//! Every resource that can be the object of an assignment exposes one
//! [`Actee`]: a type-agnostic identity plus the scopes it inherits from. The
//! assignment store joins on [`Actee::id`] alone, so a new resource type only
//! has to implement [`Securable`].
//!
//! Scope inheritance:
//!
//! ```text
//! *  <-  project (species)  <-  <project actee>  <-  <form actee>
//! *  <-  form (species)     <----------------------  <form actee>
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EntitiesError;

/// Addressable identity of the global root.
pub const ROOT_ACTEE_ID: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActeeKind {
    Root,
    Species,
    Project,
    Form,
}

impl ActeeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActeeKind::Root => "root",
            ActeeKind::Species => "species",
            ActeeKind::Project => "project",
            ActeeKind::Form => "form",
        }
    }
}

impl fmt::Display for ActeeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActeeKind {
    type Err = EntitiesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "root" => Ok(ActeeKind::Root),
            "species" => Ok(ActeeKind::Species),
            "project" => Ok(ActeeKind::Project),
            "form" => Ok(ActeeKind::Form),
            other => Err(EntitiesError::UnknownActeeKind(other.to_string())),
        }
    }
}

/// One node of an actee hierarchy: an identity and its direct parents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActeeEdge {
    pub id: String,
    pub parents: Vec<String>,
}

/// The canonical addressable identity of a securable resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actee {
    pub id: String,
    pub kind: ActeeKind,
    /// Direct parents, nearest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
}

impl Actee {
    /// The global root. Needs no lookup.
    pub fn root() -> Self {
        Self {
            id: ROOT_ACTEE_ID.to_string(),
            kind: ActeeKind::Root,
            parents: Vec::new(),
        }
    }

    /// The species actee for a resource type; assignments on it cover every
    /// resource of that type.
    pub fn species(kind: ActeeKind) -> Self {
        Self {
            id: kind.as_str().to_string(),
            kind: ActeeKind::Species,
            parents: vec![ROOT_ACTEE_ID.to_string()],
        }
    }

    pub fn project(actee_id: impl Into<String>) -> Self {
        Self {
            id: actee_id.into(),
            kind: ActeeKind::Project,
            parents: vec![ActeeKind::Project.as_str().to_string()],
        }
    }

    pub fn form(actee_id: impl Into<String>, project_actee_id: impl Into<String>) -> Self {
        Self {
            id: actee_id.into(),
            kind: ActeeKind::Form,
            parents: vec![project_actee_id.into(), ActeeKind::Form.as_str().to_string()],
        }
    }

    /// Every edge from this actee up to the root, without duplicates.
    pub fn lineage(&self) -> Vec<ActeeEdge> {
        let mut edges = vec![ActeeEdge {
            id: self.id.clone(),
            parents: self.parents.clone(),
        }];

        match self.kind {
            ActeeKind::Root => {}
            ActeeKind::Species => edges.push(Self::root().edge()),
            ActeeKind::Project => {
                edges.push(Self::species(ActeeKind::Project).edge());
                edges.push(Self::root().edge());
            }
            ActeeKind::Form => {
                // parents[0] is the owning project
                if let Some(project) = self.parents.first() {
                    edges.push(Self::project(project.clone()).edge());
                }
                edges.push(Self::species(ActeeKind::Project).edge());
                edges.push(Self::species(ActeeKind::Form).edge());
                edges.push(Self::root().edge());
            }
        }

        edges
    }

    /// This actee's id and every ancestor id.
    pub fn scope_ids(&self) -> Vec<String> {
        self.lineage().into_iter().map(|edge| edge.id).collect()
    }

    fn edge(&self) -> ActeeEdge {
        ActeeEdge {
            id: self.id.clone(),
            parents: self.parents.clone(),
        }
    }
}

/// Implemented by every resource type that can be the object of an assignment.
pub trait Securable {
    fn actee(&self) -> Actee;

    fn actee_id(&self) -> String {
        self.actee().id
    }
}

/// The global root resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Root;

impl Securable for Root {
    fn actee(&self) -> Actee {
        Actee::root()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub actee_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Securable for Project {
    fn actee(&self) -> Actee {
        Actee::project(self.actee_id.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    pub id: i64,
    pub project_id: i64,
    pub xml_form_id: String,
    pub name: String,
    pub actee_id: String,
    /// Actee id of the owning project, carried so the form can name its parent
    pub project_actee_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Securable for Form {
    fn actee(&self) -> Actee {
        Actee::form(self.actee_id.clone(), self.project_actee_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_has_no_ancestors() {
        let root = Root.actee();
        assert_eq!(root.id, ROOT_ACTEE_ID);
        assert_eq!(root.scope_ids(), vec!["*".to_string()]);
    }

    #[test]
    fn test_project_scope_ids() {
        let actee = Actee::project("p-1");
        assert_eq!(actee.scope_ids(), vec!["p-1", "project", "*"]);
    }

    #[test]
    fn test_form_lineage_includes_project_and_species() {
        let actee = Actee::form("f-1", "p-1");
        let ids = actee.scope_ids();
        assert_eq!(ids, vec!["f-1", "p-1", "project", "form", "*"]);

        let lineage = actee.lineage();
        assert_eq!(lineage[0].parents, vec!["p-1", "form"]);
        assert_eq!(lineage[1].parents, vec!["project"]);
    }

    #[test]
    fn test_actee_kind_parse() {
        assert_eq!("form".parse::<ActeeKind>().unwrap(), ActeeKind::Form);
        assert!("folder".parse::<ActeeKind>().is_err());
    }
}
