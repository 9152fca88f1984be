//! Locating securable resources from request references.
//!
//! Each resource type has a reference type implementing [`Locate`]. Locating
//! either yields a resource with its addressable identity populated or fails
//! with `NotFound`. The operations in [`crate::service`] take an [`ActeeRef`]
//! and never look at which variant it is, so adding a resource type means a
//! new reference type and a new variant here.

use async_trait::async_trait;
use database::Catalog;
use entities::{Actee, Form, Project, Root, Securable};
use std::fmt;

use crate::error::{Result, ServiceError};

#[async_trait]
pub trait Locate: Send + Sync {
    type Resource: Securable + Send;

    async fn locate(&self, catalog: &Catalog) -> Result<Self::Resource>;
}

/// The global root. Always exists; no lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RootRef;

#[async_trait]
impl Locate for RootRef {
    type Resource = Root;

    async fn locate(&self, _catalog: &Catalog) -> Result<Root> {
        Ok(Root)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectRef {
    pub project_id: i64,
}

#[async_trait]
impl Locate for ProjectRef {
    type Resource = Project;

    async fn locate(&self, catalog: &Catalog) -> Result<Project> {
        catalog
            .get_project(self.project_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("project {}", self.project_id)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormRef {
    pub project_id: i64,
    pub xml_form_id: String,
}

#[async_trait]
impl Locate for FormRef {
    type Resource = Form;

    async fn locate(&self, catalog: &Catalog) -> Result<Form> {
        catalog
            .get_form(self.project_id, &self.xml_form_id)
            .await?
            .ok_or_else(|| {
                ServiceError::not_found(format!(
                    "form {} in project {}",
                    self.xml_form_id, self.project_id
                ))
            })
    }
}

/// Any securable resource reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActeeRef {
    Root(RootRef),
    Project(ProjectRef),
    Form(FormRef),
}

impl ActeeRef {
    pub fn root() -> Self {
        ActeeRef::Root(RootRef)
    }

    pub fn project(project_id: i64) -> Self {
        ActeeRef::Project(ProjectRef { project_id })
    }

    pub fn form(project_id: i64, xml_form_id: impl Into<String>) -> Self {
        ActeeRef::Form(FormRef {
            project_id,
            xml_form_id: xml_form_id.into(),
        })
    }
}

impl fmt::Display for ActeeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActeeRef::Root(_) => write!(f, "/"),
            ActeeRef::Project(p) => write!(f, "/projects/{}", p.project_id),
            ActeeRef::Form(form) => {
                write!(f, "/projects/{}/forms/{}", form.project_id, form.xml_form_id)
            }
        }
    }
}

/// A resource found through an [`ActeeRef`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Located {
    Root(Root),
    Project(Project),
    Form(Form),
}

impl Securable for Located {
    fn actee(&self) -> Actee {
        match self {
            Located::Root(root) => root.actee(),
            Located::Project(project) => project.actee(),
            Located::Form(form) => form.actee(),
        }
    }
}

#[async_trait]
impl Locate for ActeeRef {
    type Resource = Located;

    async fn locate(&self, catalog: &Catalog) -> Result<Located> {
        Ok(match self {
            ActeeRef::Root(r) => Located::Root(r.locate(catalog).await?),
            ActeeRef::Project(r) => Located::Project(r.locate(catalog).await?),
            ActeeRef::Form(r) => Located::Form(r.locate(catalog).await?),
        })
    }
}
