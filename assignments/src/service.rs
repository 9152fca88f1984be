//! The assignment operations.
//!
//! Every operation follows the same pipeline: resolve the references
//! concurrently, authorize, then read or mutate. Grants and revokes write the
//! assignment change and its audit record in one transaction, and each
//! operation runs under [`ServiceConfig::operation_timeout`].

use authz::AuthzEngine;
use database::{
    AssignmentStore, AuditTrail, Catalog, Database, FormAssignment, NewAuditEntry, RoleStore,
};
use entities::{
    verbs, Actor, ActorKind, Assignment, AssignmentView, AuditAction, FormRoleSummary,
    FormSummary, QueryOptions, Role, Securable, ROOT_ACTEE_ID,
};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::actees::{ActeeRef, Locate, ProjectRef};
use crate::auth::Auth;
use crate::error::{Result, ServiceError};
use crate::resolver::{resolve_actor, resolve_role};

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Deadline applied to each operation as a whole
    pub operation_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            operation_timeout: Duration::from_secs(10),
        }
    }
}

impl ServiceConfig {
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }
}

/// Result of a grant that passed authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantOutcome {
    pub assignment: Assignment,
    /// False when the actor already held the role there
    pub created: bool,
}

/// Result of a revoke that passed authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Revocation {
    Revoked,
    /// Nothing to remove; the attempt is still audited.
    NotAssigned,
}

#[derive(Clone)]
pub struct AssignmentService {
    db: Arc<Database>,
    catalog: Catalog,
    roles: RoleStore,
    assignments: AssignmentStore,
    audit: AuditTrail,
    engine: Arc<AuthzEngine>,
    config: ServiceConfig,
}

impl AssignmentService {
    pub fn new(db: Arc<Database>, config: ServiceConfig) -> Self {
        Self {
            catalog: Catalog::new(db.clone()),
            roles: RoleStore::new(db.clone()),
            assignments: AssignmentStore::new(db.clone()),
            audit: AuditTrail::new(db.clone()),
            engine: Arc::new(AuthzEngine::new()),
            db,
            config,
        }
    }

    /// Authorization context for a caller already authenticated as `actor`.
    pub fn auth_for(&self, actor: Actor) -> Auth {
        Auth::new(actor, self.assignments.clone(), self.engine.clone())
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn roles(&self) -> &RoleStore {
        &self.roles
    }

    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }

    async fn with_deadline<T>(&self, op: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.config.operation_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!("{} exceeded {:?}", op, self.config.operation_timeout);
                Err(ServiceError::Timeout(self.config.operation_timeout))
            }
        }
    }

    /// Every assignment on a resource.
    pub async fn list_assignments(
        &self,
        auth: &Auth,
        actee: &ActeeRef,
        options: QueryOptions,
    ) -> Result<Vec<AssignmentView>> {
        self.with_deadline("list_assignments", self.list_assignments_inner(auth, actee, options))
            .await
    }

    async fn list_assignments_inner(
        &self,
        auth: &Auth,
        actee: &ActeeRef,
        options: QueryOptions,
    ) -> Result<Vec<AssignmentView>> {
        let resource = actee.locate(&self.catalog).await?;
        let resource = auth.can_or_reject(verbs::ASSIGNMENT_LIST, resource).await?;
        Ok(self
            .assignments
            .list_by_actee(&resource.actee_id(), options)
            .await?)
    }

    /// The actors holding one role on a resource.
    pub async fn list_assignments_by_role(
        &self,
        auth: &Auth,
        actee: &ActeeRef,
        role_ref: &str,
    ) -> Result<Vec<Actor>> {
        self.with_deadline(
            "list_assignments_by_role",
            self.list_assignments_by_role_inner(auth, actee, role_ref),
        )
        .await
    }

    async fn list_assignments_by_role_inner(
        &self,
        auth: &Auth,
        actee: &ActeeRef,
        role_ref: &str,
    ) -> Result<Vec<Actor>> {
        let (resource, role) = tokio::try_join!(
            actee.locate(&self.catalog),
            resolve_role(&self.roles, role_ref)
        )?;
        let resource = auth.can_or_reject(verbs::ASSIGNMENT_LIST, resource).await?;

        let assignments = self
            .assignments
            .list_by_actee_and_role(&resource.actee_id(), role.id)
            .await?;
        Ok(assignments.into_iter().map(|a| a.actor).collect())
    }

    /// Grant `role_ref` to `actor_ref` on a resource.
    ///
    /// Requires `assignment.create` on the resource and every verb of the
    /// role. Re-granting a held role succeeds with `created == false`.
    pub async fn grant_role(
        &self,
        auth: &Auth,
        actee: &ActeeRef,
        role_ref: &str,
        actor_ref: &str,
    ) -> Result<GrantOutcome> {
        self.with_deadline("grant_role", self.grant_role_inner(auth, actee, role_ref, actor_ref))
            .await
    }

    async fn grant_role_inner(
        &self,
        auth: &Auth,
        actee: &ActeeRef,
        role_ref: &str,
        actor_ref: &str,
    ) -> Result<GrantOutcome> {
        let (resource, role, target) = tokio::try_join!(
            actee.locate(&self.catalog),
            resolve_role(&self.roles, role_ref),
            resolve_actor(&self.catalog, actor_ref)
        )?;

        let check = auth.can_grant(&role, &resource).await?;
        if !check.may_create {
            warn!(
                "Denied {} on {} to actor {}",
                verbs::ASSIGNMENT_CREATE,
                resource.actee_id(),
                auth.actor().id
            );
            return Err(ServiceError::PermissionDenied(format!(
                "{} on {}",
                verbs::ASSIGNMENT_CREATE,
                resource.actee_id()
            )));
        }
        if !check.may_assign_role {
            return Err(ServiceError::PermissionDenied(format!(
                "insufficient rights to assign role {}",
                role.system
            )));
        }

        let assignment = Assignment {
            actor_id: target.id,
            role_id: role.id,
            actee_id: resource.actee_id(),
        };
        let created = self
            .record_grant(Some(auth.actor().id), &assignment)
            .await?;

        Ok(GrantOutcome {
            assignment,
            created,
        })
    }

    /// Revoke `role_ref` from `actor_ref` on a resource.
    pub async fn revoke_role(
        &self,
        auth: &Auth,
        actee: &ActeeRef,
        role_ref: &str,
        actor_ref: &str,
    ) -> Result<Revocation> {
        self.with_deadline("revoke_role", self.revoke_role_inner(auth, actee, role_ref, actor_ref))
            .await
    }

    async fn revoke_role_inner(
        &self,
        auth: &Auth,
        actee: &ActeeRef,
        role_ref: &str,
        actor_ref: &str,
    ) -> Result<Revocation> {
        let (resource, role, target) = tokio::try_join!(
            actee.locate(&self.catalog),
            resolve_role(&self.roles, role_ref),
            resolve_actor(&self.catalog, actor_ref)
        )?;
        let resource = auth.can_or_reject(verbs::ASSIGNMENT_DELETE, resource).await?;

        let assignment = Assignment {
            actor_id: target.id,
            role_id: role.id,
            actee_id: resource.actee_id(),
        };

        let mut tx = self.db.begin_write().await?;
        let existed = self.assignments.revoke(&mut tx, &assignment).await?;
        self.audit
            .log(
                &mut tx,
                NewAuditEntry {
                    actor_id: Some(auth.actor().id),
                    action: AuditAction::AssignmentDelete,
                    acted_actor_id: target.id,
                    actee_id: assignment.actee_id.clone(),
                    details: json!({
                        "roleId": role.id,
                        "revokedActeeId": assignment.actee_id,
                        "changed": existed,
                    }),
                },
            )
            .await?;
        tx.commit().await?;

        Ok(if existed {
            Revocation::Revoked
        } else {
            Revocation::NotAssigned
        })
    }

    /// Every role held on every live form of a project.
    pub async fn form_summaries(&self, auth: &Auth, project_id: i64) -> Result<Vec<FormSummary>> {
        self.with_deadline("form_summaries", self.form_summaries_inner(auth, project_id))
            .await
    }

    async fn form_summaries_inner(&self, auth: &Auth, project_id: i64) -> Result<Vec<FormSummary>> {
        let project = ProjectRef { project_id }.locate(&self.catalog).await?;
        let project = auth.can_or_reject(verbs::ASSIGNMENT_LIST, project).await?;

        let rows = self
            .assignments
            .list_across_forms_in_project(project.id)
            .await?;
        Ok(group_by_form(rows))
    }

    /// The actors holding one role on every live form of a project.
    pub async fn form_summaries_for_role(
        &self,
        auth: &Auth,
        project_id: i64,
        role_ref: &str,
    ) -> Result<Vec<FormRoleSummary>> {
        self.with_deadline(
            "form_summaries_for_role",
            self.form_summaries_for_role_inner(auth, project_id, role_ref),
        )
        .await
    }

    async fn form_summaries_for_role_inner(
        &self,
        auth: &Auth,
        project_id: i64,
        role_ref: &str,
    ) -> Result<Vec<FormRoleSummary>> {
        let (project, role) = tokio::try_join!(
            async {
                let project = ProjectRef { project_id }.locate(&self.catalog).await?;
                auth.can_or_reject(verbs::ASSIGNMENT_LIST, project).await
            },
            resolve_role(&self.roles, role_ref)
        )?;

        let rows = self
            .assignments
            .list_across_forms_in_project_by_role(project.id, role.id)
            .await?;
        Ok(group_by_form(rows)
            .into_iter()
            .map(|summary| FormRoleSummary {
                actors: summary.roles.into_values().flatten().collect(),
                xml_form_id: summary.xml_form_id,
            })
            .collect())
    }

    /// Create a user actor holding `admin` on the root. The grant is
    /// audited as a system action.
    pub async fn bootstrap_admin(&self, display_name: &str) -> Result<(Actor, Role)> {
        let admin = resolve_role(&self.roles, "admin").await?;
        let actor = self.catalog.create_actor(ActorKind::User, display_name).await?;

        let assignment = Assignment {
            actor_id: actor.id,
            role_id: admin.id,
            actee_id: ROOT_ACTEE_ID.to_string(),
        };
        self.record_grant(None, &assignment).await?;

        info!("Bootstrapped administrator {} ({})", actor.display_name, actor.id);
        Ok((actor, admin))
    }

    async fn record_grant(&self, acting: Option<i64>, assignment: &Assignment) -> Result<bool> {
        let mut tx = self.db.begin_write().await?;
        let created = self.assignments.grant(&mut tx, assignment).await?;
        self.audit
            .log(
                &mut tx,
                NewAuditEntry {
                    actor_id: acting,
                    action: AuditAction::AssignmentCreate,
                    acted_actor_id: assignment.actor_id,
                    actee_id: assignment.actee_id.clone(),
                    details: json!({
                        "roleId": assignment.role_id,
                        "grantedActeeId": assignment.actee_id,
                        "changed": created,
                    }),
                },
            )
            .await?;
        tx.commit().await?;
        Ok(created)
    }
}

/// Rows arrive ordered by form, so each form's rows are contiguous.
fn group_by_form(rows: Vec<FormAssignment>) -> Vec<FormSummary> {
    let mut summaries: Vec<FormSummary> = Vec::new();

    for row in rows {
        let starts_new_form = summaries
            .last()
            .map_or(true, |current| current.xml_form_id != row.xml_form_id);
        if starts_new_form {
            summaries.push(FormSummary {
                xml_form_id: row.xml_form_id.clone(),
                roles: Default::default(),
            });
        }

        if let (Some(role_id), Some(actor), Some(current)) =
            (row.role_id, row.actor, summaries.last_mut())
        {
            current.roles.entry(role_id).or_default().push(actor);
        }
    }

    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn actor(id: i64) -> Actor {
        Actor {
            id,
            kind: ActorKind::User,
            display_name: format!("actor {}", id),
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    fn row(form: &str, role_id: Option<i64>, actor_id: Option<i64>) -> FormAssignment {
        FormAssignment {
            xml_form_id: form.to_string(),
            role_id,
            actor: actor_id.map(actor),
        }
    }

    #[test]
    fn test_group_by_form() {
        let summaries = group_by_form(vec![
            row("a", Some(2), Some(1)),
            row("a", Some(2), Some(3)),
            row("a", Some(4), Some(1)),
            row("b", None, None),
            row("c", Some(2), Some(5)),
        ]);

        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[0].roles[&2].len(), 2);
        assert_eq!(summaries[0].roles[&4][0].id, 1);
        assert!(summaries[1].roles.is_empty());
        assert_eq!(summaries[2].xml_form_id, "c");
    }

    #[test]
    fn test_group_by_form_empty() {
        assert!(group_by_form(Vec::new()).is_empty());
    }
}
