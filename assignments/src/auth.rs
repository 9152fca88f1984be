//! Per-request authorization: the calling actor's roles checked against a
//! located resource.

use authz::types::{Action, Grant, Principal, Resource};
use authz::AuthzEngine;
use database::AssignmentStore;
use entities::{verbs, Actee, Actor, Role, Securable};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{Result, ServiceError};

/// Authorization context for one calling actor.
///
/// Every check loads the actor's roles on the resource and its ancestor
/// scopes, then evaluates them through the policy engine. Nothing is cached
/// between checks.
#[derive(Clone)]
pub struct Auth {
    actor: Actor,
    assignments: AssignmentStore,
    engine: Arc<AuthzEngine>,
}

impl Auth {
    pub fn new(actor: Actor, assignments: AssignmentStore, engine: Arc<AuthzEngine>) -> Self {
        Self {
            actor,
            assignments,
            engine,
        }
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    async fn grants_on(&self, actee: &Actee) -> Result<Vec<Grant>> {
        let held = self
            .assignments
            .roles_held_on(self.actor.id, &actee.scope_ids())
            .await?;

        Ok(held
            .into_iter()
            .map(|h| Grant::new(h.actee_id, h.role.verbs))
            .collect())
    }

    pub async fn can<R: Securable + Sync>(&self, verb: &str, resource: &R) -> Result<bool> {
        let actee = resource.actee();
        let grants = self.grants_on(&actee).await?;

        let allowed = self.engine.is_authorized(
            &Principal::actor(self.actor.id),
            &grants,
            &Action::new(verb),
            &Resource::from_actee(&actee),
        )?;
        debug!(
            "Actor {} {} {} on {}",
            self.actor.id,
            if allowed { "may" } else { "may not" },
            verb,
            actee.id
        );
        Ok(allowed)
    }

    /// Passes the resource through when the actor may perform `verb` on it.
    pub async fn can_or_reject<R: Securable + Sync>(&self, verb: &str, resource: R) -> Result<R> {
        if self.can(verb, &resource).await? {
            Ok(resource)
        } else {
            warn!(
                "Denied {} on {} to actor {}",
                verb,
                resource.actee_id(),
                self.actor.id
            );
            Err(ServiceError::PermissionDenied(format!(
                "{} on {}",
                verb,
                resource.actee_id()
            )))
        }
    }

    /// Both grant-time checks from one load of the actor's roles.
    ///
    /// `may_create` is `assignment.create` on the resource. `may_assign_role`
    /// is the escalation guard: the actor already holds every verb of `role`
    /// there.
    pub async fn can_grant<R: Securable + Sync>(
        &self,
        role: &Role,
        resource: &R,
    ) -> Result<GrantCheck> {
        let actee = resource.actee();
        let grants = self.grants_on(&actee).await?;

        let evaluator = self.engine.evaluator(
            &Principal::actor(self.actor.id),
            &grants,
            &Resource::from_actee(&actee),
        )?;
        let check = GrantCheck {
            may_create: evaluator.permits(&Action::new(verbs::ASSIGNMENT_CREATE))?,
            may_assign_role: evaluator.can_assign_role(&role.verbs)?,
        };
        if !check.may_assign_role {
            warn!(
                "Actor {} may not assign role {} on {}",
                self.actor.id, role.system, actee.id
            );
        }
        Ok(check)
    }
}

/// Outcome of [`Auth::can_grant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrantCheck {
    pub may_create: bool,
    pub may_assign_role: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::{initialize_database, Catalog, Database, DatabaseConfig};
    use entities::{ActorKind, Assignment, Root};
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        db: Arc<Database>,
        catalog: Catalog,
        store: AssignmentStore,
    }

    async fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let db = initialize_database(DatabaseConfig::new_with_path(dir.path().join("steward.db")))
            .await
            .unwrap();
        Fixture {
            _dir: dir,
            catalog: Catalog::new(db.clone()),
            store: AssignmentStore::new(db.clone()),
            db,
        }
    }

    impl Fixture {
        async fn assign(&self, actor_id: i64, role_id: i64, actee_id: String) {
            let mut tx = self.db.begin_write().await.unwrap();
            self.store
                .grant(&mut tx, &Assignment { actor_id, role_id, actee_id })
                .await
                .unwrap();
            tx.commit().await.unwrap();
        }

        fn auth(&self, actor: Actor) -> Auth {
            Auth::new(actor, self.store.clone(), Arc::new(AuthzEngine::new()))
        }
    }

    #[tokio::test]
    async fn test_project_role_reaches_forms() {
        let f = fixture().await;
        let project = f.catalog.create_project("Survey").await.unwrap();
        let form = f.catalog.create_form(project.id, "f1", "F1").await.unwrap();
        let other = f.catalog.create_project("Other").await.unwrap();
        let alice = f.catalog.create_actor(ActorKind::User, "Alice").await.unwrap();
        f.assign(alice.id, 4, project.actee_id()).await;

        let auth = f.auth(alice);
        assert!(auth.can(verbs::FORM_READ, &form).await.unwrap());
        assert!(!auth.can(verbs::ASSIGNMENT_LIST, &form).await.unwrap());
        assert!(!auth.can(verbs::FORM_READ, &other).await.unwrap());
        assert!(!auth.can(verbs::FORM_READ, &Root).await.unwrap());
    }

    #[tokio::test]
    async fn test_can_or_reject_passes_resource_through() {
        let f = fixture().await;
        let project = f.catalog.create_project("Survey").await.unwrap();
        let alice = f.catalog.create_actor(ActorKind::User, "Alice").await.unwrap();
        f.assign(alice.id, 3, project.actee_id()).await;

        let auth = f.auth(alice);
        let passed = auth
            .can_or_reject(verbs::ASSIGNMENT_LIST, project.clone())
            .await
            .unwrap();
        assert_eq!(passed, project);

        let err = auth
            .can_or_reject(verbs::PROJECT_DELETE, project)
            .await
            .unwrap_err();
        assert!(err.is_permission_denied());
    }

    #[tokio::test]
    async fn test_escalation_guard() {
        let f = fixture().await;
        let project = f.catalog.create_project("Survey").await.unwrap();
        let alice = f.catalog.create_actor(ActorKind::User, "Alice").await.unwrap();
        f.assign(alice.id, 3, project.actee_id()).await;

        let roles = database::RoleStore::new(f.db.clone());
        let admin = roles.get_by_system_name("admin").await.unwrap().unwrap();
        let viewer = roles.get_by_system_name("viewer").await.unwrap().unwrap();

        let auth = f.auth(alice);
        assert_eq!(
            auth.can_grant(&viewer, &project).await.unwrap(),
            GrantCheck {
                may_create: true,
                may_assign_role: true,
            }
        );
        assert_eq!(
            auth.can_grant(&admin, &project).await.unwrap(),
            GrantCheck {
                may_create: true,
                may_assign_role: false,
            }
        );
    }

    #[tokio::test]
    async fn test_grant_check_without_create_rights() {
        let f = fixture().await;
        let project = f.catalog.create_project("Survey").await.unwrap();
        let form = f.catalog.create_form(project.id, "f1", "F1").await.unwrap();
        let alice = f.catalog.create_actor(ActorKind::User, "Alice").await.unwrap();
        // viewer on the project: form.read reaches the form, assignment.create does not
        f.assign(alice.id, 4, project.actee_id()).await;

        let roles = database::RoleStore::new(f.db.clone());
        let pub_link = roles.get_by_system_name("pub-link").await.unwrap().unwrap();
        let app_user = roles.get_by_system_name("app-user").await.unwrap().unwrap();

        let auth = f.auth(alice);
        let check = auth.can_grant(&app_user, &form).await.unwrap();
        assert!(!check.may_create);
        assert!(!check.may_assign_role);

        let nobody = f.catalog.create_actor(ActorKind::User, "Nobody").await.unwrap();
        let check = f.auth(nobody).can_grant(&pub_link, &form).await.unwrap();
        assert_eq!(
            check,
            GrantCheck {
                may_create: false,
                may_assign_role: false,
            }
        );
    }

    #[tokio::test]
    async fn test_no_roles_denies_everything() {
        let f = fixture().await;
        let project = f.catalog.create_project("Survey").await.unwrap();
        let nobody = f.catalog.create_actor(ActorKind::User, "Nobody").await.unwrap();

        let auth = f.auth(nobody);
        for verb in verbs::ALL {
            assert!(!auth.can(verb, &project).await.unwrap());
        }
    }
}
