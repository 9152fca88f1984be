//! The assignment store: sole owner of the (actor, role, actee) relation.
//!
//! Rows are keyed on the addressable identity alone, so one table serves
//! every resource type. The triple is the primary key: `grant` is an
//! idempotent insert and `revoke` an idempotent delete, and both run inside a
//! [`WriteTransaction`] supplied by the caller so the audit record lands in
//! the same commit.

use chrono::{DateTime, Utc};
use entities::{Actor, Assignment, AssignmentView, ExtendedAssignment, QueryOptions, Role};
use std::sync::Arc;
use tracing::{debug, info};

use crate::catalog::ActorRow;
use crate::{Database, DatabaseError, Result, WriteTransaction};

/// One row of a project-wide aggregation. Forms without assignments appear
/// once with `role_id` and `actor` empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormAssignment {
    pub xml_form_id: String,
    pub role_id: Option<i64>,
    pub actor: Option<Actor>,
}

/// A role held by an actor on one scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeldRole {
    pub actee_id: String,
    pub role: Role,
}

#[derive(sqlx::FromRow)]
struct ActorAssignmentRow {
    role_id: i64,
    #[sqlx(flatten)]
    actor: ActorRow,
}

#[derive(sqlx::FromRow)]
struct FormAssignmentRow {
    xml_form_id: String,
    role_id: Option<i64>,
    actor_id: Option<i64>,
    kind: Option<String>,
    display_name: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

impl TryFrom<FormAssignmentRow> for FormAssignment {
    type Error = DatabaseError;

    fn try_from(row: FormAssignmentRow) -> Result<Self> {
        let actor = match (row.actor_id, row.kind, row.display_name, row.created_at) {
            (Some(id), Some(kind), Some(display_name), Some(created_at)) => {
                Some(Actor::try_from(ActorRow {
                    id,
                    kind,
                    display_name,
                    created_at,
                    deleted_at: None,
                })?)
            }
            _ => None,
        };

        Ok(FormAssignment {
            xml_form_id: row.xml_form_id,
            role_id: actor.as_ref().and(row.role_id),
            actor,
        })
    }
}

#[derive(sqlx::FromRow)]
struct HeldRoleRow {
    actee_id: String,
    id: i64,
    name: String,
    system: String,
    verbs: String,
}

#[derive(Debug, Clone)]
pub struct AssignmentStore {
    db: Arc<Database>,
}

impl AssignmentStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Every assignment on one actee, in the requested projection.
    pub async fn list_by_actee(
        &self,
        actee_id: &str,
        options: QueryOptions,
    ) -> Result<Vec<AssignmentView>> {
        debug!("Listing assignments on actee: {}", actee_id);
        let rows = sqlx::query_as::<_, ActorAssignmentRow>(
            r#"
            SELECT a.role_id, ac.id, ac.kind, ac.display_name, ac.created_at, ac.deleted_at
            FROM assignments a
            JOIN actors ac ON ac.id = a.actor_id
            WHERE a.actee_id = ? AND ac.deleted_at IS NULL
            ORDER BY a.role_id, ac.id
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(actee_id)
        .bind(options.limit.unwrap_or(-1))
        .bind(options.offset.unwrap_or(0))
        .fetch_all(self.db.pool())
        .await?;

        rows.into_iter()
            .map(|row| {
                let actor = Actor::try_from(row.actor)?;
                Ok(if options.extended {
                    AssignmentView::Extended(ExtendedAssignment {
                        actor,
                        role_id: row.role_id,
                    })
                } else {
                    AssignmentView::Minimal {
                        actor_id: actor.id,
                        role_id: row.role_id,
                    }
                })
            })
            .collect()
    }

    /// Assignments of one role on one actee, with actors joined in.
    pub async fn list_by_actee_and_role(
        &self,
        actee_id: &str,
        role_id: i64,
    ) -> Result<Vec<ExtendedAssignment>> {
        debug!("Listing role {} assignments on actee: {}", role_id, actee_id);
        let rows = sqlx::query_as::<_, ActorAssignmentRow>(
            r#"
            SELECT a.role_id, ac.id, ac.kind, ac.display_name, ac.created_at, ac.deleted_at
            FROM assignments a
            JOIN actors ac ON ac.id = a.actor_id
            WHERE a.actee_id = ? AND a.role_id = ? AND ac.deleted_at IS NULL
            ORDER BY ac.id
            "#,
        )
        .bind(actee_id)
        .bind(role_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(ExtendedAssignment {
                    role_id: row.role_id,
                    actor: Actor::try_from(row.actor)?,
                })
            })
            .collect()
    }

    /// Assignments on every live form of a project, read in one statement.
    pub async fn list_across_forms_in_project(
        &self,
        project_id: i64,
    ) -> Result<Vec<FormAssignment>> {
        self.across_forms(project_id, None).await
    }

    /// As [`Self::list_across_forms_in_project`], with the role filter applied
    /// in the join so only matching rows are read.
    pub async fn list_across_forms_in_project_by_role(
        &self,
        project_id: i64,
        role_id: i64,
    ) -> Result<Vec<FormAssignment>> {
        self.across_forms(project_id, Some(role_id)).await
    }

    async fn across_forms(
        &self,
        project_id: i64,
        role_id: Option<i64>,
    ) -> Result<Vec<FormAssignment>> {
        debug!("Aggregating form assignments for project: {}", project_id);
        let rows = sqlx::query_as::<_, FormAssignmentRow>(
            r#"
            SELECT f.xml_form_id, a.role_id, ac.id AS actor_id, ac.kind,
                   ac.display_name, ac.created_at
            FROM forms f
            LEFT JOIN assignments a
                   ON a.actee_id = f.actee_id AND (? IS NULL OR a.role_id = ?)
            LEFT JOIN actors ac
                   ON ac.id = a.actor_id AND ac.deleted_at IS NULL
            WHERE f.project_id = ? AND f.deleted_at IS NULL
            ORDER BY f.xml_form_id, a.role_id, ac.id
            "#,
        )
        .bind(role_id)
        .bind(role_id)
        .bind(project_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.into_iter().map(FormAssignment::try_from).collect()
    }

    /// Every role the actor holds on any of the given scopes.
    pub async fn roles_held_on(
        &self,
        actor_id: i64,
        scope_ids: &[String],
    ) -> Result<Vec<HeldRole>> {
        if scope_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; scope_ids.len()].join(", ");
        let sql = format!(
            r#"
            SELECT a.actee_id, r.id, r.name, r.system, r.verbs
            FROM assignments a
            JOIN roles r ON r.id = a.role_id
            WHERE a.actor_id = ? AND a.actee_id IN ({})
            ORDER BY a.actee_id, r.id
            "#,
            placeholders
        );

        let mut query = sqlx::query_as::<_, HeldRoleRow>(&sql).bind(actor_id);
        for scope in scope_ids {
            query = query.bind(scope);
        }

        query
            .fetch_all(self.db.pool())
            .await?
            .into_iter()
            .map(|row| {
                Ok(HeldRole {
                    actee_id: row.actee_id,
                    role: Role {
                        id: row.id,
                        name: row.name,
                        system: row.system,
                        verbs: serde_json::from_str(&row.verbs)?,
                    },
                })
            })
            .collect()
    }

    /// The whole relation, ordered by key.
    pub async fn all(&self) -> Result<Vec<Assignment>> {
        let rows: Vec<(i64, i64, String)> = sqlx::query_as(
            "SELECT actor_id, role_id, actee_id FROM assignments \
             ORDER BY actor_id, role_id, actee_id",
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|(actor_id, role_id, actee_id)| Assignment {
                actor_id,
                role_id,
                actee_id,
            })
            .collect())
    }

    /// Idempotent insert. Returns whether a new row was created.
    pub async fn grant(&self, tx: &mut WriteTransaction, assignment: &Assignment) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO assignments (actor_id, role_id, actee_id, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (actor_id, role_id, actee_id) DO NOTHING
            "#,
        )
        .bind(assignment.actor_id)
        .bind(assignment.role_id)
        .bind(&assignment.actee_id)
        .bind(Utc::now())
        .execute(tx.conn())
        .await?;

        let created = result.rows_affected() > 0;
        info!(
            "Granted role {} to actor {} on {} (new: {})",
            assignment.role_id, assignment.actor_id, assignment.actee_id, created
        );
        Ok(created)
    }

    /// Idempotent delete. Returns whether a row existed.
    pub async fn revoke(&self, tx: &mut WriteTransaction, assignment: &Assignment) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM assignments WHERE actor_id = ? AND role_id = ? AND actee_id = ?",
        )
        .bind(assignment.actor_id)
        .bind(assignment.role_id)
        .bind(&assignment.actee_id)
        .execute(tx.conn())
        .await?;

        let existed = result.rows_affected() > 0;
        info!(
            "Revoked role {} from actor {} on {} (existed: {})",
            assignment.role_id, assignment.actor_id, assignment.actee_id, existed
        );
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_database;
    use crate::Catalog;
    use entities::{ActorKind, Securable, ROOT_ACTEE_ID};

    async fn grant(store: &AssignmentStore, db: &Database, assignment: &Assignment) -> bool {
        let mut tx = db.begin_write().await.unwrap();
        let created = store.grant(&mut tx, assignment).await.unwrap();
        tx.commit().await.unwrap();
        created
    }

    async fn revoke(store: &AssignmentStore, db: &Database, assignment: &Assignment) -> bool {
        let mut tx = db.begin_write().await.unwrap();
        let existed = store.revoke(&mut tx, assignment).await.unwrap();
        tx.commit().await.unwrap();
        existed
    }

    #[tokio::test]
    async fn test_grant_is_idempotent() {
        let (_dir, db) = test_database().await;
        let catalog = Catalog::new(db.clone());
        let store = AssignmentStore::new(db.clone());

        let actor = catalog.create_actor(ActorKind::User, "Alice").await.unwrap();
        let assignment = Assignment {
            actor_id: actor.id,
            role_id: 1,
            actee_id: ROOT_ACTEE_ID.to_string(),
        };

        assert!(grant(&store, &db, &assignment).await);
        assert!(!grant(&store, &db, &assignment).await);
        assert_eq!(store.all().await.unwrap(), vec![assignment]);
    }

    #[tokio::test]
    async fn test_revoke_reports_existence() {
        let (_dir, db) = test_database().await;
        let catalog = Catalog::new(db.clone());
        let store = AssignmentStore::new(db.clone());

        let actor = catalog.create_actor(ActorKind::User, "Alice").await.unwrap();
        let assignment = Assignment {
            actor_id: actor.id,
            role_id: 4,
            actee_id: ROOT_ACTEE_ID.to_string(),
        };

        assert!(!revoke(&store, &db, &assignment).await);
        grant(&store, &db, &assignment).await;
        assert!(revoke(&store, &db, &assignment).await);
        assert!(store.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_actee_rejected() {
        let (_dir, db) = test_database().await;
        let catalog = Catalog::new(db.clone());
        let store = AssignmentStore::new(db.clone());

        let actor = catalog.create_actor(ActorKind::User, "Alice").await.unwrap();
        let mut tx = db.begin_write().await.unwrap();
        let result = store
            .grant(
                &mut tx,
                &Assignment {
                    actor_id: actor.id,
                    role_id: 1,
                    actee_id: "no-such-actee".into(),
                },
            )
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_listing_projections_and_paging() {
        let (_dir, db) = test_database().await;
        let catalog = Catalog::new(db.clone());
        let store = AssignmentStore::new(db.clone());

        let project = catalog.create_project("Survey").await.unwrap();
        let alice = catalog.create_actor(ActorKind::User, "Alice").await.unwrap();
        let bob = catalog.create_actor(ActorKind::User, "Bob").await.unwrap();
        for (actor, role) in [(&alice, 3), (&bob, 4), (&alice, 4)] {
            grant(
                &store,
                &db,
                &Assignment {
                    actor_id: actor.id,
                    role_id: role,
                    actee_id: project.actee_id(),
                },
            )
            .await;
        }

        let minimal = store
            .list_by_actee(&project.actee_id, QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(minimal.len(), 3);
        assert!(matches!(minimal[0], AssignmentView::Minimal { role_id: 3, .. }));

        let extended = store
            .list_by_actee(&project.actee_id, QueryOptions::extended())
            .await
            .unwrap();
        match &extended[0] {
            AssignmentView::Extended(e) => assert_eq!(e.actor.display_name, "Alice"),
            other => panic!("expected extended view, got {:?}", other),
        }

        let page = store
            .list_by_actee(
                &project.actee_id,
                QueryOptions::default().with_paging(Some(1), Some(1)),
            )
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].role_id(), 4);

        let viewers = store
            .list_by_actee_and_role(&project.actee_id, 4)
            .await
            .unwrap();
        let names: Vec<_> = viewers.iter().map(|a| a.actor.display_name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bob"]);
    }

    #[tokio::test]
    async fn test_deleted_actors_hidden_from_listings() {
        let (_dir, db) = test_database().await;
        let catalog = Catalog::new(db.clone());
        let store = AssignmentStore::new(db.clone());

        let alice = catalog.create_actor(ActorKind::User, "Alice").await.unwrap();
        grant(
            &store,
            &db,
            &Assignment {
                actor_id: alice.id,
                role_id: 4,
                actee_id: ROOT_ACTEE_ID.into(),
            },
        )
        .await;
        catalog.delete_actor(alice.id).await.unwrap();

        let listed = store
            .list_by_actee(ROOT_ACTEE_ID, QueryOptions::default())
            .await
            .unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn test_aggregation_includes_empty_forms() {
        let (_dir, db) = test_database().await;
        let catalog = Catalog::new(db.clone());
        let store = AssignmentStore::new(db.clone());

        let project = catalog.create_project("Survey").await.unwrap();
        let f1 = catalog.create_form(project.id, "f1", "F1").await.unwrap();
        let f2 = catalog.create_form(project.id, "f2", "F2").await.unwrap();
        catalog.create_form(project.id, "f3", "F3").await.unwrap();
        let a1 = catalog.create_actor(ActorKind::User, "A1").await.unwrap();
        let a2 = catalog.create_actor(ActorKind::User, "A2").await.unwrap();

        for (actor, form, role) in [(&a1, &f1, 2), (&a2, &f2, 2), (&a2, &f2, 4)] {
            grant(
                &store,
                &db,
                &Assignment {
                    actor_id: actor.id,
                    role_id: role,
                    actee_id: form.actee_id(),
                },
            )
            .await;
        }

        let rows = store.list_across_forms_in_project(project.id).await.unwrap();
        let summary: Vec<_> = rows
            .iter()
            .map(|r| (r.xml_form_id.as_str(), r.role_id, r.actor.as_ref().map(|a| a.id)))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("f1", Some(2), Some(a1.id)),
                ("f2", Some(2), Some(a2.id)),
                ("f2", Some(4), Some(a2.id)),
                ("f3", None, None),
            ]
        );

        let filtered = store
            .list_across_forms_in_project_by_role(project.id, 4)
            .await
            .unwrap();
        let summary: Vec<_> = filtered
            .iter()
            .map(|r| (r.xml_form_id.as_str(), r.actor.as_ref().map(|a| a.id)))
            .collect();
        assert_eq!(
            summary,
            vec![("f1", None), ("f2", Some(a2.id)), ("f3", None)]
        );
    }

    #[tokio::test]
    async fn test_roles_held_on_scopes() {
        let (_dir, db) = test_database().await;
        let catalog = Catalog::new(db.clone());
        let store = AssignmentStore::new(db.clone());

        let project = catalog.create_project("Survey").await.unwrap();
        let form = catalog.create_form(project.id, "f1", "F1").await.unwrap();
        let alice = catalog.create_actor(ActorKind::User, "Alice").await.unwrap();
        grant(
            &store,
            &db,
            &Assignment {
                actor_id: alice.id,
                role_id: 3,
                actee_id: project.actee_id(),
            },
        )
        .await;

        let held = store
            .roles_held_on(alice.id, &form.actee().scope_ids())
            .await
            .unwrap();
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].actee_id, project.actee_id);
        assert_eq!(held[0].role.system, "manager");

        assert!(store.roles_held_on(alice.id, &[]).await.unwrap().is_empty());
    }
}
