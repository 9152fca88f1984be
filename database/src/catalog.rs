//! Resource catalog: actors, projects, and forms.
//!
//! Lookups here never return soft-deleted records. Creating a project or form
//! registers its actee in the same transaction, so a located resource always
//! has a populated addressable identity.

use chrono::{DateTime, Utc};
use entities::{ActeeKind, Actor, ActorKind, Form, Project};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{Database, DatabaseError, Result, WriteTransaction};

#[derive(sqlx::FromRow)]
pub(crate) struct ActorRow {
    pub(crate) id: i64,
    pub(crate) kind: String,
    pub(crate) display_name: String,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<ActorRow> for Actor {
    type Error = DatabaseError;

    fn try_from(row: ActorRow) -> Result<Self> {
        Ok(Actor {
            id: row.id,
            kind: row.kind.parse::<ActorKind>()?,
            display_name: row.display_name,
            created_at: row.created_at,
            deleted_at: row.deleted_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: i64,
    name: String,
    actee_id: String,
    created_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Project {
            id: row.id,
            name: row.name,
            actee_id: row.actee_id,
            created_at: row.created_at,
            deleted_at: row.deleted_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct FormRow {
    id: i64,
    project_id: i64,
    xml_form_id: String,
    name: String,
    actee_id: String,
    project_actee_id: String,
    created_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<FormRow> for Form {
    fn from(row: FormRow) -> Self {
        Form {
            id: row.id,
            project_id: row.project_id,
            xml_form_id: row.xml_form_id,
            name: row.name,
            actee_id: row.actee_id,
            project_actee_id: row.project_actee_id,
            created_at: row.created_at,
            deleted_at: row.deleted_at,
        }
    }
}

const FORM_COLUMNS: &str = r#"
    f.id, f.project_id, f.xml_form_id, f.name, f.actee_id,
    p.actee_id AS project_actee_id, f.created_at, f.deleted_at
"#;

/// Existence-checked access to every securable resource and to actors.
#[derive(Debug, Clone)]
pub struct Catalog {
    db: Arc<Database>,
}

impl Catalog {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn create_actor(&self, kind: ActorKind, display_name: &str) -> Result<Actor> {
        let row = sqlx::query_as::<_, ActorRow>(
            r#"
            INSERT INTO actors (kind, display_name, created_at) VALUES (?, ?, ?)
            RETURNING id, kind, display_name, created_at, deleted_at
            "#,
        )
        .bind(kind.as_str())
        .bind(display_name)
        .bind(Utc::now())
        .fetch_one(self.db.pool())
        .await?;

        info!("Created {} actor with id: {}", kind, row.id);
        Actor::try_from(row)
    }

    /// A live actor by id.
    pub async fn get_actor(&self, id: i64) -> Result<Option<Actor>> {
        debug!("Looking up actor: {}", id);
        sqlx::query_as::<_, ActorRow>(
            r#"
            SELECT id, kind, display_name, created_at, deleted_at
            FROM actors WHERE id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?
        .map(Actor::try_from)
        .transpose()
    }

    pub async fn delete_actor(&self, id: i64) -> Result<()> {
        let result =
            sqlx::query("UPDATE actors SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
                .bind(Utc::now())
                .bind(id)
                .execute(self.db.pool())
                .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("actor {}", id)));
        }

        info!("Deleted actor with id: {}", id);
        Ok(())
    }

    pub async fn create_project(&self, name: &str) -> Result<Project> {
        let actee_id = Uuid::new_v4().to_string();
        let mut tx = self.db.begin_write().await?;

        register_actee(&mut tx, &actee_id, ActeeKind::Project).await?;
        let row = sqlx::query_as::<_, ProjectRow>(
            r#"
            INSERT INTO projects (name, actee_id, created_at) VALUES (?, ?, ?)
            RETURNING id, name, actee_id, created_at, deleted_at
            "#,
        )
        .bind(name)
        .bind(&actee_id)
        .bind(Utc::now())
        .fetch_one(tx.conn())
        .await?;

        tx.commit().await?;

        info!("Created project {} with actee: {}", row.id, actee_id);
        Ok(row.into())
    }

    /// A live project by id.
    pub async fn get_project(&self, id: i64) -> Result<Option<Project>> {
        debug!("Looking up project: {}", id);
        let row = sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT id, name, actee_id, created_at, deleted_at
            FROM projects WHERE id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(Project::from))
    }

    pub async fn delete_project(&self, id: i64) -> Result<()> {
        let result =
            sqlx::query("UPDATE projects SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
                .bind(Utc::now())
                .bind(id)
                .execute(self.db.pool())
                .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("project {}", id)));
        }

        info!("Deleted project with id: {}", id);
        Ok(())
    }

    pub async fn create_form(
        &self,
        project_id: i64,
        xml_form_id: &str,
        name: &str,
    ) -> Result<Form> {
        let actee_id = Uuid::new_v4().to_string();
        let mut tx = self.db.begin_write().await?;

        register_actee(&mut tx, &actee_id, ActeeKind::Form).await?;
        let form_id: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO forms (project_id, xml_form_id, name, actee_id, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(project_id)
        .bind(xml_form_id)
        .bind(name)
        .bind(&actee_id)
        .bind(Utc::now())
        .fetch_one(tx.conn())
        .await?;

        let row = sqlx::query_as::<_, FormRow>(&format!(
            "SELECT {} FROM forms f JOIN projects p ON p.id = f.project_id WHERE f.id = ?",
            FORM_COLUMNS
        ))
        .bind(form_id.0)
        .fetch_one(tx.conn())
        .await?;

        tx.commit().await?;

        info!("Created form {} in project {}", xml_form_id, project_id);
        Ok(row.into())
    }

    /// A live form in a live project.
    pub async fn get_form(&self, project_id: i64, xml_form_id: &str) -> Result<Option<Form>> {
        debug!("Looking up form: {}/{}", project_id, xml_form_id);
        let row = sqlx::query_as::<_, FormRow>(&format!(
            r#"
            SELECT {} FROM forms f JOIN projects p ON p.id = f.project_id
            WHERE f.project_id = ? AND f.xml_form_id = ?
              AND f.deleted_at IS NULL AND p.deleted_at IS NULL
            "#,
            FORM_COLUMNS
        ))
        .bind(project_id)
        .bind(xml_form_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(Form::from))
    }

    /// Live forms of a project, ordered by xml form id.
    pub async fn list_forms(&self, project_id: i64) -> Result<Vec<Form>> {
        let rows = sqlx::query_as::<_, FormRow>(&format!(
            r#"
            SELECT {} FROM forms f JOIN projects p ON p.id = f.project_id
            WHERE f.project_id = ? AND f.deleted_at IS NULL
            ORDER BY f.xml_form_id
            "#,
            FORM_COLUMNS
        ))
        .bind(project_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.into_iter().map(Form::from).collect())
    }

    pub async fn delete_form(&self, project_id: i64, xml_form_id: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE forms SET deleted_at = ?
            WHERE project_id = ? AND xml_form_id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(Utc::now())
        .bind(project_id)
        .bind(xml_form_id)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!(
                "form {}/{}",
                project_id, xml_form_id
            )));
        }

        info!("Deleted form {}/{}", project_id, xml_form_id);
        Ok(())
    }
}

async fn register_actee(tx: &mut WriteTransaction, id: &str, kind: ActeeKind) -> Result<()> {
    sqlx::query("INSERT INTO actees (id, kind) VALUES (?, ?)")
        .bind(id)
        .bind(kind.as_str())
        .execute(tx.conn())
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_database;
    use entities::Securable;

    #[tokio::test]
    async fn test_actor_lifecycle() {
        let (_dir, db) = test_database().await;
        let catalog = Catalog::new(db);

        let actor = catalog.create_actor(ActorKind::User, "Alice").await.unwrap();
        assert_eq!(actor.display_name, "Alice");
        assert_eq!(catalog.get_actor(actor.id).await.unwrap(), Some(actor.clone()));

        catalog.delete_actor(actor.id).await.unwrap();
        assert!(catalog.get_actor(actor.id).await.unwrap().is_none());
        assert!(matches!(
            catalog.delete_actor(actor.id).await,
            Err(DatabaseError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_project_has_addressable_identity() {
        let (_dir, db) = test_database().await;
        let catalog = Catalog::new(db);

        let project = catalog.create_project("Water Survey").await.unwrap();
        assert!(!project.actee_id.is_empty());

        let found = catalog.get_project(project.id).await.unwrap().unwrap();
        assert_eq!(found.actee_id(), project.actee_id);
    }

    #[tokio::test]
    async fn test_form_carries_project_actee() {
        let (_dir, db) = test_database().await;
        let catalog = Catalog::new(db);

        let project = catalog.create_project("Water Survey").await.unwrap();
        let form = catalog
            .create_form(project.id, "household", "Household")
            .await
            .unwrap();

        assert_eq!(form.project_actee_id, project.actee_id);
        assert_eq!(
            form.actee().scope_ids(),
            vec![
                form.actee_id.clone(),
                project.actee_id.clone(),
                "project".to_string(),
                "form".to_string(),
                "*".to_string()
            ]
        );

        let found = catalog.get_form(project.id, "household").await.unwrap();
        assert_eq!(found, Some(form));
    }

    #[tokio::test]
    async fn test_deleted_resources_do_not_resolve() {
        let (_dir, db) = test_database().await;
        let catalog = Catalog::new(db);

        let project = catalog.create_project("Water Survey").await.unwrap();
        catalog.create_form(project.id, "a", "A").await.unwrap();
        catalog.create_form(project.id, "b", "B").await.unwrap();

        catalog.delete_form(project.id, "a").await.unwrap();
        assert!(catalog.get_form(project.id, "a").await.unwrap().is_none());

        let forms = catalog.list_forms(project.id).await.unwrap();
        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0].xml_form_id, "b");

        catalog.delete_project(project.id).await.unwrap();
        assert!(catalog.get_project(project.id).await.unwrap().is_none());
        assert!(catalog.get_form(project.id, "b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_form_rejected() {
        let (_dir, db) = test_database().await;
        let catalog = Catalog::new(db);

        let project = catalog.create_project("Water Survey").await.unwrap();
        catalog.create_form(project.id, "a", "A").await.unwrap();
        assert!(catalog.create_form(project.id, "a", "Again").await.is_err());
    }
}
