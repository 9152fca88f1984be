use entities::Role;
use std::sync::Arc;
use tracing::debug;

use crate::{Database, Result};

#[derive(sqlx::FromRow)]
struct RoleRow {
    id: i64,
    name: String,
    system: String,
    verbs: String,
}

impl TryFrom<RoleRow> for Role {
    type Error = crate::DatabaseError;

    fn try_from(row: RoleRow) -> Result<Self> {
        Ok(Role {
            id: row.id,
            name: row.name,
            system: row.system,
            verbs: serde_json::from_str(&row.verbs)?,
        })
    }
}

/// Read-only access to the seeded role catalog.
#[derive(Debug, Clone)]
pub struct RoleStore {
    db: Arc<Database>,
}

impl RoleStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Role>> {
        debug!("Looking up role by id: {}", id);
        sqlx::query_as::<_, RoleRow>("SELECT id, name, system, verbs FROM roles WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?
            .map(Role::try_from)
            .transpose()
    }

    pub async fn get_by_system_name(&self, system: &str) -> Result<Option<Role>> {
        debug!("Looking up role by system name: {}", system);
        sqlx::query_as::<_, RoleRow>(
            "SELECT id, name, system, verbs FROM roles WHERE system = ?",
        )
        .bind(system)
        .fetch_optional(self.db.pool())
        .await?
        .map(Role::try_from)
        .transpose()
    }

    pub async fn list(&self) -> Result<Vec<Role>> {
        sqlx::query_as::<_, RoleRow>("SELECT id, name, system, verbs FROM roles ORDER BY id")
            .fetch_all(self.db.pool())
            .await?
            .into_iter()
            .map(Role::try_from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_database;
    use entities::verbs;

    #[tokio::test]
    async fn test_lookup_by_id_and_name_agree() {
        let (_dir, db) = test_database().await;
        let roles = RoleStore::new(db);

        let by_name = roles.get_by_system_name("app-user").await.unwrap().unwrap();
        let by_id = roles.get_by_id(by_name.id).await.unwrap().unwrap();
        assert_eq!(by_name, by_id);
        assert!(by_name.grants(verbs::SUBMISSION_CREATE));
    }

    #[tokio::test]
    async fn test_missing_roles() {
        let (_dir, db) = test_database().await;
        let roles = RoleStore::new(db);

        assert!(roles.get_by_id(999).await.unwrap().is_none());
        assert!(roles.get_by_system_name("App-User").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_id() {
        let (_dir, db) = test_database().await;
        let roles = RoleStore::new(db).list().await.unwrap();

        assert_eq!(roles.len(), 6);
        assert_eq!(roles[0].system, "admin");
        assert!(roles.windows(2).all(|w| w[0].id < w[1].id));
    }
}
