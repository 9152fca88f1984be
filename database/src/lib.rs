use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite, SqliteConnection, Transaction};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

pub mod assignments;
pub mod audit;
pub mod catalog;
pub mod error;
pub mod init;
pub mod roles;

pub use assignments::{AssignmentStore, FormAssignment, HeldRole};
pub use audit::{AuditTrail, NewAuditEntry, GENESIS_HASH};
pub use catalog::Catalog;
pub use error::{DatabaseError, Result};
pub use init::{initialize_database, DatabaseConfig};
pub use roles::RoleStore;

/// Database connection pool plus the lock that serializes mutations.
///
/// Reads go straight to the pool. Every mutation of the assignment relation
/// and the audit trail goes through [`Database::begin_write`], which holds the
/// process-wide write lock until the transaction commits or is dropped.
#[derive(Debug, Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
    write_lock: Arc<Mutex<()>>,
}

impl Database {
    /// Open (creating if missing) the SQLite file named in `config`.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("Connecting to database at: {:?}", config.database_path);

        let options = SqliteConnectOptions::new()
            .filename(&config.database_path)
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(config.busy_timeout_secs));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        debug!("Database connection established");

        Ok(Self {
            pool,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Start a serialized write transaction.
    ///
    /// Dropping the returned value without calling
    /// [`WriteTransaction::commit`] rolls every statement back.
    pub async fn begin_write(&self) -> Result<WriteTransaction> {
        let guard = self.write_lock.clone().lock_owned().await;
        let tx = self.pool.begin().await?;
        Ok(WriteTransaction { tx, _guard: guard })
    }

    /// Check if a table exists
    pub async fn table_exists(&self, table_name: &str) -> Result<bool> {
        let result: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?")
                .bind(table_name)
                .fetch_one(&self.pool)
                .await?;

        Ok(result.0 > 0)
    }

    /// Execute raw SQL (for table creation, etc.)
    pub async fn execute_raw(&self, sql: &str) -> Result<()> {
        sqlx::query(sql).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database connection closed");
    }
}

/// An open transaction holding the write lock.
pub struct WriteTransaction {
    // Dropped before the guard so rollback is queued while the lock is held.
    tx: Transaction<'static, Sqlite>,
    _guard: OwnedMutexGuard<()>,
}

impl WriteTransaction {
    pub(crate) fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    pub async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::test_database;

    #[tokio::test]
    async fn test_database_connection() {
        let (_dir, db) = test_database().await;
        assert!(db.pool().acquire().await.is_ok());
    }

    #[tokio::test]
    async fn test_table_exists() {
        let (_dir, db) = test_database().await;

        db.execute_raw("CREATE TABLE test_table (id INTEGER PRIMARY KEY)")
            .await
            .unwrap();

        assert!(db.table_exists("test_table").await.unwrap());
        assert!(!db.table_exists("non_existent_table").await.unwrap());
    }

    #[tokio::test]
    async fn test_dropped_write_transaction_rolls_back() {
        let (_dir, db) = test_database().await;
        db.execute_raw("CREATE TABLE scratch (id INTEGER PRIMARY KEY)")
            .await
            .unwrap();

        {
            let mut tx = db.begin_write().await.unwrap();
            sqlx::query("INSERT INTO scratch (id) VALUES (1)")
                .execute(tx.conn())
                .await
                .unwrap();
        }

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM scratch")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count.0, 0);

        // the lock was released with the dropped transaction
        let tx = db.begin_write().await.unwrap();
        tx.commit().await.unwrap();
    }
}
