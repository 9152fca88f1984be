use crate::{Database, Result};
use entities::{verbs, ActeeKind, ROOT_ACTEE_ID};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Database initialization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    pub database_path: PathBuf,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// How long a connection waits on a locked database, in seconds
    pub busy_timeout_secs: u64,
    /// Whether to create tables and seed roles on initialization
    pub create_tables: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data/steward.db"),
            max_connections: 5,
            busy_timeout_secs: 5,
            create_tables: true,
        }
    }
}

impl DatabaseConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new database configuration with a specific database path
    pub fn new_with_path(database_path: PathBuf) -> Self {
        Self {
            database_path,
            ..Self::default()
        }
    }

    pub fn with_database_path(mut self, path: PathBuf) -> Self {
        self.database_path = path;
        self
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_create_tables(mut self, create: bool) -> Self {
        self.create_tables = create;
        self
    }
}

/// Initialize the database with the given configuration
pub async fn initialize_database(config: DatabaseConfig) -> Result<Arc<Database>> {
    info!("Initializing database with configuration");

    let db = Database::connect(&config).await?;

    if config.create_tables {
        create_tables(&db).await?;
        seed_actees(&db).await?;
        seed_roles(&db).await?;
    }

    Ok(Arc::new(db))
}

/// Create every table Steward uses. Safe to run repeatedly.
pub async fn create_tables(db: &Database) -> Result<()> {
    info!("Creating tables");

    let statements = [
        r#"
        CREATE TABLE IF NOT EXISTS actees (
            id TEXT PRIMARY KEY,
            kind TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS actors (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            kind TEXT NOT NULL,
            display_name TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL,
            deleted_at TIMESTAMP
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS roles (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            system TEXT NOT NULL UNIQUE,
            verbs TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            actee_id TEXT NOT NULL UNIQUE REFERENCES actees(id),
            created_at TIMESTAMP NOT NULL,
            deleted_at TIMESTAMP
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS forms (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id INTEGER NOT NULL REFERENCES projects(id),
            xml_form_id TEXT NOT NULL,
            name TEXT NOT NULL,
            actee_id TEXT NOT NULL UNIQUE REFERENCES actees(id),
            created_at TIMESTAMP NOT NULL,
            deleted_at TIMESTAMP,
            UNIQUE (project_id, xml_form_id)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS assignments (
            actor_id INTEGER NOT NULL REFERENCES actors(id),
            role_id INTEGER NOT NULL REFERENCES roles(id),
            actee_id TEXT NOT NULL REFERENCES actees(id),
            created_at TIMESTAMP NOT NULL,
            PRIMARY KEY (actor_id, role_id, actee_id)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS audits (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            actor_id INTEGER,
            action TEXT NOT NULL,
            acted_actor_id INTEGER NOT NULL,
            actee_id TEXT NOT NULL,
            details TEXT NOT NULL,
            logged_at TEXT NOT NULL,
            previous_hash TEXT NOT NULL,
            entry_hash TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            token TEXT PRIMARY KEY,
            actor_id INTEGER NOT NULL REFERENCES actors(id),
            created_at TIMESTAMP NOT NULL,
            expires_at INTEGER NOT NULL
        )
        "#,
        "CREATE INDEX IF NOT EXISTS idx_assignments_actee_role ON assignments(actee_id, role_id)",
        "CREATE INDEX IF NOT EXISTS idx_forms_project ON forms(project_id)",
        "CREATE INDEX IF NOT EXISTS idx_audits_actee ON audits(actee_id)",
        "CREATE INDEX IF NOT EXISTS idx_sessions_expiry ON sessions(expires_at)",
    ];

    for sql in statements {
        db.execute_raw(sql).await?;
    }

    Ok(())
}

/// The root and species actees exist from the start.
async fn seed_actees(db: &Database) -> Result<()> {
    let fixed = [
        (ROOT_ACTEE_ID, ActeeKind::Root),
        (ActeeKind::Project.as_str(), ActeeKind::Species),
        (ActeeKind::Form.as_str(), ActeeKind::Species),
    ];

    for (id, kind) in fixed {
        sqlx::query("INSERT OR IGNORE INTO actees (id, kind) VALUES (?, ?)")
            .bind(id)
            .bind(kind.as_str())
            .execute(db.pool())
            .await?;
    }

    Ok(())
}

/// The fixed role catalog as (id, name, system name, verbs).
pub fn default_roles() -> Vec<(i64, &'static str, &'static str, Vec<&'static str>)> {
    vec![
        (1, "Administrator", "admin", verbs::ALL.to_vec()),
        (
            2,
            "App User",
            "app-user",
            vec![verbs::FORM_READ, verbs::SUBMISSION_CREATE],
        ),
        (
            3,
            "Project Manager",
            "manager",
            vec![
                verbs::ASSIGNMENT_LIST,
                verbs::ASSIGNMENT_CREATE,
                verbs::ASSIGNMENT_DELETE,
                verbs::PROJECT_READ,
                verbs::PROJECT_UPDATE,
                verbs::FORM_LIST,
                verbs::FORM_READ,
                verbs::FORM_CREATE,
                verbs::FORM_UPDATE,
                verbs::FORM_DELETE,
                verbs::SUBMISSION_LIST,
                verbs::SUBMISSION_READ,
                verbs::SUBMISSION_CREATE,
                verbs::SUBMISSION_UPDATE,
            ],
        ),
        (
            4,
            "Project Viewer",
            "viewer",
            vec![
                verbs::PROJECT_READ,
                verbs::FORM_LIST,
                verbs::FORM_READ,
                verbs::SUBMISSION_READ,
                verbs::SUBMISSION_LIST,
            ],
        ),
        (
            5,
            "Data Collector",
            "formfill",
            vec![
                verbs::PROJECT_READ,
                verbs::FORM_LIST,
                verbs::FORM_READ,
                verbs::SUBMISSION_CREATE,
            ],
        ),
        (
            6,
            "Public Link",
            "pub-link",
            vec![verbs::FORM_READ, verbs::SUBMISSION_CREATE],
        ),
    ]
}

/// Insert default roles if they don't exist
async fn seed_roles(db: &Database) -> Result<()> {
    for (id, name, system, role_verbs) in default_roles() {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO roles (id, name, system, verbs) VALUES (?, ?, ?, ?)",
        )
        .bind(id)
        .bind(name)
        .bind(system)
        .bind(serde_json::to_string(&role_verbs)?)
        .execute(db.pool())
        .await?;

        if result.rows_affected() > 0 {
            info!("Created default role: {}", system);
        }
    }

    Ok(())
}
