//! Append-only, hash-chained audit trail for assignment changes.
//!
//! Each record stores the hash of its predecessor and a SHA-256 over its own
//! stored columns, so any edit or deletion in the middle of the trail breaks
//! [`AuditTrail::verify_chain`]. Records are written through the caller's
//! [`WriteTransaction`]; the chain head is read inside that transaction, and
//! the write lock keeps two writers from forking the chain.

use chrono::{DateTime, SecondsFormat, Utc};
use entities::{AuditAction, AuditRecord};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::{Database, DatabaseError, Result, WriteTransaction};

/// Previous hash of the first record in the chain.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// A record about to be appended.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    /// Acting actor; `None` for system actions
    pub actor_id: Option<i64>,
    pub action: AuditAction,
    pub acted_actor_id: i64,
    pub actee_id: String,
    pub details: serde_json::Value,
}

#[derive(sqlx::FromRow)]
struct AuditRow {
    seq: i64,
    id: String,
    actor_id: Option<i64>,
    action: String,
    acted_actor_id: i64,
    actee_id: String,
    details: String,
    logged_at: String,
    previous_hash: String,
    entry_hash: String,
}

impl AuditRow {
    fn calculate_hash(&self) -> String {
        entry_hash(
            &self.id,
            &self.logged_at,
            self.actor_id,
            &self.action,
            self.acted_actor_id,
            &self.actee_id,
            &self.details,
            &self.previous_hash,
        )
    }
}

impl TryFrom<AuditRow> for AuditRecord {
    type Error = DatabaseError;

    fn try_from(row: AuditRow) -> Result<Self> {
        let logged_at = DateTime::parse_from_rfc3339(&row.logged_at)
            .map_err(|e| DatabaseError::Decode(format!("logged_at: {}", e)))?
            .with_timezone(&Utc);

        Ok(AuditRecord {
            id: row.id,
            seq: row.seq,
            actor_id: row.actor_id,
            action: row.action.parse::<AuditAction>()?,
            acted_actor_id: row.acted_actor_id,
            details: serde_json::from_str(&row.details)?,
            logged_at,
            previous_hash: row.previous_hash,
            entry_hash: row.entry_hash,
        })
    }
}

#[allow(clippy::too_many_arguments)]
fn entry_hash(
    id: &str,
    logged_at: &str,
    actor_id: Option<i64>,
    action: &str,
    acted_actor_id: i64,
    actee_id: &str,
    details: &str,
    previous_hash: &str,
) -> String {
    let mut hasher = Sha256::new();

    hasher.update(id.as_bytes());
    hasher.update(logged_at.as_bytes());
    match actor_id {
        Some(actor_id) => hasher.update(actor_id.to_string().as_bytes()),
        None => hasher.update(b"system"),
    }
    hasher.update(action.as_bytes());
    hasher.update(acted_actor_id.to_string().as_bytes());
    hasher.update(actee_id.as_bytes());
    hasher.update(details.as_bytes());
    hasher.update(previous_hash.as_bytes());

    hex::encode(hasher.finalize())
}

const AUDIT_COLUMNS: &str = "seq, id, actor_id, action, acted_actor_id, actee_id, details, \
                             logged_at, previous_hash, entry_hash";

#[derive(Debug, Clone)]
pub struct AuditTrail {
    db: Arc<Database>,
}

impl AuditTrail {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Append a record inside the caller's transaction. Nothing is visible
    /// until that transaction commits.
    pub async fn log(
        &self,
        tx: &mut WriteTransaction,
        entry: NewAuditEntry,
    ) -> Result<AuditRecord> {
        let previous_hash: Option<(String,)> =
            sqlx::query_as("SELECT entry_hash FROM audits ORDER BY seq DESC LIMIT 1")
                .fetch_optional(tx.conn())
                .await?;
        let previous_hash = previous_hash
            .map(|(hash,)| hash)
            .unwrap_or_else(|| GENESIS_HASH.to_string());

        let id = ulid::Ulid::new().to_string();
        let logged_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let details = serde_json::to_string(&entry.details)?;
        let hash = entry_hash(
            &id,
            &logged_at,
            entry.actor_id,
            entry.action.as_str(),
            entry.acted_actor_id,
            &entry.actee_id,
            &details,
            &previous_hash,
        );

        let row = sqlx::query_as::<_, AuditRow>(&format!(
            r#"
            INSERT INTO audits (id, actor_id, action, acted_actor_id, actee_id, details,
                                logged_at, previous_hash, entry_hash)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {}
            "#,
            AUDIT_COLUMNS
        ))
        .bind(&id)
        .bind(entry.actor_id)
        .bind(entry.action.as_str())
        .bind(entry.acted_actor_id)
        .bind(&entry.actee_id)
        .bind(&details)
        .bind(&logged_at)
        .bind(&previous_hash)
        .bind(&hash)
        .fetch_one(tx.conn())
        .await?;

        info!(
            "Audit entry created: action={}, actor={:?}, acted={}, actee={}",
            entry.action, entry.actor_id, entry.acted_actor_id, entry.actee_id
        );

        AuditRecord::try_from(row)
    }

    /// Most recent records first, optionally restricted to one actee.
    pub async fn list(&self, actee_id: Option<&str>, limit: i64) -> Result<Vec<AuditRecord>> {
        debug!("Listing audit entries (actee: {:?}, limit: {})", actee_id, limit);
        let rows = sqlx::query_as::<_, AuditRow>(&format!(
            "SELECT {} FROM audits WHERE (? IS NULL OR actee_id = ?) ORDER BY seq DESC LIMIT ?",
            AUDIT_COLUMNS
        ))
        .bind(actee_id)
        .bind(actee_id)
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        rows.into_iter().map(AuditRecord::try_from).collect()
    }

    pub async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM audits")
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    /// Walk the whole trail in order and check every link and hash.
    pub async fn verify_chain(&self) -> Result<bool> {
        let rows = sqlx::query_as::<_, AuditRow>(&format!(
            "SELECT {} FROM audits ORDER BY seq ASC",
            AUDIT_COLUMNS
        ))
        .fetch_all(self.db.pool())
        .await?;

        let mut expected_previous = GENESIS_HASH.to_string();
        for row in &rows {
            if row.previous_hash != expected_previous {
                error!("Audit chain broken at seq {}: previous hash mismatch", row.seq);
                return Ok(false);
            }
            if row.entry_hash != row.calculate_hash() {
                error!("Audit chain broken at seq {}: entry hash mismatch", row.seq);
                return Ok(false);
            }
            expected_previous = row.entry_hash.clone();
        }

        info!("Audit chain verified: {} entries", rows.len());
        Ok(true)
    }
}
