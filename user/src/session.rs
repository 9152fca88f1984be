//! Bearer-token sessions.
//!
//! A token is 32 random bytes, URL-safe base64 without padding. It resolves to
//! its actor only while unexpired and while the actor itself is not deleted.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64, Engine};
use chrono::{DateTime, Duration, Utc};
use database::{Catalog, Database};
use entities::Actor;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{Result, UserError};

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Session lifetime in hours
    pub ttl_hours: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { ttl_hours: 24 }
    }
}

impl SessionConfig {
    pub fn with_ttl_hours(mut self, hours: i64) -> Self {
        self.ttl_hours = hours;
        self
    }

    pub fn ttl(&self) -> Duration {
        Duration::hours(self.ttl_hours)
    }
}

/// A freshly issued session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub actor_id: i64,
    pub expires_at: DateTime<Utc>,
}

/// Issues and resolves bearer tokens.
#[derive(Debug, Clone)]
pub struct SessionStore {
    db: Arc<Database>,
    catalog: Catalog,
    config: SessionConfig,
}

impl SessionStore {
    pub fn new(db: Arc<Database>, config: SessionConfig) -> Self {
        Self {
            catalog: Catalog::new(db.clone()),
            db,
            config,
        }
    }

    /// Generate a secure random token
    fn generate_token() -> String {
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; 32];
        rng.fill(&mut bytes);
        BASE64.encode(bytes)
    }

    /// Issue a session for a live actor using the configured lifetime.
    pub async fn create_session(&self, actor_id: i64) -> Result<Session> {
        self.create_session_with_ttl(actor_id, self.config.ttl()).await
    }

    pub async fn create_session_with_ttl(&self, actor_id: i64, ttl: Duration) -> Result<Session> {
        if self.catalog.get_actor(actor_id).await?.is_none() {
            return Err(UserError::ActorNotFound(actor_id));
        }

        let token = Self::generate_token();
        let now = Utc::now();
        let expires_at = now + ttl;

        sqlx::query(
            "INSERT INTO sessions (token, actor_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&token)
        .bind(actor_id)
        .bind(now)
        .bind(expires_at.timestamp())
        .execute(self.db.pool())
        .await?;

        info!("Session created for actor {}", actor_id);

        Ok(Session {
            token,
            actor_id,
            expires_at,
        })
    }

    /// The actor behind a bearer token, if the session is still valid.
    pub async fn actor_for_bearer_token(&self, token: &str) -> Result<Option<Actor>> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT actor_id FROM sessions WHERE token = ? AND expires_at > ?")
                .bind(token)
                .bind(Utc::now().timestamp())
                .fetch_optional(self.db.pool())
                .await?;

        let Some((actor_id,)) = row else {
            debug!("Bearer token did not match a live session");
            return Ok(None);
        };

        let actor = self.catalog.get_actor(actor_id).await?;
        if actor.is_none() {
            warn!("Session token presented for deleted actor {}", actor_id);
        }
        Ok(actor)
    }

    /// Like [`Self::actor_for_bearer_token`], failing instead of returning `None`.
    pub async fn authenticate(&self, token: &str) -> Result<Actor> {
        self.actor_for_bearer_token(token)
            .await?
            .ok_or(UserError::InvalidCredentials)
    }

    /// End a session. Returns whether it existed.
    pub async fn revoke(&self, token: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Clean up expired sessions
    pub async fn cleanup_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(Utc::now().timestamp())
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() > 0 {
            info!("Cleaned up {} expired sessions", result.rows_affected());
        }
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::{initialize_database, DatabaseConfig};
    use entities::ActorKind;
    use rstest::rstest;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, Arc<Database>, SessionStore) {
        let temp_dir = TempDir::new().unwrap();
        let db = initialize_database(DatabaseConfig::new_with_path(
            temp_dir.path().join("steward.db"),
        ))
        .await
        .unwrap();
        let store = SessionStore::new(db.clone(), SessionConfig::default());
        (temp_dir, db, store)
    }

    #[test]
    fn test_tokens_are_url_safe_and_unique() {
        let a = SessionStore::generate_token();
        let b = SessionStore::generate_token();

        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[tokio::test]
    async fn test_token_resolves_to_actor() {
        let (_dir, db, store) = setup().await;
        let actor = Catalog::new(db).create_actor(ActorKind::User, "Alice").await.unwrap();

        let session = store.create_session(actor.id).await.unwrap();
        let resolved = store.actor_for_bearer_token(&session.token).await.unwrap();

        assert_eq!(resolved.map(|a| a.id), Some(actor.id));
    }

    #[rstest]
    #[case::expired(Duration::seconds(-5))]
    #[case::zero(Duration::zero())]
    #[tokio::test]
    async fn test_expired_sessions_rejected(#[case] ttl: Duration) {
        let (_dir, db, store) = setup().await;
        let actor = Catalog::new(db).create_actor(ActorKind::User, "Alice").await.unwrap();

        let session = store.create_session_with_ttl(actor.id, ttl).await.unwrap();

        assert!(store.actor_for_bearer_token(&session.token).await.unwrap().is_none());
        assert!(matches!(
            store.authenticate(&session.token).await,
            Err(UserError::InvalidCredentials)
        ));
        assert_eq!(store.cleanup_expired().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_deleted_actor_loses_session() {
        let (_dir, db, store) = setup().await;
        let catalog = Catalog::new(db);
        let actor = catalog.create_actor(ActorKind::User, "Alice").await.unwrap();
        let session = store.create_session(actor.id).await.unwrap();

        catalog.delete_actor(actor.id).await.unwrap();

        assert!(store.actor_for_bearer_token(&session.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_revoke_and_unknown_actor() {
        let (_dir, db, store) = setup().await;
        let actor = Catalog::new(db).create_actor(ActorKind::User, "Alice").await.unwrap();
        let session = store.create_session(actor.id).await.unwrap();

        assert!(store.revoke(&session.token).await.unwrap());
        assert!(!store.revoke(&session.token).await.unwrap());
        assert!(store.actor_for_bearer_token(&session.token).await.unwrap().is_none());

        assert!(matches!(
            store.create_session(9999).await,
            Err(UserError::ActorNotFound(9999))
        ));
    }
}
