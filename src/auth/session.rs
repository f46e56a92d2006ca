use std::sync::Arc;

use axum::async_trait;
use axum::http::HeaderMap;
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use sqlx::{FromRow, PgPool};
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};

use super::authenticator::{Authenticator, IssuedCredential, SessionCookie};
use super::extractors::cookie_value;
use crate::auth::repo_types::UserId;
use crate::config::AuthConfig;
use crate::error::{AppError, StoreError};

/// Session id byte length before hex encoding.
const SESSION_ID_BYTES: usize = 32;

/// Server-side session row. Only the digest of the id is kept.
#[derive(Debug, Clone, FromRow)]
pub struct SessionRecord {
    pub id_hash: String,
    pub user_id: UserId,
    pub expires_at: OffsetDateTime,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, record: SessionRecord) -> Result<(), StoreError>;
    async fn find(&self, id_hash: &str) -> Result<Option<SessionRecord>, StoreError>;
    async fn delete(&self, id_hash: &str) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct PgSessionStore {
    db: PgPool,
}

impl PgSessionStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert(&self, record: SessionRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id_hash, user_id, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(&record.id_hash)
        .bind(record.user_id)
        .bind(record.expires_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn find(&self, id_hash: &str) -> Result<Option<SessionRecord>, StoreError> {
        let record = sqlx::query_as::<_, SessionRecord>(
            r#"SELECT id_hash, user_id, expires_at FROM sessions WHERE id_hash = $1"#,
        )
        .bind(id_hash)
        .fetch_optional(&self.db)
        .await?;
        Ok(record)
    }

    async fn delete(&self, id_hash: &str) -> Result<(), StoreError> {
        sqlx::query(r#"DELETE FROM sessions WHERE id_hash = $1"#)
            .bind(id_hash)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}

fn digest(session_id: &str) -> String {
    hex::encode(Sha256::digest(session_id.as_bytes()))
}

fn looks_like_session_id(value: &str) -> bool {
    value.len() == SESSION_ID_BYTES * 2 && value.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Cookie-backed sessions with an absolute lifetime.
pub struct SessionAuthenticator {
    store: Arc<dyn SessionStore>,
    ttl: Duration,
    cookie_name: String,
    secure: bool,
}

impl SessionAuthenticator {
    pub fn from_config(cfg: &AuthConfig, store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            ttl: Duration::minutes(cfg.session_ttl_minutes),
            cookie_name: cfg.session_cookie_name.clone(),
            secure: cfg.session_cookie_secure,
        }
    }

    /// Opens a session as if created at `now`.
    pub async fn issue_at(
        &self,
        user_id: UserId,
        now: OffsetDateTime,
    ) -> Result<SessionCookie, AppError> {
        let mut raw = [0u8; SESSION_ID_BYTES];
        OsRng.fill_bytes(&mut raw);
        let session_id = hex::encode(raw);

        self.store
            .insert(SessionRecord {
                id_hash: digest(&session_id),
                user_id,
                expires_at: now + self.ttl,
            })
            .await?;
        debug!(user_id = %user_id, "session opened");

        Ok(SessionCookie {
            name: self.cookie_name.clone(),
            value: session_id,
            max_age_secs: self.ttl.whole_seconds(),
            secure: self.secure,
        })
    }

    pub async fn validate_at(
        &self,
        presented: &str,
        now: OffsetDateTime,
    ) -> Result<UserId, AppError> {
        if !looks_like_session_id(presented) {
            warn!("session rejected: malformed id");
            return Err(AppError::SessionExpiredOrInvalid);
        }
        let id_hash = digest(presented);
        let record = self
            .store
            .find(&id_hash)
            .await?
            .ok_or(AppError::SessionExpiredOrInvalid)?;

        if record.expires_at <= now {
            warn!(user_id = %record.user_id, "session rejected: expired");
            if let Err(e) = self.store.delete(&id_hash).await {
                warn!(error = %e, "failed to drop expired session");
            }
            return Err(AppError::SessionExpiredOrInvalid);
        }
        Ok(record.user_id)
    }
}

#[async_trait]
impl Authenticator for SessionAuthenticator {
    fn presented<'h>(&self, headers: &'h HeaderMap) -> Result<&'h str, AppError> {
        cookie_value(headers, &self.cookie_name)
    }

    async fn issue(&self, user_id: UserId) -> Result<IssuedCredential, AppError> {
        let cookie = self.issue_at(user_id, OffsetDateTime::now_utc()).await?;
        Ok(IssuedCredential::Cookie(cookie))
    }

    async fn validate(&self, presented: &str) -> Result<UserId, AppError> {
        self.validate_at(presented, OffsetDateTime::now_utc()).await
    }

    async fn revoke(&self, presented: &str) -> Result<(), AppError> {
        self.store.delete(&digest(presented)).await?;
        Ok(())
    }

    fn expired_cookie(&self) -> Option<SessionCookie> {
        Some(SessionCookie {
            name: self.cookie_name.clone(),
            value: String::new(),
            max_age_secs: 0,
            secure: self.secure,
        })
    }
}
