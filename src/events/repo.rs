use axum::async_trait;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

use crate::auth::repo_types::UserId;
use crate::error::StoreError;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Event {
    pub id: i64,
    pub title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub start_datetime: OffsetDateTime,
    pub timezone_id: Option<String>,
    pub organizer_id: UserId,
    pub description: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Client-controlled columns. The owner is never part of it.
#[derive(Debug, Clone, PartialEq)]
pub struct EventFields {
    pub title: String,
    pub start_datetime: OffsetDateTime,
    pub timezone_id: Option<String>,
    pub description: Option<String>,
}

/// Event persistence. Every method takes the owner and applies it in the
/// query itself, so rows of other owners are invisible.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn create(&self, owner: UserId, fields: EventFields) -> Result<Event, StoreError>;
    async fn get(&self, owner: UserId, id: i64) -> Result<Option<Event>, StoreError>;
    async fn list(&self, owner: UserId, limit: i64, offset: i64)
        -> Result<Vec<Event>, StoreError>;
    async fn update(
        &self,
        owner: UserId,
        id: i64,
        fields: EventFields,
    ) -> Result<Option<Event>, StoreError>;
    /// `false` when nothing matched.
    async fn delete(&self, owner: UserId, id: i64) -> Result<bool, StoreError>;
}

#[derive(Clone)]
pub struct PgEventStore {
    db: PgPool,
}

impl PgEventStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn create(&self, owner: UserId, fields: EventFields) -> Result<Event, StoreError> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            INSERT INTO events (title, start_datetime, timezone_id, organizer_id, description)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, title, start_datetime, timezone_id, organizer_id, description, created_at
            "#,
        )
        .bind(&fields.title)
        .bind(fields.start_datetime)
        .bind(&fields.timezone_id)
        .bind(owner)
        .bind(&fields.description)
        .fetch_one(&self.db)
        .await?;
        Ok(event)
    }

    async fn get(&self, owner: UserId, id: i64) -> Result<Option<Event>, StoreError> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            SELECT id, title, start_datetime, timezone_id, organizer_id, description, created_at
            FROM events
            WHERE id = $1 AND organizer_id = $2
            "#,
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.db)
        .await?;
        Ok(event)
    }

    async fn list(
        &self,
        owner: UserId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Event>, StoreError> {
        let rows = sqlx::query_as::<_, Event>(
            r#"
            SELECT id, title, start_datetime, timezone_id, organizer_id, description, created_at
            FROM events
            WHERE organizer_id = $1
            ORDER BY start_datetime ASC, id ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(owner)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn update(
        &self,
        owner: UserId,
        id: i64,
        fields: EventFields,
    ) -> Result<Option<Event>, StoreError> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            UPDATE events
               SET title = $1, start_datetime = $2, timezone_id = $3, description = $4
             WHERE id = $5 AND organizer_id = $6
            RETURNING id, title, start_datetime, timezone_id, organizer_id, description, created_at
            "#,
        )
        .bind(&fields.title)
        .bind(fields.start_datetime)
        .bind(&fields.timezone_id)
        .bind(&fields.description)
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.db)
        .await?;
        Ok(event)
    }

    async fn delete(&self, owner: UserId, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query(r#"DELETE FROM events WHERE id = $1 AND organizer_id = $2"#)
            .bind(id)
            .bind(owner)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
