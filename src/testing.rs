//! In-memory stores for unit and router tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use axum::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::auth::repo::UserStore;
use crate::auth::repo_types::{NewUser, User, UserId};
use crate::auth::session::{SessionRecord, SessionStore};
use crate::error::StoreError;
use crate::events::repo::{Event, EventFields, EventStore};

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<User>>,
    fail_next: AtomicBool,
}

impl MemoryUserStore {
    /// Makes the next call report the store as unavailable.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create_user(&self, user: NewUser) -> Result<UserId, StoreError> {
        self.check()?;
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::UniqueViolation("users_username_key".into()));
        }
        let id = UserId(users.len() as i64 + 1);
        users.push(User {
            id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            created_at: OffsetDateTime::now_utc(),
        });
        Ok(id)
    }

    async fn find_by_username_and_hash(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<Option<User>, StoreError> {
        self.check()?;
        let users = self.users.read().await;
        Ok(users
            .iter()
            .find(|u| u.username == username && u.password_hash == password_hash)
            .cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.check()?;
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        self.check()?;
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }
}

#[derive(Default)]
pub struct MemoryEventStore {
    events: RwLock<Vec<Event>>,
    next_id: AtomicI64,
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn create(&self, owner: UserId, fields: EventFields) -> Result<Event, StoreError> {
        let event = Event {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            title: fields.title,
            start_datetime: fields.start_datetime,
            timezone_id: fields.timezone_id,
            organizer_id: owner,
            description: fields.description,
            created_at: OffsetDateTime::now_utc(),
        };
        self.events.write().await.push(event.clone());
        Ok(event)
    }

    async fn get(&self, owner: UserId, id: i64) -> Result<Option<Event>, StoreError> {
        let events = self.events.read().await;
        Ok(events
            .iter()
            .find(|e| e.id == id && e.organizer_id == owner)
            .cloned())
    }

    async fn list(
        &self,
        owner: UserId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Event>, StoreError> {
        let events = self.events.read().await;
        let mut own: Vec<Event> = events
            .iter()
            .filter(|e| e.organizer_id == owner)
            .cloned()
            .collect();
        own.sort_by_key(|e| (e.start_datetime, e.id));
        Ok(own
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn update(
        &self,
        owner: UserId,
        id: i64,
        fields: EventFields,
    ) -> Result<Option<Event>, StoreError> {
        let mut events = self.events.write().await;
        let Some(event) = events
            .iter_mut()
            .find(|e| e.id == id && e.organizer_id == owner)
        else {
            return Ok(None);
        };
        event.title = fields.title;
        event.start_datetime = fields.start_datetime;
        event.timezone_id = fields.timezone_id;
        event.description = fields.description;
        Ok(Some(event.clone()))
    }

    async fn delete(&self, owner: UserId, id: i64) -> Result<bool, StoreError> {
        let mut events = self.events.write().await;
        let before = events.len();
        events.retain(|e| !(e.id == id && e.organizer_id == owner));
        Ok(events.len() < before)
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, record: SessionRecord) -> Result<(), StoreError> {
        self.sessions
            .write()
            .await
            .insert(record.id_hash.clone(), record);
        Ok(())
    }

    async fn find(&self, id_hash: &str) -> Result<Option<SessionRecord>, StoreError> {
        Ok(self.sessions.read().await.get(id_hash).cloned())
    }

    async fn delete(&self, id_hash: &str) -> Result<(), StoreError> {
        self.sessions.write().await.remove(id_hash);
        Ok(())
    }
}
