use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::debug;

use super::repo::{Event, EventFields, EventStore};
use crate::auth::{extractors::AuthUser, repo_types::UserId};
use crate::error::AppError;
use crate::state::AppState;

/// The caller's view of the event store. Built from the authenticated
/// identity only, so every call is scoped to the caller; rows owned by others
/// come back as `NotFound`.
pub struct OwnedEvents {
    owner: UserId,
    store: Arc<dyn EventStore>,
}

impl OwnedEvents {
    pub fn new(owner: UserId, store: Arc<dyn EventStore>) -> Self {
        Self { owner, store }
    }

    pub fn owner(&self) -> UserId {
        self.owner
    }

    pub async fn create(&self, fields: EventFields) -> Result<Event, AppError> {
        let event = self.store.create(self.owner, fields).await?;
        debug!(owner = %self.owner, event_id = event.id, "event created");
        Ok(event)
    }

    pub async fn get(&self, id: i64) -> Result<Event, AppError> {
        self.store
            .get(self.owner, id)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Event>, AppError> {
        Ok(self.store.list(self.owner, limit, offset).await?)
    }

    pub async fn update(&self, id: i64, fields: EventFields) -> Result<Event, AppError> {
        self.store
            .update(self.owner, id, fields)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        if self.store.delete(self.owner, id).await? {
            debug!(owner = %self.owner, event_id = id, "event deleted");
            Ok(())
        } else {
            Err(AppError::NotFound)
        }
    }
}

impl FromRef<AppState> for Arc<dyn EventStore> {
    fn from_ref(state: &AppState) -> Self {
        state.events.clone()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for OwnedEvents
where
    S: Send + Sync,
    Arc<dyn EventStore>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(owner) = AuthUser::from_request_parts(parts, state).await?;
        Ok(OwnedEvents::new(owner, Arc::<dyn EventStore>::from_ref(state)))
    }
}
