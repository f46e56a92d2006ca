use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query,
    },
    http::{header::LOCATION, StatusCode},
    response::{AppendHeaders, IntoResponse},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn, Span};

use super::dto::{CreatedEventResponse, EventsResponse, Pagination, SaveEventRequest};
use super::repo::Event;
use super::services::OwnedEvents;
use crate::{error::AppError, state::AppState};

/// Event CRUD, mounted under `/api/events` behind `require_auth`.
pub fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_events).post(create_event))
        .route("/:id", get(get_event).put(update_event).delete(delete_event))
}

fn parse_body(
    payload: Result<Json<SaveEventRequest>, JsonRejection>,
) -> Result<SaveEventRequest, AppError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        warn!(error = %rejection.body_text(), "invalid event body");
        AppError::BadRequest("Request is invalid type".into())
    })
}

fn parse_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, AppError> {
    let Path(id) = path.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "invalid event id");
        AppError::BadRequest("Event id must be an integer".into())
    })?;
    Span::current().record("event_id", id);
    Ok(id)
}

#[instrument(skip(events, query), fields(owner = %events.owner()))]
pub async fn list_events(
    events: OwnedEvents,
    query: Result<Query<Pagination>, QueryRejection>,
) -> Result<Json<EventsResponse>, AppError> {
    let Query(p) = query.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "invalid pagination");
        AppError::BadRequest("Invalid pagination parameters".into())
    })?;
    let (limit, offset) = p.clamped();
    let data = events.list(limit, offset).await?;
    Ok(Json(EventsResponse { data }))
}

#[instrument(skip(events, path), fields(owner = %events.owner(), event_id = tracing::field::Empty))]
pub async fn get_event(
    events: OwnedEvents,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Event>, AppError> {
    let id = parse_id(path)?;
    Ok(Json(events.get(id).await?))
}

#[instrument(skip(events, payload), fields(owner = %events.owner()))]
pub async fn create_event(
    events: OwnedEvents,
    payload: Result<Json<SaveEventRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let fields = parse_body(payload)?.into_fields()?;
    let event = events.create(fields).await?;
    info!(event_id = event.id, "event saved");

    Ok((
        StatusCode::CREATED,
        AppendHeaders([(LOCATION, format!("/api/events/{}", event.id))]),
        Json(CreatedEventResponse { id: event.id }),
    ))
}

#[instrument(skip(events, path, payload), fields(owner = %events.owner(), event_id = tracing::field::Empty))]
pub async fn update_event(
    events: OwnedEvents,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<SaveEventRequest>, JsonRejection>,
) -> Result<Json<Event>, AppError> {
    let id = parse_id(path)?;
    let fields = parse_body(payload)?.into_fields()?;
    let event = events.update(id, fields).await?;
    info!(event_id = event.id, "event updated");
    Ok(Json(event))
}

#[instrument(skip(events, path), fields(owner = %events.owner(), event_id = tracing::field::Empty))]
pub async fn delete_event(
    events: OwnedEvents,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(path)?;
    events.delete(id).await?;
    info!(event_id = id, "event deleted");
    Ok(StatusCode::NO_CONTENT)
}
