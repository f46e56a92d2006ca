use crate::state::AppState;
use axum::Router;

pub mod authenticator;
mod claims;
mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;
pub mod session;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}

pub fn protected_router() -> Router<AppState> {
    handlers::session_routes()
}
