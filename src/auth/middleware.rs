use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use super::extractors::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Guards protected routes: validates the presented credential with the
/// configured [`Authenticator`](super::authenticator::Authenticator) and
/// attaches the caller's identity to the request. Runs on every request.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let validated = match state.auth.presented(req.headers()) {
        Ok(presented) => state.auth.validate(presented).await,
        Err(e) => Err(e),
    };
    let user_id = validated.map_err(|e| {
        warn!(reason = e.code(), path = %req.uri().path(), "request rejected");
        e
    })?;

    req.extensions_mut().insert(AuthUser(user_id));
    Ok(next.run(req).await)
}
