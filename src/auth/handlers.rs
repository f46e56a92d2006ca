use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        authenticator::IssuedCredential,
        dto::{PublicUser, SessionResponse, SignInRequest, SignUpRequest, SignUpResponse, TokenResponse},
        extractors::AuthUser,
        services::{is_valid_email, normalize_username, Credential, SignUp},
    },
    error::AppError,
    state::AppState,
};

/// Routes reachable without a credential.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/sign-up", post(sign_up))
        .route("/auth/sign-in", post(sign_in))
}

/// Routes that expect `require_auth` in front of them.
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/sign-out", post(sign_out))
        .route("/me", get(get_me))
}

fn bad_request(rejection: JsonRejection) -> AppError {
    warn!(error = %rejection.body_text(), "invalid request body");
    AppError::BadRequest("Request is invalid type".into())
}

#[instrument(skip(state, payload))]
pub async fn sign_up(
    State(state): State<AppState>,
    payload: Result<Json<SignUpRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SignUpResponse>), AppError> {
    let Json(mut payload) = payload.map_err(bad_request)?;
    payload.username = normalize_username(&payload.username);
    payload.email = payload.email.trim().to_lowercase();

    if payload.username.is_empty() {
        return Err(AppError::BadRequest("Username is required".into()));
    }
    if payload.password.is_empty() {
        return Err(AppError::BadRequest("Password is required".into()));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::BadRequest("Invalid email".into()));
    }

    let username = payload.username.clone();
    let id = state
        .credentials
        .create_user(SignUp {
            username: payload.username,
            email: payload.email,
            password: payload.password,
        })
        .await
        .map_err(|e| {
            warn!(username = %username, reason = e.code(), "sign-up failed");
            e
        })?;

    info!(user_id = %id, username = %username, "user registered");
    Ok((StatusCode::CREATED, Json(SignUpResponse { id })))
}

#[instrument(skip(state, payload))]
pub async fn sign_in(
    State(state): State<AppState>,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = payload.map_err(bad_request)?;
    let username = normalize_username(&payload.username);
    if username.is_empty() || payload.password.is_empty() {
        return Err(AppError::BadRequest("Request is invalid type".into()));
    }

    let credential = Credential {
        username,
        password: payload.password,
    };
    let user_id = state.credentials.verify_credentials(&credential).await?;

    let response = match state.auth.issue(user_id).await? {
        IssuedCredential::Bearer { token, expires_at } => Json(TokenResponse {
            token,
            token_type: "Bearer",
            expires_at,
        })
        .into_response(),
        IssuedCredential::Cookie(cookie) => (
            AppendHeaders([(SET_COOKIE, cookie.header_value())]),
            Json(SessionResponse { user_id }),
        )
            .into_response(),
    };

    info!(user_id = %user_id, "user signed in");
    Ok(response)
}

#[instrument(skip(state, headers))]
pub async fn sign_out(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let presented = state.auth.presented(&headers)?;
    state.auth.revoke(presented).await?;
    info!(user_id = %user_id, "user signed out");

    Ok(match state.auth.expired_cookie() {
        Some(cookie) => (
            StatusCode::NO_CONTENT,
            AppendHeaders([(SET_COOKIE, cookie.header_value())]),
        )
            .into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    let user = state.users.find_by_id(user_id).await?.ok_or_else(|| {
        warn!(user_id = %user_id, "authenticated user no longer exists");
        AppError::Unauthorized
    })?;

    Ok(Json(PublicUser {
        id: user.id,
        username: user.username,
        email: user.email,
    }))
}
