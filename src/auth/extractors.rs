use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
        HeaderMap,
    },
};

use crate::auth::repo_types::UserId;
use crate::error::AppError;

/// Identity of the caller, placed in request extensions by
/// [`require_auth`](super::middleware::require_auth). Extraction fails closed
/// with `Unauthorized` when the middleware did not run.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .copied()
            .ok_or(AppError::Unauthorized)
    }
}

/// Token from `Authorization: Bearer <token>`.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers.get(AUTHORIZATION).ok_or(AppError::Unauthorized)?;
    let value = value.to_str().map_err(|_| AppError::MalformedToken)?;
    let (scheme, token) = value.split_once(' ').ok_or(AppError::MalformedToken)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AppError::MalformedToken);
    }
    Ok(token)
}

/// Value of the named cookie across all `Cookie` headers.
pub(crate) fn cookie_value<'h>(headers: &'h HeaderMap, name: &str) -> Result<&'h str, AppError> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
        .ok_or(AppError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(name: axum::http::HeaderName, value: &'static str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(name, HeaderValue::from_static(value));
        map
    }

    #[test]
    fn bearer_token_parsing() {
        let ok = headers(AUTHORIZATION, "Bearer abc.def.ghi");
        assert_eq!(bearer_token(&ok).unwrap(), "abc.def.ghi");

        let lower = headers(AUTHORIZATION, "bearer abc");
        assert_eq!(bearer_token(&lower).unwrap(), "abc");

        assert!(matches!(
            bearer_token(&HeaderMap::new()),
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            bearer_token(&headers(AUTHORIZATION, "Basic dXNlcjpwYXNz")),
            Err(AppError::MalformedToken)
        ));
        assert!(matches!(
            bearer_token(&headers(AUTHORIZATION, "Bearer")),
            Err(AppError::MalformedToken)
        ));
    }

    #[test]
    fn cookie_lookup() {
        let map = headers(COOKIE, "theme=dark; session_id=abc123; lang=en");
        assert_eq!(cookie_value(&map, "session_id").unwrap(), "abc123");
        assert!(matches!(
            cookie_value(&map, "missing"),
            Err(AppError::Unauthorized)
        ));

        let mut split = HeaderMap::new();
        split.append(COOKIE, HeaderValue::from_static("theme=dark"));
        split.append(COOKIE, HeaderValue::from_static("session_id=xyz"));
        assert_eq!(cookie_value(&split, "session_id").unwrap(), "xyz");
    }
}
