use std::fmt;
use std::sync::Arc;

use axum::http::HeaderMap;
use time::OffsetDateTime;

use super::jwt::TokenAuthenticator;
use super::session::{SessionAuthenticator, SessionStore};
use crate::auth::repo_types::UserId;
use crate::config::{AuthConfig, AuthScheme};
use crate::error::AppError;

/// Issues and checks the bearer credential of one authentication scheme.
/// Downstream code only ever sees the resulting [`UserId`].
#[axum::async_trait]
pub trait Authenticator: Send + Sync {
    /// Pulls the raw credential out of a request. `Unauthorized` when none was
    /// sent at all.
    fn presented<'h>(&self, headers: &'h HeaderMap) -> Result<&'h str, AppError>;

    async fn issue(&self, user_id: UserId) -> Result<IssuedCredential, AppError>;

    async fn validate(&self, presented: &str) -> Result<UserId, AppError>;

    async fn revoke(&self, presented: &str) -> Result<(), AppError>;

    /// Cookie that clears the client side on sign-out, if the scheme uses one.
    fn expired_cookie(&self) -> Option<SessionCookie> {
        None
    }
}

pub enum IssuedCredential {
    Bearer {
        token: String,
        expires_at: OffsetDateTime,
    },
    Cookie(SessionCookie),
}

/// `Set-Cookie` payload for the session scheme.
#[derive(Clone)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub max_age_secs: i64,
    pub secure: bool,
}

impl SessionCookie {
    pub fn header_value(&self) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            self.name, self.value, self.max_age_secs
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

impl fmt::Debug for SessionCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCookie")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .field("max_age_secs", &self.max_age_secs)
            .field("secure", &self.secure)
            .finish()
    }
}

/// Picks the scheme once, at startup.
pub fn from_config(cfg: &AuthConfig, sessions: Arc<dyn SessionStore>) -> Arc<dyn Authenticator> {
    match cfg.scheme {
        AuthScheme::Token => Arc::new(TokenAuthenticator::from_config(cfg)),
        AuthScheme::Session => Arc::new(SessionAuthenticator::from_config(cfg, sessions)),
    }
}
