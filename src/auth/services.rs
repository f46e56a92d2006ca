use std::fmt;
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, warn};

use crate::auth::password::{verify_unknown_user, Hasher};
use crate::auth::repo::UserStore;
use crate::auth::repo_types::{NewUser, UserId};
use crate::config::PasswordScheme;
use crate::error::AppError;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Usernames are stored and looked up in this form.
pub(crate) fn normalize_username(raw: &str) -> String {
    raw.trim().to_string()
}

/// Username/password pair presented at sign-in. Lives for one call only.
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

pub struct SignUp {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Checks passwords against the user store and registers new users.
#[derive(Clone)]
pub struct CredentialVerifier {
    users: Arc<dyn UserStore>,
    hasher: Hasher,
}

impl CredentialVerifier {
    pub fn new(users: Arc<dyn UserStore>, hasher: Hasher) -> Self {
        Self { users, hasher }
    }

    /// Resolves a credential to its user. Unknown usernames and wrong
    /// passwords both yield [`AppError::InvalidCredentials`].
    pub async fn verify_credentials(&self, credential: &Credential) -> Result<UserId, AppError> {
        let found = match self.hasher.scheme() {
            PasswordScheme::Legacy => {
                let digest = self.hasher.hash(&credential.password)?;
                self.users
                    .find_by_username_and_hash(&credential.username, &digest)
                    .await?
            }
            PasswordScheme::Argon2 => match self.users.find_by_username(&credential.username).await? {
                Some(user) => Some(user)
                    .filter(|user| self.hasher.verify(&credential.password, &user.password_hash)),
                None => {
                    verify_unknown_user(&credential.password);
                    None
                }
            },
        };

        match found {
            Some(user) => {
                debug!(user_id = %user.id, "credentials verified");
                Ok(user.id)
            }
            None => {
                warn!(username = %credential.username, "sign-in rejected");
                Err(AppError::InvalidCredentials)
            }
        }
    }

    pub async fn create_user(&self, input: SignUp) -> Result<UserId, AppError> {
        let password_hash = self.hasher.hash(&input.password)?;
        let id = self
            .users
            .create_user(NewUser {
                username: input.username,
                email: input.email,
                password_hash,
            })
            .await?;
        Ok(id)
    }
}
