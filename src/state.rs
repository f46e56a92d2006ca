use std::sync::Arc;

use crate::auth::authenticator::{self, Authenticator};
use crate::auth::password::Hasher;
use crate::auth::repo::{PgUserStore, UserStore};
use crate::auth::services::CredentialVerifier;
use crate::auth::session::{PgSessionStore, SessionStore};
use crate::config::AppConfig;
use crate::db;
use crate::events::repo::{EventStore, PgEventStore};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub events: Arc<dyn EventStore>,
    pub credentials: CredentialVerifier,
    pub auth: Arc<dyn Authenticator>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        tracing::info!(auth = ?config.auth, "configuration loaded");

        let db = db::connect(&config.database_url).await?;
        db::migrate(&db).await?;

        Ok(Self::from_parts(
            &config,
            Arc::new(PgUserStore::new(db.clone())),
            Arc::new(PgEventStore::new(db.clone())),
            Arc::new(PgSessionStore::new(db)),
        ))
    }

    pub fn from_parts(
        config: &AppConfig,
        users: Arc<dyn UserStore>,
        events: Arc<dyn EventStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        let hasher = Hasher::new(config.auth.password_scheme, config.auth.password_salt.clone());
        let credentials = CredentialVerifier::new(users.clone(), hasher);
        let auth = authenticator::from_config(&config.auth, sessions);
        Self {
            users,
            events,
            credentials,
            auth,
        }
    }

    #[cfg(test)]
    pub fn fake(scheme: crate::config::AuthScheme) -> Self {
        use crate::testing::{MemoryEventStore, MemorySessionStore, MemoryUserStore};

        Self::from_parts(
            &AppConfig::for_tests(scheme),
            Arc::new(MemoryUserStore::default()),
            Arc::new(MemoryEventStore::default()),
            Arc::new(MemorySessionStore::default()),
        )
    }
}
