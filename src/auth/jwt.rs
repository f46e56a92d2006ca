use axum::http::HeaderMap;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::Deserialize;
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};

use super::authenticator::{Authenticator, IssuedCredential};
use super::claims::Claims;
use super::extractors::bearer_token;
use crate::auth::repo_types::UserId;
use crate::config::AuthConfig;
use crate::error::AppError;

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Stateless bearer tokens: HS256-signed claims with a fixed lifetime.
#[derive(Clone)]
pub struct TokenAuthenticator {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
}

#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

impl TokenAuthenticator {
    pub fn from_config(cfg: &AuthConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.token_secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.token_secret.as_bytes()),
            issuer: cfg.token_issuer.clone(),
            audience: cfg.token_audience.clone(),
            ttl: Duration::hours(cfg.token_ttl_hours),
        }
    }

    pub fn sign(&self, user_id: UserId) -> Result<(String, OffsetDateTime), AppError> {
        self.sign_at(user_id, OffsetDateTime::now_utc())
    }

    /// Signs as if issued at `issued_at`.
    pub fn sign_at(
        &self,
        user_id: UserId,
        issued_at: OffsetDateTime,
    ) -> Result<(String, OffsetDateTime), AppError> {
        let expires_at = issued_at + self.ttl;
        let claims = Claims {
            user_id,
            iat: issued_at.unix_timestamp(),
            exp: expires_at.unix_timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::new(ALGORITHM), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("jwt encode: {e}")))?;
        debug!(user_id = %user_id, "jwt signed");
        Ok((token, expires_at))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        check_algorithm(token)?;

        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            warn!(reason = ?e.kind(), "jwt rejected");
            match e.kind() {
                ErrorKind::InvalidToken
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_)
                | ErrorKind::MissingRequiredClaim(_) => AppError::MalformedToken,
                _ => AppError::InvalidToken,
            }
        })?;
        // jsonwebtoken accepts exp == now; the token is dead at exp.
        if data.claims.exp <= OffsetDateTime::now_utc().unix_timestamp() {
            warn!(user_id = %data.claims.user_id, "jwt rejected: expired");
            return Err(AppError::InvalidToken);
        }
        debug!(user_id = %data.claims.user_id, "jwt verified");
        Ok(data.claims)
    }
}

/// Rejects anything not announcing the configured HMAC algorithm before the
/// signature is looked at, `none` included.
fn check_algorithm(token: &str) -> Result<(), AppError> {
    let mut parts = token.split('.');
    let (Some(header), Some(_), Some(_), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(AppError::MalformedToken);
    };
    let raw = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|_| AppError::MalformedToken)?;
    let header: RawHeader = serde_json::from_slice(&raw).map_err(|_| AppError::MalformedToken)?;
    match header.alg.parse::<Algorithm>() {
        Ok(alg) if alg == ALGORITHM => Ok(()),
        _ => {
            warn!(alg = %header.alg, "jwt rejected: unexpected algorithm");
            Err(AppError::InvalidToken)
        }
    }
}

#[axum::async_trait]
impl Authenticator for TokenAuthenticator {
    fn presented<'h>(&self, headers: &'h HeaderMap) -> Result<&'h str, AppError> {
        bearer_token(headers)
    }

    async fn issue(&self, user_id: UserId) -> Result<IssuedCredential, AppError> {
        let (token, expires_at) = self.sign(user_id)?;
        Ok(IssuedCredential::Bearer { token, expires_at })
    }

    async fn validate(&self, presented: &str) -> Result<UserId, AppError> {
        self.verify(presented).map(|claims| claims.user_id)
    }

    async fn revoke(&self, _presented: &str) -> Result<(), AppError> {
        // tokens live until exp
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, AuthScheme};
    use serde_json::json;

    fn make_keys(secret: &str, issuer: &str, audience: &str) -> TokenAuthenticator {
        let mut config = AppConfig::for_tests(AuthScheme::Token);
        config.auth.token_secret = secret.into();
        config.auth.token_issuer = issuer.into();
        config.auth.token_audience = audience.into();
        TokenAuthenticator::from_config(&config.auth)
    }

    fn keys() -> TokenAuthenticator {
        make_keys("dev-secret", "test-issuer", "test-aud")
    }

    fn b64(value: serde_json::Value) -> String {
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(&value).unwrap())
    }

    fn claims_json(user_id: i64) -> serde_json::Value {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        json!({
            "user_id": user_id,
            "iat": now,
            "exp": now + 3600,
            "iss": "test-issuer",
            "aud": "test-aud",
        })
    }

    #[tokio::test]
    async fn issue_then_validate_roundtrips() {
        let keys = keys();
        let issued = keys.issue(UserId(7)).await.unwrap();
        let IssuedCredential::Bearer { token, expires_at } = issued else {
            panic!("expected bearer credential");
        };
        assert_eq!(keys.validate(&token).await.unwrap(), UserId(7));

        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.exp - claims.iat, 12 * 3600);
        assert_eq!(claims.exp, expires_at.unix_timestamp());
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
    }

    #[test]
    fn token_near_end_of_life_is_still_valid() {
        let keys = keys();
        let issued_at = OffsetDateTime::now_utc() - Duration::hours(11) - Duration::minutes(59);
        let (token, _) = keys.sign_at(UserId(1), issued_at).unwrap();
        assert_eq!(keys.verify(&token).unwrap().user_id, UserId(1));
    }

    #[test]
    fn expired_token_is_invalid() {
        let keys = keys();
        let issued_at = OffsetDateTime::now_utc() - Duration::hours(13);
        let (token, _) = keys.sign_at(UserId(1), issued_at).unwrap();
        assert!(matches!(keys.verify(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn token_at_exact_expiry_is_invalid() {
        let keys = keys();
        let issued_at = OffsetDateTime::now_utc() - Duration::hours(12);
        let (token, expires_at) = keys.sign_at(UserId(1), issued_at).unwrap();
        assert!(expires_at <= OffsetDateTime::now_utc());
        assert!(matches!(keys.verify(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn token_from_other_secret_is_invalid() {
        let (token, _) = make_keys("attacker-secret", "test-issuer", "test-aud")
            .sign(UserId(1))
            .unwrap();
        assert!(matches!(keys().verify(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn wrong_issuer_or_audience_is_invalid() {
        let (token, _) = make_keys("dev-secret", "bad-iss", "bad-aud")
            .sign(UserId(1))
            .unwrap();
        assert!(matches!(keys().verify(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn alg_none_is_invalid() {
        let token = format!(
            "{}.{}.",
            b64(json!({"alg": "none", "typ": "JWT"})),
            b64(claims_json(1))
        );
        assert!(matches!(keys().verify(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn other_hmac_algorithm_is_invalid() {
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims_json(1),
            &EncodingKey::from_secret(b"dev-secret"),
        )
        .unwrap();
        assert!(matches!(keys().verify(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn asymmetric_algorithm_header_is_invalid() {
        let token = format!(
            "{}.{}.c2ln",
            b64(json!({"alg": "RS256", "typ": "JWT"})),
            b64(claims_json(1))
        );
        assert!(matches!(keys().verify(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn garbage_is_malformed() {
        for token in ["", "abc", "a.b", "a.b.c.d", "!!!.e30.sig"] {
            assert!(
                matches!(keys().verify(token), Err(AppError::MalformedToken)),
                "{token:?} should be malformed"
            );
        }
    }

    #[test]
    fn signed_payload_without_user_id_is_malformed() {
        let mut claims = claims_json(1);
        claims.as_object_mut().unwrap().remove("user_id");
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"dev-secret"),
        )
        .unwrap();
        assert!(matches!(keys().verify(&token), Err(AppError::MalformedToken)));
    }
}
