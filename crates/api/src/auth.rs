use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{Duration, Utc};
use entity::user::{self, Role};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Thirty days, the lifetime of a login token unless configured otherwise.
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 60 * 24 * 30;
/// Ten years.
pub const MAX_SESSION_TTL_MINUTES: i64 = 60 * 24 * 365 * 10;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub session_ttl_minutes: i64,
}

impl AuthConfig {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            session_ttl_minutes: DEFAULT_SESSION_TTL_MINUTES,
        }
    }

    pub fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(self.jwt_secret.as_bytes())
    }

    pub fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(self.jwt_secret.as_bytes())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,
    pub role: String,
    pub exp: usize,
    pub iat: usize,
}

/// The authenticated caller, loaded fresh from the user table on every request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&user::Model> for CurrentUser {
    fn from(model: &user::Model) -> Self {
        Self {
            user_id: model.id,
            name: model.name.clone(),
            email: model.email.clone(),
            role: model.role,
        }
    }
}

pub fn issue_token(
    user_id: Uuid,
    role: Role,
    config: &AuthConfig,
) -> jsonwebtoken::errors::Result<String> {
    let now = Utc::now();
    let exp = now
        .checked_add_signed(Duration::minutes(
            config.session_ttl_minutes.clamp(1, MAX_SESSION_TTL_MINUTES),
        ))
        .unwrap_or(now)
        .timestamp() as usize;
    let claims = SessionClaims {
        sub: user_id,
        role: role.as_str().to_string(),
        exp,
        iat: now.timestamp() as usize,
    };
    jsonwebtoken::encode(&Header::default(), &claims, &config.encoding_key())
}

pub fn decode_token(
    token: &str,
    config: &AuthConfig,
) -> jsonwebtoken::errors::Result<SessionClaims> {
    jsonwebtoken::decode::<SessionClaims>(token, &config.decoding_key(), &Validation::default())
        .map(|data| data.claims)
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| anyhow::anyhow!("failed to hash password: {err}"))
}

/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips_subject_and_role() {
        let config = AuthConfig::new("test-secret");
        let user_id = Uuid::new_v4();
        let token = issue_token(user_id, Role::Sales, &config).unwrap();
        let claims = decode_token(&token, &config).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, "sales");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn oversized_ttl_is_capped() {
        let config = AuthConfig {
            session_ttl_minutes: i64::MAX,
            ..AuthConfig::new("test-secret")
        };
        let token = issue_token(Uuid::new_v4(), Role::User, &config).unwrap();
        let claims = decode_token(&token, &config).unwrap();
        assert_eq!(
            (claims.exp - claims.iat) as i64,
            MAX_SESSION_TTL_MINUTES * 60
        );
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = issue_token(Uuid::new_v4(), Role::User, &AuthConfig::new("one")).unwrap();
        assert!(decode_token(&token, &AuthConfig::new("two")).is_err());
    }

    #[test]
    fn password_hash_verifies_only_the_original() {
        let hash = hash_password("hunter22").unwrap();
        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
        assert!(!verify_password("hunter22", "not-a-phc-string"));
    }
}
