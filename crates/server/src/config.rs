use anyhow::{Context, Result};
use api::auth::{AuthConfig, DEFAULT_SESSION_TTL_MINUTES, MAX_SESSION_TTL_MINUTES};

const DEV_AUTH_SECRET: &str = "crm-dev-secret-change-me";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub auth_secret: String,
    pub session_ttl_minutes: i64,
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let auth_secret = match std::env::var("AUTH_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ => {
                tracing::warn!("AUTH_SECRET not set; signing tokens with the development secret");
                DEV_AUTH_SECRET.to_string()
            }
        };

        let session_ttl_minutes =
            parse_session_ttl(std::env::var("SESSION_TTL_MINUTES").ok().as_deref())?;

        let cors_allowed_origins =
            parse_origins(&std::env::var("CORS_ALLOWED_ORIGINS").unwrap_or_default());

        Ok(Self {
            auth_secret,
            session_ttl_minutes,
            cors_allowed_origins,
        })
    }

    pub fn auth(&self) -> AuthConfig {
        AuthConfig {
            jwt_secret: self.auth_secret.clone(),
            session_ttl_minutes: self.session_ttl_minutes,
        }
    }
}

pub fn parse_session_ttl(raw: Option<&str>) -> Result<i64> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_SESSION_TTL_MINUTES);
    };
    let minutes = raw
        .trim()
        .parse::<i64>()
        .context("invalid SESSION_TTL_MINUTES")?;
    anyhow::ensure!(
        (1..=MAX_SESSION_TTL_MINUTES).contains(&minutes),
        "SESSION_TTL_MINUTES must be between 1 and {MAX_SESSION_TTL_MINUTES}"
    );
    Ok(minutes)
}

/// Comma separated origins; blanks are dropped and an empty list allows any origin.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
