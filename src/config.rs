use std::env;
use std::str::FromStr;
use std::time::Duration;

use chrono::FixedOffset;
use thiserror::Error;

use crate::infrastructure::{resend, stripe};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}

/// Runtime settings read from the environment (after `.env` is loaded).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub stripe_api_base: String,
    pub stripe_webhook_tolerance_secs: i64,
    pub resend_api_key: String,
    pub resend_api_url: String,
    pub email_from: String,
    pub admin_email: String,
    pub app_url: String,
    pub jwt_secret: String,
    pub outbox_poll_interval: Duration,
    pub outbox_batch_size: i64,
    pub outbox_max_attempts: i32,
    pub display_offset: FixedOffset,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads settings through `lookup`; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let offset_minutes: i32 = parsed(&get, "DISPLAY_UTC_OFFSET_MINUTES", 600)?;
        let display_offset = FixedOffset::east_opt(offset_minutes * 60).ok_or(ConfigError::Invalid {
            key: "DISPLAY_UTC_OFFSET_MINUTES",
            value: offset_minutes.to_string(),
        })?;

        let outbox_batch_size: i64 = parsed(&get, "OUTBOX_BATCH_SIZE", 50)?;
        if outbox_batch_size < 1 {
            return Err(ConfigError::Invalid {
                key: "OUTBOX_BATCH_SIZE",
                value: outbox_batch_size.to_string(),
            });
        }

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            host: or("HOST", "0.0.0.0"),
            port: parsed(&get, "PORT", 8080)?,
            stripe_secret_key: required("STRIPE_SECRET_KEY")?,
            stripe_webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
            stripe_api_base: or("STRIPE_API_BASE", stripe::DEFAULT_API_BASE),
            stripe_webhook_tolerance_secs: parsed(&get, "STRIPE_WEBHOOK_TOLERANCE_SECS", 300)?,
            resend_api_key: required("RESEND_API_KEY")?,
            resend_api_url: or("RESEND_API_URL", resend::DEFAULT_API_URL),
            email_from: required("EMAIL_FROM")?,
            admin_email: required("ADMIN_EMAIL")?,
            app_url: or("APP_URL", "http://localhost:3000"),
            jwt_secret: required("JWT_SECRET")?,
            outbox_poll_interval: Duration::from_secs(parsed(&get, "OUTBOX_POLL_INTERVAL_SECS", 10)?),
            outbox_batch_size,
            outbox_max_attempts: parsed(&get, "OUTBOX_MAX_ATTEMPTS", 5)?,
            display_offset,
        })
    }
}

fn parsed<T: FromStr>(get: &impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, ConfigError> {
    match get(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}
