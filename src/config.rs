//! Environment-driven configuration.

use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use thiserror::Error;
use tracing::{info, warn};

use crate::session_store::DEFAULT_TABLE_NAME;

const DEV_SESSION_SECRET: &str = "ticketdesk-development-secret-change-me";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("{0} must be set")]
    Missing(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Environment::Production),
            "development" | "dev" | "test" => Ok(Environment::Development),
            other => Err(format!("unknown environment `{other}`")),
        }
    }
}

#[derive(Clone)]
pub struct SessionConfig {
    pub secret: String,
    pub cookie_name: String,
    pub table_name: String,
    /// Fixed lifetime from login.
    pub ttl: time::Duration,
    /// Forces the `Secure` cookie attribute outside production.
    pub force_secure: bool,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &"[redacted]")
            .field("cookie_name", &self.cookie_name)
            .field("table_name", &self.table_name)
            .field("ttl", &self.ttl)
            .field("force_secure", &self.force_secure)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CorsConfig {
    pub enabled: bool,
    pub origin: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_attempts: usize,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            window: Duration::from_secs(15 * 60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub environment: Environment,
    pub session: SessionConfig,
    pub cors: CorsConfig,
    pub upload_dir: PathBuf,
    pub trust_proxy: bool,
    pub login_rate_limit: RateLimitConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3001,
            database_url: "sqlite://data.sqlite?mode=rwc".to_string(),
            environment: Environment::Development,
            session: SessionConfig {
                secret: DEV_SESSION_SECRET.to_string(),
                cookie_name: "connect.sid".to_string(),
                table_name: DEFAULT_TABLE_NAME.to_string(),
                ttl: time::Duration::hours(4),
                force_secure: false,
            },
            cors: CorsConfig::default(),
            upload_dir: PathBuf::from("uploads"),
            trust_proxy: false,
            login_rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Config {
    /// Reads the process environment on top of [`Config::default`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = parse_or("APP_ENV", get("APP_ENV"), defaults.environment)?;

        let secret = match get("SESSION_SECRET") {
            Some(secret) => secret,
            None if environment.is_production() => return Err(ConfigError::Missing("SESSION_SECRET")),
            None => {
                warn!("SESSION_SECRET not set, using the development secret");
                defaults.session.secret
            }
        };

        let cors = CorsConfig {
            enabled: parse_or("CORS_ENABLED", get("CORS_ENABLED"), false)?,
            origin: get("CORS_ORIGIN"),
        };
        if cors.enabled && cors.origin.is_none() {
            return Err(ConfigError::Missing("CORS_ORIGIN"));
        }

        let login_rate_limit = RateLimitConfig {
            max_attempts: parse_or(
                "LOGIN_RATE_LIMIT_MAX",
                get("LOGIN_RATE_LIMIT_MAX"),
                defaults.login_rate_limit.max_attempts,
            )?,
            window: Duration::from_secs(parse_or(
                "LOGIN_RATE_LIMIT_WINDOW_SECS",
                get("LOGIN_RATE_LIMIT_WINDOW_SECS"),
                defaults.login_rate_limit.window.as_secs(),
            )?),
        };

        Ok(Self {
            port: parse_or("PORT", get("PORT"), defaults.port)?,
            database_url: get("DATABASE_URL").unwrap_or_else(|| {
                info!(default = %defaults.database_url, "DATABASE_URL not set, using default");
                defaults.database_url
            }),
            environment,
            session: SessionConfig {
                secret,
                cookie_name: get("SESSION_COOKIE_NAME").unwrap_or(defaults.session.cookie_name),
                table_name: get("SESSION_TABLE").unwrap_or(defaults.session.table_name),
                ttl: defaults.session.ttl,
                force_secure: parse_or("COOKIE_SECURE", get("COOKIE_SECURE"), false)?,
            },
            cors,
            upload_dir: get("UPLOAD_DIR").map(PathBuf::from).unwrap_or(defaults.upload_dir),
            trust_proxy: parse_or("TRUST_PROXY", get("TRUST_PROXY"), false)?,
            login_rate_limit,
        })
    }

    /// `Secure` is required in production, when forced, and whenever
    /// cross-origin cookies (`SameSite=None`) are in use.
    pub fn secure_cookies(&self) -> bool {
        self.environment.is_production() || self.session.force_secure || self.cors.enabled
    }
}

trait ParseValue: Sized {
    fn parse_value(raw: &str) -> Result<Self, String>;
}

impl ParseValue for bool {
    fn parse_value(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(format!("expected a boolean, got `{other}`")),
        }
    }
}

macro_rules! parse_value_from_str {
    ($($ty:ty),*) => {
        $(impl ParseValue for $ty {
            fn parse_value(raw: &str) -> Result<Self, String> {
                raw.trim().parse().map_err(display)
            }
        })*
    };
}

parse_value_from_str!(u16, u64, usize, Environment);

fn display(e: impl Display) -> String {
    e.to_string()
}

fn parse_or<T: ParseValue>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(raw) => T::parse_value(&raw).map_err(|message| {
            warn!("Invalid {key} value: {message}");
            ConfigError::Invalid { key, message }
        }),
    }
}
