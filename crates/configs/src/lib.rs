//! # configs
//!
//! Layered settings for goodfeed. Sources, later ones winning:
//!
//! 1. built-in defaults
//! 2. `config/default.toml` (optional)
//! 3. `config/local.toml` (optional, not committed)
//! 4. environment variables prefixed `GOODFEED`, nested with `__`
//!    (e.g. `GOODFEED__AUTH__JWT_SECRET`), after `.env` has been loaded
//!
//! Backend sections are only mandatory when the matching cargo feature is on.

use config::{Config, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use services::PolicyConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("missing required setting `{0}`")]
    Missing(&'static str),
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    #[serde(default)]
    pub database: Option<DatabaseSettings>,
    #[serde(default)]
    pub redis: Option<RedisSettings>,
    pub auth: AuthSettings,
    pub otp: OtpSettings,
    pub media: MediaSettings,
    pub mail: MailSettings,
    #[serde(default)]
    pub policy: PolicyConfig,
    pub log: LogSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Origins allowed by CORS. Empty means same-origin only.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    pub url: SecretString,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

#[derive(Debug, Deserialize)]
pub struct RedisSettings {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct AuthSettings {
    #[serde(default)]
    pub jwt_secret: Option<SecretString>,
    pub token_ttl_secs: i64,
}

#[derive(Debug, Deserialize)]
pub struct OtpSettings {
    pub ttl_secs: i64,
}

#[derive(Debug, Deserialize)]
pub struct MediaSettings {
    pub root: String,
    pub url_prefix: String,
    pub max_bytes: usize,
}

#[derive(Debug, Deserialize)]
pub struct MailSettings {
    pub from: String,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<SecretString>,
}

#[derive(Debug, Deserialize)]
pub struct LogSettings {
    pub filter: String,
    pub json: bool,
}

impl Settings {
    /// Reads `.env`, then every layer listed in the module docs.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_config(layered()?)
    }

    /// Defaults only; tests layer their own overrides on top.
    pub fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Ok(Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 5000)?
            .set_default("auth.token_ttl_secs", 3600)?
            .set_default("otp.ttl_secs", 600)?
            .set_default("media.root", "./data/uploads")?
            .set_default("media.url_prefix", "/media")?
            .set_default("media.max_bytes", 5 * 1024 * 1024)?
            .set_default("mail.from", "no-reply@goodfeed.local")?
            .set_default("log.filter", "info,tower_http=info")?
            .set_default("log.json", false)?)
    }

    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match &self.auth.jwt_secret {
            Some(secret) if !secret.expose_secret().is_empty() => {}
            _ => return Err(ConfigError::Missing("auth.jwt_secret")),
        }
        #[cfg(feature = "db-postgres")]
        if self.database.is_none() {
            return Err(ConfigError::Missing("database.url"));
        }
        #[cfg(feature = "redis")]
        if self.redis.is_none() {
            return Err(ConfigError::Missing("redis.url"));
        }
        #[cfg(feature = "mail-http")]
        if self.mail.api_url.is_none() || self.mail.api_key.is_none() {
            return Err(ConfigError::Missing("mail.api_url / mail.api_key"));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl DatabaseSettings {
    /// Only the `database` section, for tools that never serve requests.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_config(layered()?)
    }

    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        match config.get::<DatabaseSettings>("database") {
            Ok(db) => Ok(db),
            Err(config::ConfigError::NotFound(_)) => Err(ConfigError::Missing("database.url")),
            Err(e) => Err(e.into()),
        }
    }
}

fn layered() -> Result<Config, ConfigError> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "loaded .env");
    }
    Ok(Settings::builder()?
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name("config/local").required(false))
        .add_source(Environment::with_prefix("GOODFEED").separator("__"))
        .build()?)
}
