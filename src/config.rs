//! Process configuration for the training lifecycle.
//!
//! Configuration is read from environment-style key/value pairs. The
//! [`TrainyardConfig::from_env`] constructor loads an optional `.env` file
//! first; [`TrainyardConfig::from_lookup`] accepts any lookup closure so tests
//! never touch the process environment.

use camino::Utf8PathBuf;
use reqwest::Method;
use std::num::NonZeroUsize;
use std::time::Duration;
use thiserror::Error;

/// Bearer credential for the training host.
pub const HOST_TOKEN_KEY: &str = "TRAINYARD_HOST_TOKEN";
/// Default container image reference for training jobs.
pub const DEFAULT_IMAGE_KEY: &str = "TRAINYARD_DEFAULT_IMAGE";
/// Ceiling in seconds for ping, status, logs, and cancel calls.
pub const REQUEST_TIMEOUT_KEY: &str = "TRAINYARD_REQUEST_TIMEOUT_SECS";
/// Ceiling in seconds for the training upload.
pub const TRAIN_TIMEOUT_KEY: &str = "TRAINYARD_TRAIN_TIMEOUT_SECS";
/// Ceiling in seconds for streaming a training result.
pub const RESULT_TIMEOUT_KEY: &str = "TRAINYARD_RESULT_TIMEOUT_SECS";
/// Longest silence in seconds tolerated while reading a host response.
pub const HOST_IDLE_TIMEOUT_KEY: &str = "TRAINYARD_HOST_IDLE_TIMEOUT_SECS";
/// Upper bound for the uploaded training payload.
pub const MAX_PAYLOAD_BYTES_KEY: &str = "TRAINYARD_MAX_PAYLOAD_BYTES";
/// Upper bound for the downloaded training result.
pub const MAX_RESULT_BYTES_KEY: &str = "TRAINYARD_MAX_RESULT_BYTES";
/// Root directory for model artifacts.
pub const ARTIFACT_ROOT_KEY: &str = "TRAINYARD_ARTIFACT_ROOT";
/// Root directory for project backups.
pub const BACKUP_ROOT_KEY: &str = "TRAINYARD_BACKUP_ROOT";
/// Post-training webhook URL.
pub const WEBHOOK_URL_KEY: &str = "TRAINYARD_WEBHOOK_URL";
/// Post-training webhook HTTP method.
pub const WEBHOOK_METHOD_KEY: &str = "TRAINYARD_WEBHOOK_METHOD";
/// Ceiling in seconds for one webhook delivery.
pub const WEBHOOK_TIMEOUT_KEY: &str = "TRAINYARD_WEBHOOK_TIMEOUT_SECS";
/// Reconcile cadence in seconds.
pub const POLL_INTERVAL_KEY: &str = "TRAINYARD_POLL_INTERVAL_SECS";
/// Maximum concurrent reconciles per poll pass.
pub const POLL_CONCURRENCY_KEY: &str = "TRAINYARD_POLL_CONCURRENCY";
/// PostgreSQL connection string for the durable registries.
pub const DATABASE_URL_KEY: &str = "DATABASE_URL";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TRAIN_TIMEOUT_SECS: u64 = 300;
const DEFAULT_HOST_IDLE_TIMEOUT_SECS: u64 = 120;
const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 10;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
const DEFAULT_POLL_CONCURRENCY: usize = 4;
const DEFAULT_ARTIFACT_ROOT: &str = "data/models";
const DEFAULT_BACKUP_ROOT: &str = "data/backups";

/// Errors raised for missing or malformed operator configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required key is absent.
    #[error("missing required configuration: {0}")]
    Missing(&'static str),

    /// A key is present but its value cannot be used.
    #[error("invalid value for {key}: {reason}")]
    Invalid {
        /// Configuration key.
        key: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// Neither the caller nor the process configuration supplies a container
    /// image for a training job.
    #[error("no training image supplied and {DEFAULT_IMAGE_KEY} is not set")]
    MissingImage,
}

/// Settings for the training host protocol client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostClientSettings {
    /// Bearer credential sent to the training host.
    pub token: Option<String>,
    /// Image used when a submission does not name one.
    pub default_image: Option<String>,
    /// Ceiling for short control calls.
    pub request_timeout: Duration,
    /// Ceiling for the training upload; `None` waits indefinitely.
    pub train_timeout: Option<Duration>,
    /// Ceiling for result streaming; `None` waits indefinitely.
    pub result_timeout: Option<Duration>,
    /// Longest gap between two reads of any response body.
    pub idle_timeout: Duration,
    /// Largest accepted training payload.
    pub max_payload_bytes: Option<u64>,
    /// Largest accepted training result.
    pub max_result_bytes: Option<u64>,
}

impl Default for HostClientSettings {
    fn default() -> Self {
        Self {
            token: None,
            default_image: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            train_timeout: Some(Duration::from_secs(DEFAULT_TRAIN_TIMEOUT_SECS)),
            result_timeout: None,
            idle_timeout: Duration::from_secs(DEFAULT_HOST_IDLE_TIMEOUT_SECS),
            max_payload_bytes: None,
            max_result_bytes: None,
        }
    }
}

/// Filesystem roots for artifacts and backups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    /// Root directory holding one subdirectory of model files per project.
    pub artifact_root: Utf8PathBuf,
    /// Root directory holding one subdirectory of exports per project.
    pub backup_root: Utf8PathBuf,
}

/// Outbound notification sent after a model artifact is captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookSettings {
    /// Target URL.
    pub url: String,
    /// HTTP method.
    pub method: Method,
    /// Ceiling for one delivery, response included.
    pub timeout: Duration,
}

/// Cadence and fan-out of the background reconcile loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerSettings {
    /// Delay between reconcile passes.
    pub interval: Duration,
    /// Maximum jobs reconciled concurrently within a pass.
    pub concurrency: NonZeroUsize,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            concurrency: NonZeroUsize::MIN.saturating_add(DEFAULT_POLL_CONCURRENCY - 1),
        }
    }
}

/// Complete process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainyardConfig {
    /// Training host client settings.
    pub host: HostClientSettings,
    /// Storage roots.
    pub storage: StorageSettings,
    /// Optional post-training webhook.
    pub webhook: Option<WebhookSettings>,
    /// Reconcile loop settings.
    pub poller: PollerSettings,
    /// PostgreSQL connection string, when durable registries are used.
    pub database_url: Option<String>,
}

impl TrainyardConfig {
    /// Loads configuration from the process environment, reading `.env` first
    /// when present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for malformed values.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    ///
    /// Blank values are treated as absent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for malformed values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let host = HostClientSettings {
            token: read(HOST_TOKEN_KEY),
            default_image: read(DEFAULT_IMAGE_KEY),
            request_timeout: parse_seconds(REQUEST_TIMEOUT_KEY, read(REQUEST_TIMEOUT_KEY))?
                .unwrap_or(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
            train_timeout: Some(
                parse_seconds(TRAIN_TIMEOUT_KEY, read(TRAIN_TIMEOUT_KEY))?
                    .unwrap_or(Duration::from_secs(DEFAULT_TRAIN_TIMEOUT_SECS)),
            ),
            result_timeout: parse_seconds(RESULT_TIMEOUT_KEY, read(RESULT_TIMEOUT_KEY))?,
            idle_timeout: parse_seconds(HOST_IDLE_TIMEOUT_KEY, read(HOST_IDLE_TIMEOUT_KEY))?
                .unwrap_or(Duration::from_secs(DEFAULT_HOST_IDLE_TIMEOUT_SECS)),
            max_payload_bytes: parse_u64(MAX_PAYLOAD_BYTES_KEY, read(MAX_PAYLOAD_BYTES_KEY))?,
            max_result_bytes: parse_u64(MAX_RESULT_BYTES_KEY, read(MAX_RESULT_BYTES_KEY))?,
        };

        let storage = StorageSettings {
            artifact_root: read(ARTIFACT_ROOT_KEY)
                .map_or_else(|| Utf8PathBuf::from(DEFAULT_ARTIFACT_ROOT), Utf8PathBuf::from),
            backup_root: read(BACKUP_ROOT_KEY)
                .map_or_else(|| Utf8PathBuf::from(DEFAULT_BACKUP_ROOT), Utf8PathBuf::from),
        };

        let webhook = read(WEBHOOK_URL_KEY)
            .map(|url| {
                parse_webhook(
                    url,
                    read(WEBHOOK_METHOD_KEY),
                    parse_seconds(WEBHOOK_TIMEOUT_KEY, read(WEBHOOK_TIMEOUT_KEY))?,
                )
            })
            .transpose()?;

        let poller = parse_poller(read(POLL_INTERVAL_KEY), read(POLL_CONCURRENCY_KEY))?;

        Ok(Self {
            host,
            storage,
            webhook,
            poller,
            database_url: read(DATABASE_URL_KEY),
        })
    }

    /// Returns the database URL or a [`ConfigError::Missing`] error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when `DATABASE_URL` is not set.
    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or(ConfigError::Missing(DATABASE_URL_KEY))
    }
}

fn parse_u64(key: &'static str, value: Option<String>) -> Result<Option<u64>, ConfigError> {
    value
        .map(|raw| {
            raw.parse::<u64>().map_err(|err| ConfigError::Invalid {
                key,
                reason: err.to_string(),
            })
        })
        .transpose()
}

fn parse_seconds(
    key: &'static str,
    value: Option<String>,
) -> Result<Option<Duration>, ConfigError> {
    let Some(seconds) = parse_u64(key, value)? else {
        return Ok(None);
    };
    if seconds == 0 {
        return Err(ConfigError::Invalid {
            key,
            reason: String::from("must be greater than zero"),
        });
    }
    Ok(Some(Duration::from_secs(seconds)))
}

fn parse_webhook(
    url: String,
    raw_method: Option<String>,
    timeout: Option<Duration>,
) -> Result<WebhookSettings, ConfigError> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::Invalid {
            key: WEBHOOK_URL_KEY,
            reason: format!("'{url}' must start with 'http://' or 'https://'"),
        });
    }
    let method = match raw_method {
        None => Method::POST,
        Some(raw) => match raw.to_ascii_uppercase().as_str() {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "PATCH" => Method::PATCH,
            _ => {
                return Err(ConfigError::Invalid {
                    key: WEBHOOK_METHOD_KEY,
                    reason: format!("unsupported method '{raw}'"),
                });
            }
        },
    };
    Ok(WebhookSettings {
        url,
        method,
        timeout: timeout.unwrap_or(Duration::from_secs(DEFAULT_WEBHOOK_TIMEOUT_SECS)),
    })
}

fn parse_poller(
    raw_interval: Option<String>,
    raw_concurrency: Option<String>,
) -> Result<PollerSettings, ConfigError> {
    let defaults = PollerSettings::default();
    let interval = parse_seconds(POLL_INTERVAL_KEY, raw_interval)?.unwrap_or(defaults.interval);
    let concurrency = match raw_concurrency {
        None => defaults.concurrency,
        Some(raw) => raw
            .parse::<NonZeroUsize>()
            .map_err(|err| ConfigError::Invalid {
                key: POLL_CONCURRENCY_KEY,
                reason: err.to_string(),
            })?,
    };
    Ok(PollerSettings {
        interval,
        concurrency,
    })
}
