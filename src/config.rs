//! Configuration types for tgmedia-dl

use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

use crate::error::{Error, Result};

/// Smallest accepted concurrency limit
pub const MIN_CONCURRENT_DOWNLOADS: usize = 1;
/// Largest accepted concurrency limit
pub const MAX_CONCURRENT_DOWNLOADS: usize = 20;
/// Shortest accepted progress refresh interval
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(100);
/// Longest accepted progress refresh interval
pub const MAX_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Download behavior configuration (directories, concurrency, re-download policy)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadConfig {
    /// Download directory (default: "./downloads")
    #[serde(default = "default_download_dir")]
    #[schema(value_type = String)]
    pub download_dir: PathBuf,

    /// Maximum concurrent downloads (default: 3, valid 1..=20)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_downloads: usize,

    /// Minimum time between progress emissions per task (default: 1s, valid 0.1..=60s)
    #[serde(default = "default_refresh_interval", with = "secs_f64_serde")]
    #[schema(value_type = f64)]
    pub refresh_interval: Duration,

    /// Skip objects that already have a complete artifact on disk (default: true)
    #[serde(default = "default_true")]
    pub skip_existing: bool,

    /// Delete any existing artifact and transfer unconditionally (default: false)
    #[serde(default)]
    pub force_redownload: bool,

    /// Bucket files into per-category subdirectories (default: false)
    #[serde(default)]
    pub classify_by_type: bool,

    /// Folder used when the container has no resolvable title (default: "save")
    #[serde(default = "default_fallback_dir")]
    pub fallback_dir: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            max_concurrent_downloads: default_max_concurrent(),
            refresh_interval: default_refresh_interval(),
            skip_existing: true,
            force_redownload: false,
            classify_by_type: false,
            fallback_dir: default_fallback_dir(),
        }
    }
}

/// Outbound chat notification settings
///
/// The limits apply to every send, edit and delete against the notification sink.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct NotificationConfig {
    /// Maximum notification calls in any 1-second window (default: 20)
    #[serde(default = "default_max_per_second")]
    pub max_per_second: usize,

    /// Maximum notification calls in any 60-second window (default: 1000)
    #[serde(default = "default_max_per_minute")]
    pub max_per_minute: usize,

    /// Maintain one aggregate progress message per owner (default: true)
    #[serde(default = "default_true")]
    pub progress_messages: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            max_per_second: default_max_per_second(),
            max_per_minute: default_max_per_minute(),
            progress_messages: true,
        }
    }
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PersistenceConfig {
    /// Database path (default: "./tgmedia-dl.db")
    #[serde(default = "default_database_path")]
    #[schema(value_type = String)]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// API and external server integration configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:6790)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

/// Main configuration for TaskManager
///
/// Fields are organized into sub-configs:
/// - [`download`](DownloadConfig) — directories, concurrency, re-download policy
/// - [`notifications`](NotificationConfig) — chat rate limits
/// - [`persistence`](PersistenceConfig) — database location
/// - [`server`](ServerIntegrationConfig) — REST API
///
/// `download`, `notifications` and `server` are flattened, so the serialized form
/// is a flat object apart from `persistence`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Download behavior settings
    #[serde(flatten)]
    pub download: DownloadConfig,

    /// Notification rate limits
    #[serde(flatten)]
    pub notifications: NotificationConfig,

    /// Data storage
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// API and external server integration
    #[serde(flatten)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Download directory
    pub fn download_dir(&self) -> &PathBuf {
        &self.download.download_dir
    }

    /// Check every bounded setting
    ///
    /// Returns `Error::Config` naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        validate_concurrency(self.download.max_concurrent_downloads)?;
        validate_refresh_interval(self.download.refresh_interval)?;

        if self.notifications.max_per_second == 0 {
            return Err(Error::Config {
                message: "max_per_second must be at least 1".to_string(),
                key: Some("max_per_second".to_string()),
            });
        }
        if self.notifications.max_per_minute < self.notifications.max_per_second {
            return Err(Error::Config {
                message: "max_per_minute must not be smaller than max_per_second".to_string(),
                key: Some("max_per_minute".to_string()),
            });
        }
        if self.download.fallback_dir.trim().is_empty() {
            return Err(Error::Config {
                message: "fallback_dir must not be empty".to_string(),
                key: Some("fallback_dir".to_string()),
            });
        }

        Ok(())
    }
}

/// Check a concurrency limit against the accepted range
pub fn validate_concurrency(limit: usize) -> Result<()> {
    if !(MIN_CONCURRENT_DOWNLOADS..=MAX_CONCURRENT_DOWNLOADS).contains(&limit) {
        return Err(Error::Config {
            message: format!(
                "max_concurrent_downloads must be between {} and {}, got {}",
                MIN_CONCURRENT_DOWNLOADS, MAX_CONCURRENT_DOWNLOADS, limit
            ),
            key: Some("max_concurrent_downloads".to_string()),
        });
    }
    Ok(())
}

/// Check a refresh interval against the accepted range
pub fn validate_refresh_interval(interval: Duration) -> Result<()> {
    if interval < MIN_REFRESH_INTERVAL || interval > MAX_REFRESH_INTERVAL {
        return Err(Error::Config {
            message: format!(
                "refresh_interval must be between {:.1}s and {:.1}s, got {:.3}s",
                MIN_REFRESH_INTERVAL.as_secs_f64(),
                MAX_REFRESH_INTERVAL.as_secs_f64(),
                interval.as_secs_f64()
            ),
            key: Some("refresh_interval".to_string()),
        });
    }
    Ok(())
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_max_concurrent() -> usize {
    3
}

fn default_refresh_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_fallback_dir() -> String {
    "save".to_string()
}

fn default_max_per_second() -> usize {
    20
}

fn default_max_per_minute() -> usize {
    1000
}

fn default_database_path() -> PathBuf {
    PathBuf::from("tgmedia-dl.db")
}

fn default_true() -> bool {
    true
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 6790))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

// Fractional-seconds Duration serialization helper (refresh intervals go below 1s)
mod secs_f64_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
