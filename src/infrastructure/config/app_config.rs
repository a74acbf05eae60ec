//! Application configuration.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::args::CliArgs;
use crate::application::StoreSettings;
use crate::infrastructure::socket::SocketChannelConfig;
use crate::infrastructure::socket::constants::{MESSAGING_NAMESPACE, NOTIFICATIONS_NAMESPACE};

pub(super) const APP_NAME: &str = "marketchat";
pub(super) const APP_QUALIFIER: &str = "com";
pub(super) const APP_ORGANIZATION: &str = "marketchat";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Contents of `config.toml`, overridable from the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration file path.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[serde(default)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Id of the signed-in marketplace user.
    #[serde(default)]
    pub user_id: Option<String>,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub messaging: MessagingConfig,

    #[serde(default)]
    pub socket: SocketConfig,

    #[serde(default)]
    pub notifications: NotificationsConfig,
}

/// Backend endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// REST base URL, e.g. `https://api.example.com/v1`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Socket server URL. Defaults to the origin of `base_url`.
    #[serde(default)]
    pub socket_url: Option<String>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            socket_url: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ApiConfig {
    /// Socket URL, falling back to the scheme and authority of `base_url`.
    #[must_use]
    pub fn effective_socket_url(&self) -> String {
        if let Some(url) = self.socket_url.as_deref().filter(|u| !u.trim().is_empty()) {
            return url.trim().to_string();
        }

        let base = self.base_url.trim();
        match Url::parse(base).map(|url| url.origin()) {
            Ok(origin) if origin.is_tuple() => origin.ascii_serialization(),
            _ => base.to_string(),
        }
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Messaging store tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingConfig {
    /// Thread-list reloads while waiting for a new order's thread.
    #[serde(default = "default_thread_poll_attempts")]
    pub thread_poll_attempts: u32,

    #[serde(default = "default_thread_poll_interval_ms")]
    pub thread_poll_interval_ms: u64,

    /// Extra attempts for a failed read receipt.
    #[serde(default = "default_mark_read_retries")]
    pub mark_read_retries: u32,

    #[serde(default = "default_mark_read_retry_delay_ms")]
    pub mark_read_retry_delay_ms: u64,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            thread_poll_attempts: default_thread_poll_attempts(),
            thread_poll_interval_ms: default_thread_poll_interval_ms(),
            mark_read_retries: default_mark_read_retries(),
            mark_read_retry_delay_ms: default_mark_read_retry_delay_ms(),
        }
    }
}

impl MessagingConfig {
    #[must_use]
    pub const fn store_settings(&self) -> StoreSettings {
        StoreSettings {
            thread_poll_attempts: self.thread_poll_attempts,
            thread_poll_interval: Duration::from_millis(self.thread_poll_interval_ms),
            mark_read_retries: self.mark_read_retries,
            mark_read_retry_delay: Duration::from_millis(self.mark_read_retry_delay_ms),
        }
    }
}

/// Socket reconnection policy and namespaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketConfig {
    #[serde(default = "default_true")]
    pub auto_reconnect: bool,

    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    #[serde(default = "default_reconnect_delay_max_ms")]
    pub reconnect_delay_max_ms: u64,

    #[serde(default = "default_messaging_namespace")]
    pub messaging_namespace: String,

    #[serde(default = "default_notifications_namespace")]
    pub notifications_namespace: String,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            reconnect_delay_max_ms: default_reconnect_delay_max_ms(),
            messaging_namespace: default_messaging_namespace(),
            notifications_namespace: default_notifications_namespace(),
        }
    }
}

/// Desktop alert configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Show desktop notifications for inbox items.
    #[serde(default = "default_true")]
    pub desktop: bool,

    /// Ring the terminal bell for incoming messages.
    #[serde(default = "default_true")]
    pub sound: bool,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            desktop: true,
            sound: true,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:3000/api/v1".to_string()
}

const fn default_request_timeout_secs() -> u64 {
    30
}

const fn default_thread_poll_attempts() -> u32 {
    10
}

const fn default_thread_poll_interval_ms() -> u64 {
    1000
}

const fn default_mark_read_retries() -> u32 {
    3
}

const fn default_mark_read_retry_delay_ms() -> u64 {
    500
}

const fn default_max_reconnect_attempts() -> u32 {
    10
}

const fn default_reconnect_delay_ms() -> u64 {
    1000
}

const fn default_reconnect_delay_max_ms() -> u64 {
    30_000
}

fn default_messaging_namespace() -> String {
    MESSAGING_NAMESPACE.to_string()
}

fn default_notifications_namespace() -> String {
    NOTIFICATIONS_NAMESPACE.to_string()
}

const fn default_true() -> bool {
    true
}

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(config_path) = &args.config {
            self.config = Some(config_path.clone());
        }
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(user_id) = &args.user_id {
            self.user_id = Some(user_id.clone());
        }
        if let Some(base_url) = &args.api_url {
            self.api.base_url = base_url.clone();
        }
        if let Some(socket_url) = &args.socket_url {
            self.api.socket_url = Some(socket_url.clone());
        }
        if let Some(desktop) = args.desktop_notifications {
            self.notifications.desktop = desktop;
        }
        if let Some(sound) = args.sound {
            self.notifications.sound = sound;
        }
    }

    /// Channel settings for `namespace`.
    #[must_use]
    pub fn socket_channel_config(&self, namespace: &str) -> SocketChannelConfig {
        SocketChannelConfig::new(self.api.effective_socket_url(), namespace)
            .with_auto_reconnect(self.socket.auto_reconnect)
            .with_max_reconnect_attempts(self.socket.max_reconnect_attempts)
            .with_reconnect_delays(
                Duration::from_millis(self.socket.reconnect_delay_ms),
                Duration::from_millis(self.socket.reconnect_delay_max_ms),
                Duration::from_millis(self.socket.reconnect_delay_ms / 2),
            )
    }

    /// Returns default config directory.
    #[must_use]
    pub fn default_config_dir() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Returns default log file path.
    #[must_use]
    pub fn default_log_path() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.data_dir().join("marketchat.log"))
    }

    /// Returns effective log path.
    #[must_use]
    pub fn effective_log_path(&self) -> Option<PathBuf> {
        self.log_path.clone().or_else(Self::default_log_path)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config: None,
            log_path: None,
            log_level: LogLevel::Info,
            user_id: None,
            api: ApiConfig::default(),
            messaging: MessagingConfig::default(),
            socket: SocketConfig::default(),
            notifications: NotificationsConfig::default(),
        }
    }
}
