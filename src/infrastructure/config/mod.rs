//! Application configuration.

pub mod app_config;
pub mod args;
pub mod storage;

pub use app_config::{
    ApiConfig, AppConfig, LogLevel, MessagingConfig, NotificationsConfig, SocketConfig,
};
pub use args::{ApproveArgs, CliArgs, Command, OpenArgs, SendArgs, ThreadTarget, WatchArgs};
pub use storage::{ConfigError, StorageManager};
