//! Infrastructure layer with external service adapters.

/// Application configuration.
pub mod config;
/// Marketplace REST client.
pub mod http;
/// Desktop alerts.
pub mod notifications;
/// Socket.IO channels.
pub mod socket;
/// Token storage adapters.
pub mod storage;

pub use config::{AppConfig, CliArgs, Command, LogLevel, StorageManager};
pub use http::MarketplaceClient;
pub use notifications::DesktopAlertService;
pub use socket::{SocketChannel, SocketChannelConfig};
pub use storage::KeyringTokenStorage;
