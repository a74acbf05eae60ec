mod alert_port;
mod marketplace_port;
mod socket_port;
mod token_storage_port;

pub use alert_port::{AlertPort, SilentAlerts};
pub use marketplace_port::MarketplacePort;
pub use socket_port::{SocketEvent, SocketPort};
pub use token_storage_port::TokenStoragePort;

#[cfg(test)]
pub use marketplace_port::MockMarketplacePort;
