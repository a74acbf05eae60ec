//! Domain layer with core business entities and port definitions.

/// Socket connection status.
pub mod connection;
/// Entity definitions and lifecycle state machines.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;
/// Serde utilities.
pub mod serde_utils;
/// Backend wire shapes.
#[allow(missing_docs)]
pub mod wire;

pub use connection::ConnectionStatus;
pub use entities::{AuthToken, Message, Order, OrderStatus, Thread, ThreadId, UserId};
pub use errors::{AuthError, MessagingError, TransportError};
pub use ports::{AlertPort, MarketplacePort, SocketEvent, SocketPort, TokenStoragePort};
