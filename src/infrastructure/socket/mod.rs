//! Socket.IO channels over websockets.
//!
//! One [`SocketChannel`] per namespace; each speaks Engine.IO v4 framing,
//! authenticates with the session token in the namespace `CONNECT` packet
//! and reconnects with exponential backoff.

mod client;
mod codec;
mod connection;
pub mod constants;
mod error;
mod events;
mod rooms;
mod state;

pub use client::{SocketChannel, SocketChannelConfig, TransportFactory};
pub use codec::{EnginePacket, OpenPayload, SocketPacket};
pub use connection::{ChannelHandler, SocketTransport, WebSocketTransport, engine_url};
pub use error::{SocketError, SocketResult};
pub use events::{ChannelCommand, EventParser};
pub use rooms::{RoomDiff, RoomRegistry};
pub use state::{ChannelState, ConnectionState};
