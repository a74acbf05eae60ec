use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, timeout};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};

use super::codec::{EnginePacket, OpenPayload, SocketPacket};
use super::constants::{
    CONNECTION_TIMEOUT, ENGINE_IO_PATH, ENGINE_IO_VERSION, EVENT_JOIN_THREAD, EVENT_LEAVE_THREAD,
    HANDSHAKE_TIMEOUT,
};
use super::error::{SocketError, SocketResult};
use super::events::{ChannelCommand, EventParser};
use super::rooms::RoomRegistry;
use super::state::{ChannelState, ConnectionState};
use crate::domain::entities::ThreadId;
use crate::domain::ports::SocketEvent;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, WsMessage>;
type WsReader = SplitStream<WsStream>;

/// Text-frame transport beneath the Engine.IO session.
#[async_trait]
pub trait SocketTransport: Send {
    async fn connect(&mut self, url: &str) -> SocketResult<()>;
    async fn close(&mut self) -> SocketResult<()>;
    async fn send(&mut self, frame: String) -> SocketResult<()>;
    /// Next text frame. Websocket control frames are answered internally.
    async fn receive(&mut self) -> SocketResult<String>;
    fn is_connected(&self) -> bool;
}

/// Builds the Engine.IO websocket endpoint from the configured socket URL.
///
/// `http(s)` schemes are mapped to `ws(s)`.
///
/// # Errors
/// Returns [`SocketError::InvalidUrl`] for any other scheme.
pub fn engine_url(base: &str) -> SocketResult<String> {
    let base = base.trim().trim_end_matches('/');

    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if base.starts_with("wss://") || base.starts_with("ws://") {
        base.to_string()
    } else {
        return Err(SocketError::InvalidUrl {
            message: format!("unsupported scheme in {base:?}"),
        });
    };

    Ok(format!(
        "{ws_base}{ENGINE_IO_PATH}?EIO={ENGINE_IO_VERSION}&transport=websocket"
    ))
}

pub struct WebSocketTransport {
    writer: Option<WsWriter>,
    reader: Option<WsReader>,
    connected: bool,
}

impl WebSocketTransport {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            writer: None,
            reader: None,
            connected: false,
        }
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SocketTransport for WebSocketTransport {
    async fn connect(&mut self, url: &str) -> SocketResult<()> {
        let (stream, _) = timeout(CONNECTION_TIMEOUT, connect_async(url))
            .await
            .map_err(|_| SocketError::timeout("websocket connection"))?
            .map_err(|e| SocketError::connection_failed(e.to_string()))?;

        let (writer, reader) = stream.split();
        self.writer = Some(writer);
        self.reader = Some(reader);
        self.connected = true;
        Ok(())
    }

    async fn close(&mut self) -> SocketResult<()> {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.close().await;
        }
        self.reader = None;
        self.connected = false;
        debug!("WebSocket closed");
        Ok(())
    }

    async fn send(&mut self, frame: String) -> SocketResult<()> {
        let writer = self.writer.as_mut().ok_or(SocketError::NotConnected)?;
        writer
            .send(WsMessage::Text(frame.into()))
            .await
            .map_err(|e| SocketError::websocket(e.to_string()))
    }

    async fn receive(&mut self) -> SocketResult<String> {
        let reader = self.reader.as_mut().ok_or(SocketError::NotConnected)?;

        loop {
            match reader.next().await {
                Some(Ok(WsMessage::Text(text))) => return Ok(text.to_string()),
                Some(Ok(WsMessage::Binary(_))) => {
                    debug!("Ignoring binary frame");
                }
                Some(Ok(WsMessage::Ping(data))) => {
                    if let Some(writer) = self.writer.as_mut() {
                        let _ = writer.send(WsMessage::Pong(data)).await;
                    }
                }
                Some(Ok(WsMessage::Pong(_) | WsMessage::Frame(_))) => {}
                Some(Ok(WsMessage::Close(frame))) => {
                    self.connected = false;
                    let (code, reason) = frame.map_or_else(
                        || (1000, "Normal closure".to_string()),
                        |f| (f.code.into(), f.reason.to_string()),
                    );
                    return Err(SocketError::ConnectionClosed { code, reason });
                }
                Some(Err(e)) => {
                    self.connected = false;
                    return Err(SocketError::websocket(e.to_string()));
                }
                None => {
                    self.connected = false;
                    return Err(SocketError::ConnectionClosed {
                        code: 1006,
                        reason: "Stream ended".to_string(),
                    });
                }
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// Drives one Engine.IO session for one namespace: handshake, pings, room
/// sync and event dispatch. A new handler is built for every reconnect.
pub struct ChannelHandler {
    transport: Box<dyn SocketTransport>,
    state: ChannelState,
    shared_state: Arc<RwLock<ConnectionState>>,
    namespace: String,
    auth: Value,
    rooms: Arc<Mutex<RoomRegistry>>,
    joined: BTreeSet<ThreadId>,
    event_tx: mpsc::UnboundedSender<SocketEvent>,
}

impl ChannelHandler {
    pub fn new(
        transport: Box<dyn SocketTransport>,
        namespace: impl Into<String>,
        auth: Value,
        rooms: Arc<Mutex<RoomRegistry>>,
        shared_state: Arc<RwLock<ConnectionState>>,
        event_tx: mpsc::UnboundedSender<SocketEvent>,
    ) -> Self {
        Self {
            transport,
            state: ChannelState::new(),
            shared_state,
            namespace: namespace.into(),
            auth,
            rooms,
            joined: BTreeSet::new(),
            event_tx,
        }
    }

    fn publish(&self) {
        *self.shared_state.write() = self.state.connection();
    }

    /// Opens the transport and completes both handshakes. Returns the
    /// namespace session id.
    pub async fn connect(&mut self, url: &str) -> SocketResult<String> {
        self.state.transition_to_connecting();
        self.publish();
        self.transport.connect(url).await?;

        self.state.transition_to_awaiting_open();
        self.publish();
        let open = self.await_open().await?;
        debug!(
            engine_sid = %open.sid,
            ping_interval_ms = open.ping_interval,
            ping_timeout_ms = open.ping_timeout,
            "Engine session opened"
        );

        self.state.transition_to_joining(
            std::time::Duration::from_millis(open.ping_interval),
            std::time::Duration::from_millis(open.ping_timeout),
        );
        self.publish();

        let connect = SocketPacket::Connect {
            namespace: self.namespace.clone(),
            data: Some(self.auth.clone()),
        };
        self.transport.send(connect.to_frame()).await?;

        let sid = timeout(HANDSHAKE_TIMEOUT, self.await_namespace_connect())
            .await
            .map_err(|_| SocketError::timeout("namespace connect"))??;

        self.state.transition_to_connected(sid.clone());
        self.publish();
        info!(namespace = %self.namespace, sid = %sid, "Socket namespace connected");

        self.joined.clear();
        self.sync_rooms().await?;
        Ok(sid)
    }

    async fn await_open(&mut self) -> SocketResult<OpenPayload> {
        let frame = timeout(HANDSHAKE_TIMEOUT, self.transport.receive())
            .await
            .map_err(|_| SocketError::timeout("open packet"))??;

        match EnginePacket::decode(&frame)? {
            EnginePacket::Open(open) => Ok(open),
            other => Err(SocketError::protocol(format!(
                "expected open packet, got {other:?}"
            ))),
        }
    }

    async fn await_namespace_connect(&mut self) -> SocketResult<String> {
        loop {
            let frame = self.transport.receive().await?;
            match EnginePacket::decode(&frame)? {
                EnginePacket::Ping(data) => {
                    self.state.record_ping();
                    self.transport.send(EnginePacket::Pong(data).encode()).await?;
                }
                EnginePacket::Close => {
                    return Err(SocketError::ConnectionClosed {
                        code: 1000,
                        reason: "engine closed during handshake".to_string(),
                    });
                }
                EnginePacket::Message(body) => {
                    let packet = SocketPacket::decode(&body)?;
                    if packet.namespace() != self.namespace {
                        continue;
                    }
                    match packet {
                        SocketPacket::Connect { data, .. } => {
                            let sid = data
                                .as_ref()
                                .and_then(|d| d.get("sid"))
                                .and_then(Value::as_str)
                                .unwrap_or_default()
                                .to_string();
                            return Ok(sid);
                        }
                        SocketPacket::ConnectError { .. } => {
                            return Err(SocketError::Rejected {
                                namespace: self.namespace.clone(),
                                message: packet.connect_error_message().unwrap_or_default(),
                            });
                        }
                        SocketPacket::Disconnect { .. } => {
                            return Err(SocketError::ServerDisconnect {
                                namespace: self.namespace.clone(),
                            });
                        }
                        other => trace!(packet = ?other, "Packet before namespace connect"),
                    }
                }
                _ => {}
            }
        }
    }

    /// Processes frames and commands until the connection drops or a
    /// disconnect is requested. `Ok(())` means a requested close.
    pub async fn run(
        &mut self,
        commands: &mut mpsc::UnboundedReceiver<ChannelCommand>,
    ) -> SocketResult<()> {
        while self.state.connection().is_connected() {
            let deadline = self
                .state
                .ping_deadline()
                .unwrap_or_else(|| std::time::Instant::now() + self.state.ping_window());

            tokio::select! {
                frame = self.transport.receive() => {
                    self.handle_frame(&frame?).await?;
                }

                command = commands.recv() => {
                    match command {
                        Some(ChannelCommand::SyncRooms) => self.sync_rooms().await?,
                        Some(ChannelCommand::Disconnect) | None => {
                            self.close().await;
                            return Ok(());
                        }
                    }
                }

                () = sleep_until(deadline.into()) => {
                    let timeout_ms =
                        u64::try_from(self.state.ping_window().as_millis()).unwrap_or(u64::MAX);
                    return Err(SocketError::PingTimeout { timeout_ms });
                }
            }
        }

        Ok(())
    }

    async fn handle_frame(&mut self, frame: &str) -> SocketResult<()> {
        let packet = match EnginePacket::decode(frame) {
            Ok(packet) => packet,
            Err(e) => {
                warn!(error = %e, "Dropping undecodable frame");
                return Ok(());
            }
        };

        match packet {
            EnginePacket::Ping(data) => {
                self.state.record_ping();
                self.transport.send(EnginePacket::Pong(data).encode()).await?;
            }
            EnginePacket::Close => {
                return Err(SocketError::ConnectionClosed {
                    code: 1000,
                    reason: "engine session closed by server".to_string(),
                });
            }
            EnginePacket::Message(body) => self.handle_packet(&body)?,
            EnginePacket::Open(_) => debug!("Unexpected open packet"),
            EnginePacket::Pong(_) | EnginePacket::Upgrade | EnginePacket::Noop => {}
        }
        Ok(())
    }

    fn handle_packet(&self, body: &str) -> SocketResult<()> {
        let packet = match SocketPacket::decode(body) {
            Ok(packet) => packet,
            Err(e) => {
                warn!(namespace = %self.namespace, error = %e, "Dropping malformed packet");
                return Ok(());
            }
        };
        if packet.namespace() != self.namespace {
            trace!(namespace = packet.namespace(), "Packet for another namespace");
            return Ok(());
        }

        match packet {
            SocketPacket::Event { name, args, .. } => match EventParser::parse(&name, &args) {
                Ok(Some(event)) => {
                    trace!(event = %name, "Dispatching socket event");
                    let _ = self.event_tx.send(event);
                }
                Ok(None) => debug!(event = %name, "Ignoring unhandled event"),
                Err(e) => warn!(event = %name, error = %e, "Failed to parse socket event"),
            },
            SocketPacket::Disconnect { .. } => {
                return Err(SocketError::ServerDisconnect {
                    namespace: self.namespace.clone(),
                });
            }
            SocketPacket::ConnectError { .. } => {
                return Err(SocketError::Rejected {
                    namespace: self.namespace.clone(),
                    message: packet.connect_error_message().unwrap_or_default(),
                });
            }
            SocketPacket::Connect { .. } | SocketPacket::Ack { .. } => {}
        }
        Ok(())
    }

    /// Emits join/leave frames until the live connection matches the room
    /// registry.
    pub async fn sync_rooms(&mut self) -> SocketResult<()> {
        if !self.state.connection().is_connected() {
            return Ok(());
        }

        let diff = self.rooms.lock().diff(&self.joined);
        for thread_id in diff.join {
            self.emit_room(EVENT_JOIN_THREAD, &thread_id).await?;
            self.joined.insert(thread_id);
        }
        for thread_id in diff.leave {
            self.emit_room(EVENT_LEAVE_THREAD, &thread_id).await?;
            self.joined.remove(&thread_id);
        }
        Ok(())
    }

    async fn emit_room(&mut self, event: &str, thread_id: &ThreadId) -> SocketResult<()> {
        debug!(namespace = %self.namespace, event, thread_id = %thread_id, "Room update");
        let packet = SocketPacket::event(
            &self.namespace,
            event,
            json!({ "threadId": thread_id.as_str() }),
        );
        self.transport.send(packet.to_frame()).await
    }

    pub async fn close(&mut self) {
        if self.transport.is_connected() {
            let packet = SocketPacket::Disconnect {
                namespace: self.namespace.clone(),
            };
            let _ = self.transport.send(packet.to_frame()).await;
        }
        let _ = self.transport.close().await;
        self.state.transition_to_shutdown();
        self.publish();
        self.joined.clear();
    }

    #[must_use]
    pub const fn state(&self) -> &ChannelState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_url_maps_schemes() {
        assert_eq!(
            engine_url("https://api.example.test/").unwrap(),
            "wss://api.example.test/socket.io/?EIO=4&transport=websocket"
        );
        assert_eq!(
            engine_url("http://localhost:3000").unwrap(),
            "ws://localhost:3000/socket.io/?EIO=4&transport=websocket"
        );
        assert!(engine_url("ftp://nope").is_err());
    }

    #[test]
    fn test_websocket_transport_initial_state() {
        assert!(!WebSocketTransport::new().is_connected());
    }
}
