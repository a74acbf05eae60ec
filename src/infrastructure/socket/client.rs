use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::FutureExt;
use parking_lot::{Mutex, RwLock};
use serde_json::json;
use tokio::sync::{Notify, mpsc};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::connection::{ChannelHandler, SocketTransport, WebSocketTransport, engine_url};
use super::constants::{
    MAX_RECONNECT_ATTEMPTS, MESSAGING_NAMESPACE, RECONNECT_DELAY_BASE, RECONNECT_DELAY_MAX,
    RECONNECT_JITTER_MAX,
};
use super::error::{SocketError, SocketResult};
use super::events::ChannelCommand;
use super::rooms::RoomRegistry;
use super::state::ConnectionState;
use crate::domain::connection::ConnectionStatus;
use crate::domain::entities::{AuthToken, ThreadId};
use crate::domain::ports::{SocketEvent, SocketPort};

/// Builds a fresh transport for each connection attempt.
pub type TransportFactory = Arc<dyn Fn() -> Box<dyn SocketTransport> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct SocketChannelConfig {
    /// Base URL of the socket server (`http(s)` or `ws(s)`).
    pub url: String,
    pub namespace: String,
    pub auto_reconnect: bool,
    pub max_reconnect_attempts: u32,
    pub reconnect_delay: Duration,
    pub reconnect_delay_max: Duration,
    pub reconnect_jitter: Duration,
}

impl Default for SocketChannelConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:3000".to_string(),
            namespace: MESSAGING_NAMESPACE.to_string(),
            auto_reconnect: true,
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
            reconnect_delay: RECONNECT_DELAY_BASE,
            reconnect_delay_max: RECONNECT_DELAY_MAX,
            reconnect_jitter: RECONNECT_JITTER_MAX,
        }
    }
}

impl SocketChannelConfig {
    #[must_use]
    pub fn new(url: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    #[must_use]
    pub const fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    #[must_use]
    pub const fn with_reconnect_delays(
        mut self,
        base: Duration,
        max: Duration,
        jitter: Duration,
    ) -> Self {
        self.reconnect_delay = base;
        self.reconnect_delay_max = max;
        self.reconnect_jitter = jitter;
        self
    }
}

/// One authenticated, auto-reconnecting Socket.IO namespace.
///
/// Room membership lives in the channel, not the connection, so it is
/// restored after every reconnect.
pub struct SocketChannel {
    config: SocketChannelConfig,
    factory: TransportFactory,
    rooms: Arc<Mutex<RoomRegistry>>,
    current: Mutex<Option<ChannelRun>>,
}

/// Handles of one `connect` call.
///
/// Every run gets its own flag, state and shutdown signal, so a loop that is
/// still winding down cannot observe or clobber the run that replaced it.
struct ChannelRun {
    running: Arc<AtomicBool>,
    state: Arc<RwLock<ConnectionState>>,
    shutdown: Arc<Notify>,
    commands: Option<mpsc::UnboundedSender<ChannelCommand>>,
}

impl ChannelRun {
    fn new(commands: mpsc::UnboundedSender<ChannelCommand>) -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
            state: Arc::new(RwLock::new(ConnectionState::Connecting)),
            shutdown: Arc::new(Notify::new()),
            commands: Some(commands),
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl SocketChannel {
    #[must_use]
    pub fn new(config: SocketChannelConfig) -> Self {
        Self::with_transport(
            config,
            Arc::new(|| Box::new(WebSocketTransport::new()) as Box<dyn SocketTransport>),
        )
    }

    #[must_use]
    pub fn with_transport(config: SocketChannelConfig, factory: TransportFactory) -> Self {
        Self {
            config,
            factory,
            rooms: Arc::new(Mutex::new(RoomRegistry::new())),
            current: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    /// Starts the connection task.
    ///
    /// No connection is attempted without a token.
    ///
    /// # Errors
    ///
    /// Returns [`SocketError::NoCredentials`] when `token` is `None` and
    /// [`SocketError::AlreadyConnected`] while a task is already running.
    pub fn connect(
        &self,
        token: Option<&AuthToken>,
    ) -> SocketResult<mpsc::UnboundedReceiver<SocketEvent>> {
        let token = token.ok_or(SocketError::NoCredentials)?;

        let mut current = self.current.lock();
        if current.as_ref().is_some_and(ChannelRun::is_running) {
            return Err(SocketError::AlreadyConnected);
        }

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let run = ChannelRun::new(command_tx);

        let context = LoopContext {
            config: self.config.clone(),
            factory: Arc::clone(&self.factory),
            auth: json!({ "token": token.as_str() }),
            running: Arc::clone(&run.running),
            state: Arc::clone(&run.state),
            rooms: Arc::clone(&self.rooms),
            shutdown: Arc::clone(&run.shutdown),
        };
        let running = Arc::clone(&run.running);
        let state = Arc::clone(&run.state);
        let namespace = self.config.namespace.clone();
        *current = Some(run);
        drop(current);

        tokio::spawn(async move {
            let result = std::panic::AssertUnwindSafe(run_channel_loop(
                context,
                event_tx.clone(),
                command_rx,
            ));

            if let Err(panic_info) = result.catch_unwind().await {
                let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    (*s).to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };

                error!(namespace = %namespace, panic = %panic_msg, "Socket task panicked");
                running.store(false, Ordering::SeqCst);
                *state.write() = ConnectionState::Failed;
                let _ = event_tx.send(SocketEvent::Error {
                    message: format!("Socket task panicked: {panic_msg}"),
                    recoverable: false,
                });
            }
        });

        Ok(event_rx)
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.current.lock().as_ref().is_some_and(ChannelRun::is_running)
    }

    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.current
            .lock()
            .as_ref()
            .map_or(ConnectionState::Disconnected, |run| *run.state.read())
    }

    fn nudge(&self, command: ChannelCommand) {
        if let Some(tx) = self
            .current
            .lock()
            .as_ref()
            .and_then(|run| run.commands.as_ref())
        {
            let _ = tx.send(command);
        }
    }
}

impl SocketPort for SocketChannel {
    fn join_room(&self, thread_id: &ThreadId) {
        if self.rooms.lock().join(thread_id) {
            self.nudge(ChannelCommand::SyncRooms);
        }
    }

    fn leave_room(&self, thread_id: &ThreadId) {
        if self.rooms.lock().leave(thread_id) {
            self.nudge(ChannelCommand::SyncRooms);
        }
    }

    fn leave_all_rooms(&self) {
        if self.rooms.lock().clear() > 0 {
            self.nudge(ChannelCommand::SyncRooms);
        }
    }

    fn disconnect(&self) {
        let mut current = self.current.lock();
        let Some(run) = current.as_mut() else {
            return;
        };
        if !run.running.swap(false, Ordering::SeqCst) {
            return;
        }
        info!(namespace = %self.config.namespace, "Disconnecting socket");
        if let Some(tx) = run.commands.take() {
            let _ = tx.send(ChannelCommand::Disconnect);
        }
        run.shutdown.notify_one();
        *run.state.write() = ConnectionState::ShuttingDown;
    }

    fn status(&self) -> ConnectionStatus {
        self.connection_state().status()
    }
}

struct LoopContext {
    config: SocketChannelConfig,
    factory: TransportFactory,
    auth: serde_json::Value,
    running: Arc<AtomicBool>,
    state: Arc<RwLock<ConnectionState>>,
    rooms: Arc<Mutex<RoomRegistry>>,
    shutdown: Arc<Notify>,
}

enum ConnectionResult {
    /// Disconnect was requested.
    Closed,
    /// The handshake never completed.
    Error(SocketError),
    /// An established connection dropped.
    Disconnected(SocketError),
}

async fn run_channel_loop(
    context: LoopContext,
    event_tx: mpsc::UnboundedSender<SocketEvent>,
    mut command_rx: mpsc::UnboundedReceiver<ChannelCommand>,
) {
    let config = &context.config;
    let namespace = config.namespace.as_str();

    let url = match engine_url(&config.url) {
        Ok(url) => url,
        Err(e) => {
            error!(namespace, error = %e, "Socket channel cannot start");
            let _ = event_tx.send(SocketEvent::Error {
                message: e.to_string(),
                recoverable: false,
            });
            *context.state.write() = ConnectionState::Failed;
            context.running.store(false, Ordering::SeqCst);
            return;
        }
    };

    let mut reconnect_attempts: u32 = 0;
    let mut has_connected = false;
    let mut failed = false;

    while context.running.load(Ordering::SeqCst) {
        let handler = ChannelHandler::new(
            (context.factory)(),
            namespace,
            context.auth.clone(),
            Arc::clone(&context.rooms),
            Arc::clone(&context.state),
            event_tx.clone(),
        );

        let result =
            run_single_connection(handler, &url, &mut command_rx, &event_tx, &mut has_connected)
                .await;

        match result {
            ConnectionResult::Closed => break,
            ConnectionResult::Error(e) => {
                warn!(namespace, error = %e, "Socket connection attempt failed");
                let _ = event_tx.send(SocketEvent::Error {
                    message: e.to_string(),
                    recoverable: e.should_reconnect(),
                });
                if !e.should_reconnect() {
                    failed = true;
                    break;
                }
                reconnect_attempts += 1;
            }
            ConnectionResult::Disconnected(e) => {
                warn!(namespace, error = %e, "Socket connection lost");
                let _ = event_tx.send(SocketEvent::Disconnected {
                    reason: e.to_string(),
                });
                if !e.should_reconnect() {
                    failed = e.is_auth_failure();
                    break;
                }
                reconnect_attempts = 1;
            }
        }

        if !context.running.load(Ordering::SeqCst) {
            break;
        }

        if !config.auto_reconnect {
            break;
        }

        if reconnect_attempts >= config.max_reconnect_attempts {
            error!(
                namespace,
                attempts = reconnect_attempts,
                "Max reconnection attempts exceeded"
            );
            let _ = event_tx.send(SocketEvent::Error {
                message: SocketError::ReconnectionLimitExceeded {
                    attempts: reconnect_attempts,
                }
                .to_string(),
                recoverable: false,
            });
            failed = true;
            break;
        }

        let delay = calculate_backoff_delay(
            reconnect_attempts,
            config.reconnect_delay,
            config.reconnect_delay_max,
            config.reconnect_jitter,
        );
        info!(
            namespace,
            attempt = reconnect_attempts,
            delay_ms = delay.as_millis(),
            "Reconnecting socket"
        );

        *context.state.write() = ConnectionState::Reconnecting {
            attempt: reconnect_attempts,
        };
        let _ = event_tx.send(SocketEvent::Reconnecting {
            attempt: reconnect_attempts,
        });

        tokio::select! {
            () = sleep(delay) => {}
            () = context.shutdown.notified() => {
                debug!(namespace, "Reconnect wait interrupted by shutdown");
            }
        }
    }

    *context.state.write() = if failed {
        ConnectionState::Failed
    } else {
        ConnectionState::Disconnected
    };
    context.running.store(false, Ordering::SeqCst);
    info!(namespace, "Socket loop terminated");
}

async fn run_single_connection(
    mut handler: ChannelHandler,
    url: &str,
    commands: &mut mpsc::UnboundedReceiver<ChannelCommand>,
    event_tx: &mpsc::UnboundedSender<SocketEvent>,
    has_connected: &mut bool,
) -> ConnectionResult {
    match handler.connect(url).await {
        Ok(sid) => {
            let _ = event_tx.send(SocketEvent::Connected {
                sid,
                reconnected: *has_connected,
            });
            *has_connected = true;

            match handler.run(commands).await {
                Ok(()) => ConnectionResult::Closed,
                Err(e) => {
                    handler.close().await;
                    ConnectionResult::Disconnected(e)
                }
            }
        }
        Err(e) => {
            handler.close().await;
            ConnectionResult::Error(e)
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn calculate_backoff_delay(attempt: u32, base: Duration, max: Duration, jitter: Duration) -> Duration {
    let base_delay = base.as_millis() as u64;
    let max_delay = max.as_millis() as u64;
    let jitter_max = jitter.as_millis() as u64;

    let exponential_delay =
        base_delay.saturating_mul(2_u64.saturating_pow(attempt.saturating_sub(1).min(6)));
    let capped_delay = exponential_delay.min(max_delay);

    Duration::from_millis(capped_delay.saturating_add(rand_jitter(jitter_max)))
}

fn rand_jitter(max: u64) -> u64 {
    use std::time::SystemTime;

    if max == 0 {
        return 0;
    }

    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| u64::from(d.subsec_nanos()))
        .unwrap_or(0);

    nanos % max
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use tokio::time::timeout;

    use super::*;

    const WAIT: Duration = Duration::from_secs(2);
    const OPEN: &str =
        r#"0{"sid":"eio-1","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;

    struct ScriptedTransport {
        inbound: mpsc::UnboundedReceiver<String>,
        outbound: mpsc::UnboundedSender<String>,
        connected: bool,
    }

    #[async_trait]
    impl SocketTransport for ScriptedTransport {
        async fn connect(&mut self, _url: &str) -> SocketResult<()> {
            self.connected = true;
            Ok(())
        }

        async fn close(&mut self) -> SocketResult<()> {
            self.connected = false;
            Ok(())
        }

        async fn send(&mut self, frame: String) -> SocketResult<()> {
            self.outbound
                .send(frame)
                .map_err(|_| SocketError::websocket("server gone"))
        }

        async fn receive(&mut self) -> SocketResult<String> {
            self.inbound.recv().await.ok_or(SocketError::ConnectionClosed {
                code: 1006,
                reason: "server dropped".to_string(),
            })
        }

        fn is_connected(&self) -> bool {
            self.connected
        }
    }

    struct RefusingTransport;

    #[async_trait]
    impl SocketTransport for RefusingTransport {
        async fn connect(&mut self, _url: &str) -> SocketResult<()> {
            Err(SocketError::connection_failed("connection refused"))
        }

        async fn close(&mut self) -> SocketResult<()> {
            Ok(())
        }

        async fn send(&mut self, _frame: String) -> SocketResult<()> {
            Err(SocketError::NotConnected)
        }

        async fn receive(&mut self) -> SocketResult<String> {
            Err(SocketError::NotConnected)
        }

        fn is_connected(&self) -> bool {
            false
        }
    }

    /// Server side of one scripted connection.
    struct ServerEnd {
        to_client: mpsc::UnboundedSender<String>,
        from_client: mpsc::UnboundedReceiver<String>,
    }

    impl ServerEnd {
        fn push(&self, frame: &str) {
            self.to_client.send(frame.to_string()).unwrap();
        }

        async fn next_frame(&mut self) -> String {
            timeout(WAIT, self.from_client.recv())
                .await
                .expect("timed out waiting for client frame")
                .expect("client hung up")
        }

        async fn accept(&mut self, namespace: &str) {
            self.push(OPEN);
            let connect = self.next_frame().await;
            assert!(connect.starts_with(&format!("40{namespace},")), "{connect}");
            assert!(connect.contains(r#""token":"session-token-0123456789""#));
            self.push(&format!(r#"40{namespace},{{"sid":"ns-sid"}}"#));
        }
    }

    fn scripted(count: usize) -> (TransportFactory, Vec<ServerEnd>, Arc<Mutex<u32>>) {
        let mut transports = VecDeque::new();
        let mut servers = Vec::new();
        for _ in 0..count {
            let (to_client, inbound) = mpsc::unbounded_channel();
            let (outbound, from_client) = mpsc::unbounded_channel();
            transports.push_back(ScriptedTransport {
                inbound,
                outbound,
                connected: false,
            });
            servers.push(ServerEnd {
                to_client,
                from_client,
            });
        }

        let transports = Arc::new(Mutex::new(transports));
        let attempts = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&attempts);
        let factory: TransportFactory = Arc::new(move || {
            *counter.lock() += 1;
            match transports.lock().pop_front() {
                Some(transport) => Box::new(transport) as Box<dyn SocketTransport>,
                None => Box::new(RefusingTransport),
            }
        });
        (factory, servers, attempts)
    }

    fn config() -> SocketChannelConfig {
        SocketChannelConfig::new("http://chat.test", "/messaging").with_reconnect_delays(
            Duration::from_millis(5),
            Duration::from_millis(10),
            Duration::ZERO,
        )
    }

    fn token() -> AuthToken {
        AuthToken::new("session-token-0123456789").unwrap()
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<SocketEvent>) -> SocketEvent {
        timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event stream closed")
    }

    async fn assert_stream_ends(rx: &mut mpsc::UnboundedReceiver<SocketEvent>) {
        loop {
            match timeout(WAIT, rx.recv()).await.expect("stream did not end") {
                Some(_) => {}
                None => return,
            }
        }
    }

    #[test]
    fn test_config_builder() {
        let config = SocketChannelConfig::new("https://x.test", "/notifications")
            .with_auto_reconnect(false)
            .with_max_reconnect_attempts(3);

        assert!(!config.auto_reconnect);
        assert_eq!(config.max_reconnect_attempts, 3);
        assert_eq!(config.namespace, "/notifications");
    }

    #[test]
    fn test_backoff_delay() {
        let base = RECONNECT_DELAY_BASE;
        let max = RECONNECT_DELAY_MAX;
        let jitter = RECONNECT_JITTER_MAX;

        let delay1 = calculate_backoff_delay(1, base, max, Duration::ZERO);
        let delay2 = calculate_backoff_delay(2, base, max, Duration::ZERO);
        let delay3 = calculate_backoff_delay(3, base, max, Duration::ZERO);
        assert_eq!(delay1, base);
        assert!(delay1 < delay2 && delay2 < delay3);

        let delay_max = calculate_backoff_delay(100, base, max, jitter);
        assert!(delay_max <= max + jitter);
    }

    #[tokio::test]
    async fn test_connect_requires_token() {
        let (factory, _servers, attempts) = scripted(1);
        let channel = SocketChannel::with_transport(config(), factory);

        let result = channel.connect(None);

        assert!(matches!(result, Err(SocketError::NoCredentials)));
        assert!(!channel.is_running());
        assert_eq!(*attempts.lock(), 0);
        assert_eq!(channel.status(), ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_handshake_rooms_and_events() {
        let (factory, mut servers, _) = scripted(1);
        let mut server = servers.remove(0);
        let channel = SocketChannel::with_transport(config(), factory);
        channel.join_room(&ThreadId::new("t1"));

        let mut events = channel.connect(Some(&token())).unwrap();
        assert!(matches!(
            channel.connect(Some(&token())),
            Err(SocketError::AlreadyConnected)
        ));
        server.accept("/messaging").await;

        let SocketEvent::Connected { sid, reconnected } = next_event(&mut events).await else {
            panic!("expected connected event");
        };
        assert_eq!(sid, "ns-sid");
        assert!(!reconnected);
        assert_eq!(channel.status(), ConnectionStatus::Connected);
        assert_eq!(
            server.next_frame().await,
            r#"42/messaging,["join-thread",{"threadId":"t1"}]"#
        );

        channel.join_room(&ThreadId::new("t1"));
        channel.join_room(&ThreadId::new("t2"));
        assert_eq!(
            server.next_frame().await,
            r#"42/messaging,["join-thread",{"threadId":"t2"}]"#
        );

        server.push("2");
        assert_eq!(server.next_frame().await, "3");

        server.push(
            r#"42/messaging,["new-message",{"threadId":"t2","message":{"id":"m1","senderId":"u2","text":"hi","createdAt":"2026-03-01T09:30:00Z"}}]"#,
        );
        let SocketEvent::NewMessage(event) = next_event(&mut events).await else {
            panic!("expected new-message");
        };
        assert_eq!(event.thread_id, "t2");

        channel.leave_room(&ThreadId::new("t1"));
        assert_eq!(
            server.next_frame().await,
            r#"42/messaging,["leave-thread",{"threadId":"t1"}]"#
        );

        channel.disconnect();
        assert_eq!(server.next_frame().await, "41/messaging,");
        assert_stream_ends(&mut events).await;
        assert_eq!(channel.status(), ConnectionStatus::Disconnected);
        assert!(!channel.is_running());
    }

    #[tokio::test]
    async fn test_reconnect_rejoins_rooms() {
        let (factory, servers, _) = scripted(2);
        let mut servers = servers.into_iter();
        let mut first = servers.next().unwrap();
        let mut second = servers.next().unwrap();
        let channel = SocketChannel::with_transport(config(), factory);

        let mut events = channel.connect(Some(&token())).unwrap();
        first.accept("/messaging").await;
        assert!(matches!(
            next_event(&mut events).await,
            SocketEvent::Connected {
                reconnected: false,
                ..
            }
        ));
        channel.join_room(&ThreadId::new("t7"));
        assert!(first.next_frame().await.contains("join-thread"));

        drop(first);

        assert!(matches!(
            next_event(&mut events).await,
            SocketEvent::Disconnected { .. }
        ));
        assert!(matches!(
            next_event(&mut events).await,
            SocketEvent::Reconnecting { attempt: 1 }
        ));

        second.accept("/messaging").await;
        assert!(matches!(
            next_event(&mut events).await,
            SocketEvent::Connected {
                reconnected: true,
                ..
            }
        ));
        assert_eq!(
            second.next_frame().await,
            r#"42/messaging,["join-thread",{"threadId":"t7"}]"#
        );

        channel.disconnect();
        assert_stream_ends(&mut events).await;
    }

    #[tokio::test]
    async fn test_reconnect_after_disconnect_keeps_backoff() {
        let (factory, mut servers, attempts) = scripted(1);
        let mut server = servers.remove(0);
        let slow = config().with_reconnect_delays(
            Duration::from_millis(300),
            Duration::from_millis(300),
            Duration::ZERO,
        );
        let channel = SocketChannel::with_transport(slow, factory);

        let mut first = channel.connect(Some(&token())).unwrap();
        server.accept("/messaging").await;
        assert!(matches!(
            next_event(&mut first).await,
            SocketEvent::Connected { .. }
        ));
        channel.disconnect();
        assert_stream_ends(&mut first).await;

        let mut second = channel.connect(Some(&token())).unwrap();
        assert!(channel.is_running());
        assert!(matches!(
            next_event(&mut second).await,
            SocketEvent::Error {
                recoverable: true,
                ..
            }
        ));
        assert!(matches!(
            next_event(&mut second).await,
            SocketEvent::Reconnecting { attempt: 1 }
        ));

        assert!(
            timeout(Duration::from_millis(100), second.recv()).await.is_err(),
            "backoff wait was cut short"
        );
        assert_eq!(*attempts.lock(), 2);
        assert_eq!(channel.status(), ConnectionStatus::Reconnecting);

        channel.disconnect();
        assert_stream_ends(&mut second).await;
        assert!(!channel.is_running());
    }

    #[tokio::test]
    async fn test_rejected_namespace_is_not_retried() {
        let (factory, mut servers, attempts) = scripted(2);
        let mut server = servers.remove(0);
        let channel = SocketChannel::with_transport(config(), factory);

        let mut events = channel.connect(Some(&token())).unwrap();
        server.push(OPEN);
        server.next_frame().await;
        server.push(r#"44/messaging,{"message":"invalid token"}"#);

        let SocketEvent::Error {
            message,
            recoverable,
        } = next_event(&mut events).await
        else {
            panic!("expected error event");
        };
        assert!(message.contains("invalid token"));
        assert!(!recoverable);

        assert_stream_ends(&mut events).await;
        assert_eq!(channel.status(), ConnectionStatus::Failed);
        assert_eq!(*attempts.lock(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_reconnects_report_failed() {
        let (factory, _servers, attempts) = scripted(0);
        let channel = SocketChannel::with_transport(
            config().with_max_reconnect_attempts(3),
            factory,
        );

        let mut events = channel.connect(Some(&token())).unwrap();

        let mut errors = Vec::new();
        let mut reconnecting = 0;
        while let Ok(Some(event)) = timeout(WAIT, events.recv()).await {
            match event {
                SocketEvent::Error { recoverable, .. } => errors.push(recoverable),
                SocketEvent::Reconnecting { .. } => reconnecting += 1,
                other => panic!("unexpected event {other:?}"),
            }
        }

        assert_eq!(*attempts.lock(), 3);
        assert_eq!(reconnecting, 2);
        assert_eq!(errors, vec![true, true, true, false]);
        assert_eq!(channel.status(), ConnectionStatus::Failed);
    }

    #[tokio::test]
    async fn test_missing_pings_drop_the_connection() {
        let (factory, mut servers, _) = scripted(1);
        let mut server = servers.remove(0);
        let channel =
            SocketChannel::with_transport(config().with_auto_reconnect(false), factory);

        let mut events = channel.connect(Some(&token())).unwrap();
        server.push(r#"0{"sid":"eio-2","upgrades":[],"pingInterval":30,"pingTimeout":30}"#);
        server.next_frame().await;
        server.push(r#"40/messaging,{"sid":"ns-2"}"#);
        assert!(matches!(
            next_event(&mut events).await,
            SocketEvent::Connected { .. }
        ));

        let SocketEvent::Disconnected { reason } = next_event(&mut events).await else {
            panic!("expected disconnect");
        };
        assert!(reason.contains("no ping"));
        assert_stream_ends(&mut events).await;
        assert_eq!(channel.status(), ConnectionStatus::Disconnected);
    }
}
