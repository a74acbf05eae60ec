use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr, eyre};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use marketchat::application::services::thread_adapter;
use marketchat::application::use_cases::ApprovedOrder;
use marketchat::application::{
    ApproveProviderUseCase, LoginRequest, LoginUseCase, MessagingSession, MessagingStore,
    NotificationInbox, ResolveTokenUseCase, TokenSource,
};
use marketchat::domain::entities::{
    ApplicationId, Message, OrderId, RequestId, SharedCredentials, Thread, ThreadId, UserId,
};
use marketchat::domain::errors::AuthError;
use marketchat::domain::ports::{AlertPort, MarketplacePort, SocketEvent, SocketPort, TokenStoragePort};
use marketchat::infrastructure::config::{OpenArgs, WatchArgs};
use marketchat::infrastructure::{
    AppConfig, CliArgs, Command, DesktopAlertService, KeyringTokenStorage, MarketplaceClient,
    SocketChannel, StorageManager,
};

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = config.effective_log_path() {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

/// Everything a signed-in command needs.
struct Runtime {
    config: AppConfig,
    api: Arc<MarketplaceClient>,
    messaging: Arc<SocketChannel>,
    notifications: Arc<SocketChannel>,
    session: MessagingSession,
    credentials: SharedCredentials,
}

impl Runtime {
    fn new(config: AppConfig, api: Arc<MarketplaceClient>, credentials: SharedCredentials) -> Result<Self> {
        let viewer_id = config
            .user_id
            .as_deref()
            .map(UserId::new)
            .ok_or_else(|| eyre!("no user id configured; pass --user-id or set user_id in config.toml"))?;

        let alerts: Arc<dyn AlertPort> =
            Arc::new(DesktopAlertService::from_config(&config.notifications));
        let port: Arc<dyn MarketplacePort> = api.clone();

        let store = MessagingStore::new(
            Arc::clone(&port),
            Arc::clone(&alerts),
            config.messaging.store_settings(),
        );
        let inbox = NotificationInbox::new(alerts);

        let messaging = Arc::new(SocketChannel::new(
            config.socket_channel_config(&config.socket.messaging_namespace),
        ));
        let notifications = Arc::new(SocketChannel::new(
            config.socket_channel_config(&config.socket.notifications_namespace),
        ));

        let session = MessagingSession::new(
            store,
            inbox,
            Arc::clone(&messaging) as Arc<dyn SocketPort>,
            Arc::clone(&notifications) as Arc<dyn SocketPort>,
            viewer_id,
        );

        Ok(Self {
            config,
            api,
            messaging,
            notifications,
            session,
            credentials,
        })
    }

    async fn threads(&self) -> Result<()> {
        self.session.start().await?;
        let threads = self.session.store().threads();
        if threads.is_empty() {
            println!("No conversations yet.");
        }
        for thread in &threads {
            print_thread(thread);
        }
        Ok(())
    }

    async fn open(&self, args: &OpenArgs) -> Result<()> {
        self.session.start().await?;

        let thread_id = if let Some(order) = &args.target.order {
            let display_ref = args.display_ref.as_deref().unwrap_or(order);
            self.session
                .open_thread_for_order(&OrderId::new(order.as_str()), display_ref)
                .await?
        } else {
            let thread_id = ThreadId::new(args.target.thread.as_deref().unwrap_or_default());
            self.session.open_thread(&thread_id).await?;
            thread_id
        };

        for _ in 0..args.older_pages {
            if self.session.store().load_older_messages(&thread_id).await? == 0 {
                break;
            }
        }

        if let Some(thread) = self.session.store().thread(&thread_id) {
            print_thread(&thread);
        }
        for message in self.session.store().messages(&thread_id) {
            print_message(&message, self.session.viewer_id());
        }
        Ok(())
    }

    async fn send(&self, thread: &str, text: &str) -> Result<()> {
        self.session.start().await?;
        self.session.open_thread(&ThreadId::new(thread)).await?;
        let message_id = self.session.send(text).await?;
        println!("sent {message_id}");
        Ok(())
    }

    async fn approve(self, request: &str, application: &str) -> Result<()> {
        self.session.start().await?;
        let use_case = ApproveProviderUseCase::new(self.api.clone(), self.session.clone());
        let ApprovedOrder {
            order_id,
            display_ref,
            thread_id,
        } = use_case
            .execute(&RequestId::new(request), &ApplicationId::new(application))
            .await?;
        println!("order {display_ref} ({order_id}) accepted, chat {thread_id}");
        for message in self.session.store().messages(&thread_id) {
            print_message(&message, self.session.viewer_id());
        }
        Ok(())
    }

    async fn watch(self, args: &WatchArgs) -> Result<()> {
        let token = self.credentials.current();
        let messaging_rx = self.messaging.connect(token.as_ref())?;
        let notifications_rx = self.notifications.connect(token.as_ref())?;
        info!(
            socket_url = %self.config.api.effective_socket_url(),
            "Socket channels started"
        );

        if let Err(e) = self.session.start().await {
            warn!(error = %e, "Initial thread load failed");
        }
        if let Some(thread) = &args.thread {
            self.session.open_thread(&ThreadId::new(thread.as_str())).await?;
        }

        let viewer = self.session.viewer_id().clone();
        let messaging_rx = tap_events(messaging_rx, "messaging", viewer.clone());
        let notifications_rx = tap_events(notifications_rx, "notifications", viewer);

        println!("Watching for activity, press Ctrl-C to stop.");
        tokio::select! {
            () = self.session.run(messaging_rx, notifications_rx) => {
                warn!("Both socket channels closed");
            }
            signal = tokio::signal::ctrl_c() => {
                signal.wrap_err("failed to listen for Ctrl-C")?;
                info!("Interrupted, shutting down");
            }
        }

        self.session.logout();
        Ok(())
    }
}

/// Prints live events before handing them to the session.
fn tap_events(
    mut rx: mpsc::UnboundedReceiver<SocketEvent>,
    channel: &'static str,
    viewer: UserId,
) -> mpsc::UnboundedReceiver<SocketEvent> {
    let (tx, out) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Some(line) = describe_event(&event, channel, &viewer) {
                if matches!(event, SocketEvent::Error { recoverable: false, .. }) {
                    eprintln!("{line}");
                } else {
                    println!("{line}");
                }
            }
            if tx.send(event).is_err() {
                break;
            }
        }
    });
    out
}

/// One terminal line for a live event, or `None` for events not worth showing.
///
/// Messages from the viewer are skipped.
fn describe_event(event: &SocketEvent, channel: &str, viewer: &UserId) -> Option<String> {
    match event {
        SocketEvent::NewMessage(event) => {
            let thread_id = ThreadId::new(event.thread_id.as_str());
            let message = thread_adapter::to_message(&event.message, &thread_id);
            (!message.is_from(viewer)).then(|| {
                format!(
                    "[{thread_id}] {}: {}",
                    message.sender_id(),
                    message.body().preview()
                )
            })
        }
        SocketEvent::Notification(payload) => Some(format!(
            "* {}",
            payload
                .title
                .as_deref()
                .or(payload.body.as_deref())
                .unwrap_or("notification")
        )),
        SocketEvent::Connected { reconnected, .. } => Some(format!(
            "({channel} {})",
            if *reconnected { "reconnected" } else { "connected" }
        )),
        SocketEvent::Reconnecting { attempt } => {
            Some(format!("({channel} reconnecting, attempt {attempt})"))
        }
        SocketEvent::Error {
            message,
            recoverable: false,
        } => Some(format!("({channel} gave up: {message})")),
        _ => None,
    }
}

fn print_thread(thread: &Thread) {
    let read_only = if thread.is_read_only() { " [read-only]" } else { "" };
    let unread = match thread.unread_count() {
        0 => String::new(),
        n => format!(" ({n} unread)"),
    };
    println!("{}  {}{unread}{read_only}", thread.id(), thread.title());
}

fn print_message(message: &Message, viewer: &UserId) {
    let author = if message.is_system() {
        "system".to_string()
    } else if message.is_from(viewer) {
        "you".to_string()
    } else {
        message.sender_id().to_string()
    };
    println!(
        "{} {author}: {}",
        message.created_at().format("%Y-%m-%d %H:%M"),
        message.body().preview()
    );
}

async fn read_token_from_stdin() -> Result<String> {
    eprintln!("Paste your session token and press Enter:");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .wrap_err("failed to read token")?;
    Ok(line.trim().to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let _ = dotenvy::dotenv();

    let args = CliArgs::parse();
    let storage = StorageManager::new()?;
    let mut config = storage.load_config(args.config.as_deref())?;
    config.merge_with_args(&args);

    init_logging(&config)?;
    info!(version = marketchat::VERSION, "Starting marketchat");

    let credentials = SharedCredentials::new(None);
    let api = Arc::new(MarketplaceClient::new(
        &config.api.base_url,
        Some(config.api.request_timeout()),
        credentials.clone(),
    )?);
    let token_storage: Arc<dyn TokenStoragePort> = Arc::new(KeyringTokenStorage::for_host(
        api.base_url().host_str().unwrap_or("localhost"),
    ));

    match args.command {
        Command::Login => {
            let token = match args.token.clone() {
                Some(token) => token,
                None => read_token_from_stdin().await?,
            };
            let login = LoginUseCase::new(api, token_storage, credentials);
            let response = login
                .execute(LoginRequest::new(token, TokenSource::CommandLine))
                .await?;
            println!(
                "Signed in, {} conversation(s){}",
                response.thread_count,
                if response.token_persisted { ", token saved to keyring" } else { "" }
            );
            if let Some(user_id) = &args.user_id
                && let Err(e) = storage.remember_user_id(args.config.as_deref(), user_id)
            {
                warn!(error = %e, "Could not record user id");
            }
            return Ok(());
        }
        Command::Logout => {
            LoginUseCase::new(api, token_storage, credentials).logout().await?;
            println!("Signed out.");
            return Ok(());
        }
        _ => {}
    }

    let resolved = ResolveTokenUseCase::new(token_storage)
        .execute(args.token.clone())
        .await?
        .ok_or(AuthError::NoTokenAvailable)?;
    info!(source = %resolved.source, "Session token resolved");
    credentials.set(resolved.token);

    let runtime = Runtime::new(config, api, credentials)?;
    match args.command {
        Command::Threads => runtime.threads().await,
        Command::Open(open) => runtime.open(&open).await,
        Command::Send(send) => runtime.send(&send.thread, &send.message()).await,
        Command::Watch(watch) => runtime.watch(&watch).await,
        Command::Approve(approve) => runtime.approve(&approve.request, &approve.application).await,
        Command::Login | Command::Logout => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use marketchat::domain::wire::{ChatMessage, NewMessageEvent};

    use super::*;

    fn new_message(sender: serde_json::Value) -> SocketEvent {
        let message: ChatMessage = serde_json::from_value(serde_json::json!({
            "id": "m1",
            "senderId": sender,
            "kind": "text",
            "text": "on my way",
            "createdAt": "2026-03-01T09:30:00Z"
        }))
        .unwrap();
        SocketEvent::NewMessage(NewMessageEvent {
            thread_id: "t1".to_string(),
            message,
        })
    }

    #[test]
    fn test_own_messages_are_not_echoed() {
        let viewer = UserId::new("42");

        assert_eq!(describe_event(&new_message(serde_json::json!(42)), "messaging", &viewer), None);
        assert_eq!(
            describe_event(&new_message(serde_json::json!("42")), "messaging", &viewer),
            None
        );
        assert_eq!(
            describe_event(&new_message(serde_json::json!(7)), "messaging", &viewer).as_deref(),
            Some("[t1] 7: on my way")
        );
    }

    #[test]
    fn test_connection_events() {
        let viewer = UserId::new("42");
        let reconnected = SocketEvent::Connected {
            sid: "s".to_string(),
            reconnected: true,
        };
        assert_eq!(
            describe_event(&reconnected, "notifications", &viewer).as_deref(),
            Some("(notifications reconnected)")
        );
        let recoverable = SocketEvent::Error {
            message: "refused".to_string(),
            recoverable: true,
        };
        assert_eq!(describe_event(&recoverable, "messaging", &viewer), None);
    }
}
