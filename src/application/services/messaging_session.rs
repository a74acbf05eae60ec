//! Wires the socket namespaces to the store and the inbox for one session.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::messaging_store::{IncomingOutcome, MessagingStore};
use super::notification_inbox::NotificationInbox;
use crate::domain::entities::{MessageId, OrderId, ThreadId, UserId};
use crate::domain::errors::MessagingError;
use crate::domain::ports::{SocketEvent, SocketPort};

/// One signed-in viewer's messaging session.
///
/// Lives as long as the credentials do: rooms are joined for every known
/// thread regardless of which one is on screen, so unread counters keep
/// moving in the background.
#[derive(Clone)]
pub struct MessagingSession {
    store: MessagingStore,
    inbox: NotificationInbox,
    messaging: Arc<dyn SocketPort>,
    notifications: Arc<dyn SocketPort>,
    viewer_id: UserId,
}

impl MessagingSession {
    #[must_use]
    pub fn new(
        store: MessagingStore,
        inbox: NotificationInbox,
        messaging: Arc<dyn SocketPort>,
        notifications: Arc<dyn SocketPort>,
        viewer_id: UserId,
    ) -> Self {
        Self {
            store,
            inbox,
            messaging,
            notifications,
            viewer_id,
        }
    }

    #[must_use]
    pub const fn store(&self) -> &MessagingStore {
        &self.store
    }

    #[must_use]
    pub const fn inbox(&self) -> &NotificationInbox {
        &self.inbox
    }

    #[must_use]
    pub const fn viewer_id(&self) -> &UserId {
        &self.viewer_id
    }

    /// Loads the thread list and joins every thread room.
    ///
    /// # Errors
    /// Returns the thread-list failure; rooms of previously loaded threads
    /// are joined anyway.
    pub async fn start(&self) -> Result<(), MessagingError> {
        let loaded = self.store.load_threads(&self.viewer_id).await;
        self.join_thread_rooms();
        loaded
    }

    fn join_thread_rooms(&self) {
        for thread in self.store.threads() {
            self.messaging.join_room(thread.id());
        }
    }

    /// Opens a thread and checks its order for a status change.
    ///
    /// # Errors
    /// See [`MessagingStore::set_active_thread`].
    pub async fn open_thread(&self, thread_id: &ThreadId) -> Result<(), MessagingError> {
        self.store.set_active_thread(thread_id, &self.viewer_id).await?;
        self.refresh_active_order().await;
        Ok(())
    }

    /// Opens the thread of a freshly approved order and joins its room.
    ///
    /// # Errors
    /// See [`MessagingStore::open_thread_for_order`].
    pub async fn open_thread_for_order(
        &self,
        order_id: &OrderId,
        display_ref: &str,
    ) -> Result<ThreadId, MessagingError> {
        let thread_id = self
            .store
            .open_thread_for_order(order_id, display_ref, &self.viewer_id)
            .await?;
        self.join_thread_rooms();
        Ok(thread_id)
    }

    /// Sends to the active thread.
    ///
    /// While the messaging socket is down the echo cannot arrive, so the
    /// thread history is refetched after a successful send.
    ///
    /// # Errors
    /// See [`MessagingStore::send_message`].
    pub async fn send(&self, text: &str) -> Result<MessageId, MessagingError> {
        let message_id = self.store.send_message(text).await?;

        let status = self.messaging.status();
        if !status.is_connected()
            && let Some(thread_id) = self.store.active_thread_id()
        {
            info!(thread_id = %thread_id, %status, "Socket down, refreshing history after send");
            if let Err(e) = self.store.load_messages(&thread_id).await {
                warn!(error = %e, "History refresh after send failed");
            }
        }
        Ok(message_id)
    }

    async fn refresh_active_order(&self) {
        let Some(order_id) = self
            .store
            .active_thread_id()
            .and_then(|id| self.store.thread(&id))
            .map(|thread| thread.order_id().clone())
        else {
            return;
        };
        if let Err(e) = self.store.refresh_order_status(&order_id).await {
            debug!(order_id = %order_id, error = %e, "Order refresh failed");
        }
    }

    /// Applies one event from the messaging namespace.
    pub async fn handle_messaging_event(&self, event: SocketEvent) {
        match event {
            SocketEvent::NewMessage(payload) => {
                let outcome = self.store.add_incoming_message(&payload, &self.viewer_id);
                if outcome == IncomingOutcome::UnknownThread {
                    debug!(thread_id = %payload.thread_id, "Message for a new thread, reloading list");
                    if self.start().await.is_ok() {
                        self.store.add_incoming_message(&payload, &self.viewer_id);
                    }
                }
            }
            SocketEvent::MessageRead(payload) => {
                self.store.mark_as_read(&payload);
            }
            SocketEvent::Connected { reconnected, sid } => {
                if reconnected {
                    info!(%sid, "Messaging socket reconnected, reconciling");
                    self.reconcile().await;
                } else {
                    debug!(%sid, "Messaging socket connected");
                }
            }
            SocketEvent::Disconnected { reason } => {
                info!(%reason, "Messaging socket disconnected");
            }
            SocketEvent::Reconnecting { attempt } => {
                debug!(attempt, "Messaging socket reconnecting");
            }
            SocketEvent::Error {
                message,
                recoverable,
            } => {
                warn!(%message, recoverable, "Messaging socket error");
            }
            other => {
                debug!(event = ?other, "Ignoring event on messaging namespace");
            }
        }
    }

    /// Applies one event from the notifications namespace.
    pub async fn handle_notification_event(&self, event: SocketEvent) {
        match event {
            SocketEvent::Notification(payload) => {
                let about_order = payload
                    .kind
                    .as_deref()
                    .is_some_and(|kind| kind.starts_with("order"));
                self.inbox.receive(&payload);
                if about_order {
                    self.refresh_active_order().await;
                }
            }
            SocketEvent::NotificationRead(reference) => {
                self.inbox.mark_read(&reference);
            }
            SocketEvent::NotificationsReadAll => {
                self.inbox.mark_all_read();
            }
            SocketEvent::NotificationDeleted(reference) => {
                self.inbox.remove(&reference);
            }
            SocketEvent::Error {
                message,
                recoverable,
            } => {
                warn!(%message, recoverable, "Notifications socket error");
            }
            other if other.is_connection_event() => {
                debug!(event = ?other, "Notifications socket state changed");
            }
            other => {
                debug!(event = ?other, "Ignoring event on notifications namespace");
            }
        }
    }

    /// Backfills what the socket missed while it was down.
    async fn reconcile(&self) {
        if let Err(e) = self.start().await {
            warn!(error = %e, "Thread reload after reconnect failed");
        }
        if let Some(thread_id) = self.store.active_thread_id()
            && let Err(e) = self.store.load_messages(&thread_id).await
        {
            warn!(thread_id = %thread_id, error = %e, "History reload after reconnect failed");
        }
    }

    /// Routes events from both namespaces until both channels close.
    pub async fn run(
        &self,
        mut messaging_rx: mpsc::UnboundedReceiver<SocketEvent>,
        mut notifications_rx: mpsc::UnboundedReceiver<SocketEvent>,
    ) {
        let mut messaging_open = true;
        let mut notifications_open = true;

        while messaging_open || notifications_open {
            tokio::select! {
                event = messaging_rx.recv(), if messaging_open => match event {
                    Some(event) => self.handle_messaging_event(event).await,
                    None => messaging_open = false,
                },
                event = notifications_rx.recv(), if notifications_open => match event {
                    Some(event) => self.handle_notification_event(event).await,
                    None => notifications_open = false,
                },
            }
        }
        debug!("Session event loop finished");
    }

    /// Leaves every room, closes both sockets and wipes session state.
    pub fn logout(&self) {
        info!(viewer_id = %self.viewer_id, "Ending messaging session");
        self.messaging.leave_all_rooms();
        self.messaging.disconnect();
        self.notifications.disconnect();
        self.store.clear();
        self.inbox.clear();
    }
}
