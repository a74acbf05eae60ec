//! Messaging store: the single owner of thread and message state.
//!
//! All mutation goes through the operations below. The lock is never held
//! across an await: every operation snapshots what it needs, awaits the
//! network, then re-acquires the lock and applies the result only if the
//! session epoch is unchanged, so responses landing after `clear()` are
//! discarded.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use super::thread_adapter;
use crate::domain::entities::{
    Message, MessageId, MessageStatus, OrderId, OrderStatus, Thread, ThreadId, UserId,
};
use crate::domain::errors::MessagingError;
use crate::domain::ports::{AlertPort, MarketplacePort};
use crate::domain::wire::{MessageReadEvent, NewMessageEvent, OutgoingMessage};

/// Tunables for polling and read-receipt retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    /// Thread-list reloads made while waiting for a new order's thread.
    pub thread_poll_attempts: u32,
    pub thread_poll_interval: Duration,
    /// Extra mark-read attempts after the first failure.
    pub mark_read_retries: u32,
    pub mark_read_retry_delay: Duration,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            thread_poll_attempts: 10,
            thread_poll_interval: Duration::from_millis(1000),
            mark_read_retries: 3,
            mark_read_retry_delay: Duration::from_millis(500),
        }
    }
}

/// Load state of one thread's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Unloaded,
    Loading,
    Loaded,
    Failed,
}

/// Result of feeding a socket message into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncomingOutcome {
    Appended { from_viewer: bool },
    /// Same id already present; nothing changed.
    Duplicate,
    /// The thread is not in the loaded list.
    UnknownThread,
}

#[derive(Debug, Default)]
struct ThreadMessages {
    messages: Vec<Message>,
    load_state: LoadState,
    next_cursor: Option<String>,
    loading_older: bool,
}

impl ThreadMessages {
    fn contains(&self, id: &MessageId) -> bool {
        self.messages.iter().any(|m| m.id() == id)
    }
}

#[derive(Debug, Default)]
struct MessagingState {
    viewer_id: Option<UserId>,
    threads: Vec<Thread>,
    messages: HashMap<ThreadId, ThreadMessages>,
    active_thread_id: Option<ThreadId>,
    is_loading_threads: bool,
    sending_count: u32,
    error: Option<String>,
    order_statuses: HashMap<OrderId, OrderStatus>,
    banners: HashSet<ThreadId>,
    epoch: u64,
}

impl MessagingState {
    fn thread_mut(&mut self, thread_id: &ThreadId) -> Option<&mut Thread> {
        self.threads.iter_mut().find(|t| t.id() == thread_id)
    }

    fn thread(&self, thread_id: &ThreadId) -> Option<&Thread> {
        self.threads.iter().find(|t| t.id() == thread_id)
    }
}

/// Shared messaging state container.
///
/// Cloning is cheap and every clone observes the same state.
#[derive(Clone)]
pub struct MessagingStore {
    api: Arc<dyn MarketplacePort>,
    alerts: Arc<dyn AlertPort>,
    settings: StoreSettings,
    state: Arc<RwLock<MessagingState>>,
}

impl MessagingStore {
    #[must_use]
    pub fn new(
        api: Arc<dyn MarketplacePort>,
        alerts: Arc<dyn AlertPort>,
        settings: StoreSettings,
    ) -> Self {
        Self {
            api,
            alerts,
            settings,
            state: Arc::new(RwLock::new(MessagingState::default())),
        }
    }

    /// Replaces the thread list with the viewer's threads.
    ///
    /// On failure the previously loaded threads are kept.
    ///
    /// # Errors
    /// Returns the transport failure after recording it on the error field.
    pub async fn load_threads(&self, viewer_id: &UserId) -> Result<(), MessagingError> {
        let epoch = {
            let mut state = self.state.write();
            state.is_loading_threads = true;
            state.viewer_id = Some(viewer_id.clone());
            state.epoch
        };
        debug!(viewer_id = %viewer_id, "Loading threads");

        let result = self.api.fetch_threads().await;

        let mut state = self.state.write();
        if state.epoch != epoch {
            debug!("Discarding thread list fetched before the session was cleared");
            return Err(MessagingError::SessionCleared);
        }
        state.is_loading_threads = false;

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                let error = MessagingError::from(e);
                warn!(error = %error, "Failed to load threads, keeping previous list");
                state.error = Some(error.user_message());
                return Err(error);
            }
        };

        let active = state.active_thread_id.clone();
        let mut threads = Vec::with_capacity(page.data.len());
        for summary in &page.data {
            let known = summary
                .order_id
                .as_deref()
                .and_then(|id| state.order_statuses.get(&OrderId::new(id)).copied());
            let Some(mut thread) = thread_adapter::to_thread(summary, viewer_id, known) else {
                continue;
            };
            if active.as_ref() == Some(thread.id()) {
                thread.mark_read_locally();
            }
            if let Some(status) = thread.order_status() {
                state.order_statuses.insert(thread.order_id().clone(), status);
            }
            threads.push(thread);
        }

        info!(count = threads.len(), "Threads loaded");
        state.threads = threads;
        state.error = None;
        Ok(())
    }

    /// Fetches the full history of a thread and replaces its message list.
    ///
    /// Messages pushed over the socket while the fetch was in flight are kept
    /// after the fetched history when the response does not contain them.
    ///
    /// # Errors
    /// Returns the transport failure after recording it on the error field.
    pub async fn load_messages(&self, thread_id: &ThreadId) -> Result<(), MessagingError> {
        let (epoch, known_before) = {
            let mut state = self.state.write();
            let epoch = state.epoch;
            let entry = state.messages.entry(thread_id.clone()).or_default();
            entry.load_state = LoadState::Loading;
            let known: HashSet<MessageId> = entry.messages.iter().map(|m| m.id().clone()).collect();
            (epoch, known)
        };
        debug!(thread_id = %thread_id, "Loading messages");

        let result = self.api.fetch_messages(thread_id, None).await;

        let mut state = self.state.write();
        if state.epoch != epoch {
            return Err(MessagingError::SessionCleared);
        }

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                let error = MessagingError::from(e);
                warn!(thread_id = %thread_id, error = %error, "Failed to load messages");
                state.messages.entry(thread_id.clone()).or_default().load_state =
                    LoadState::Failed;
                state.error = Some(error.user_message());
                return Err(error);
            }
        };

        let mut fetched: Vec<Message> = Vec::with_capacity(page.data.len());
        for wire in &page.data {
            let message = thread_adapter::to_message(wire, thread_id);
            if !fetched.iter().any(|m| m.id() == message.id()) {
                fetched.push(message);
            }
        }

        let entry = state.messages.entry(thread_id.clone()).or_default();
        let previous = std::mem::take(&mut entry.messages);
        let history_is_empty = fetched.is_empty();
        let fetched_ids: HashSet<MessageId> = fetched.iter().map(|m| m.id().clone()).collect();

        let mut merged = Vec::with_capacity(previous.len() + fetched.len());
        let mut arrivals = Vec::new();
        for message in previous {
            if message.is_local() {
                if history_is_empty {
                    merged.push(message);
                }
            } else if !known_before.contains(message.id()) && !fetched_ids.contains(message.id())
            {
                arrivals.push(message);
            }
        }
        if !arrivals.is_empty() {
            debug!(
                thread_id = %thread_id,
                count = arrivals.len(),
                "Keeping socket messages newer than the fetched history"
            );
        }
        merged.extend(fetched);
        merged.extend(arrivals);

        let latest = merged
            .iter()
            .filter(|m| !m.is_local())
            .map(Message::created_at)
            .max();
        let count = merged.len();
        entry.messages = merged;
        entry.load_state = LoadState::Loaded;
        entry.next_cursor = page.next_cursor;

        if let (Some(at), Some(thread)) = (latest, state.thread_mut(thread_id)) {
            thread.touch(at);
        }
        debug!(thread_id = %thread_id, count, "Messages loaded");
        Ok(())
    }

    /// Loads the page before the oldest loaded message.
    ///
    /// Returns the number of messages prepended; zero when there is no more
    /// history or a page is already loading.
    ///
    /// # Errors
    /// Returns the transport failure after recording it on the error field.
    pub async fn load_older_messages(&self, thread_id: &ThreadId) -> Result<usize, MessagingError> {
        let (epoch, cursor) = {
            let mut state = self.state.write();
            let epoch = state.epoch;
            let Some(entry) = state.messages.get_mut(thread_id) else {
                return Ok(0);
            };
            let Some(cursor) = entry.next_cursor.clone() else {
                return Ok(0);
            };
            if entry.loading_older || entry.load_state != LoadState::Loaded {
                return Ok(0);
            }
            entry.loading_older = true;
            (epoch, cursor)
        };
        debug!(thread_id = %thread_id, "Loading older messages");

        let result = self.api.fetch_messages(thread_id, Some(cursor)).await;

        let mut state = self.state.write();
        if state.epoch != epoch {
            return Err(MessagingError::SessionCleared);
        }
        let page = match result {
            Ok(page) => page,
            Err(e) => {
                let error = MessagingError::from(e);
                warn!(thread_id = %thread_id, error = %error, "Failed to load older messages");
                if let Some(entry) = state.messages.get_mut(thread_id) {
                    entry.loading_older = false;
                }
                state.error = Some(error.user_message());
                return Err(error);
            }
        };

        let entry = state.messages.entry(thread_id.clone()).or_default();
        entry.loading_older = false;
        entry.next_cursor = page.next_cursor;

        let mut older: Vec<Message> = Vec::with_capacity(page.data.len());
        for wire in &page.data {
            let message = thread_adapter::to_message(wire, thread_id);
            if !entry.contains(message.id()) && !older.iter().any(|m| m.id() == message.id()) {
                older.push(message);
            }
        }
        let added = older.len();
        older.append(&mut entry.messages);
        entry.messages = older;
        Ok(added)
    }

    /// Makes `thread_id` the viewed thread, loading its history if needed and
    /// sending a read receipt.
    ///
    /// The unread counter is zeroed locally without waiting for the server;
    /// the receipt is retried in the background. Neither happens if another
    /// thread became active while the history was loading.
    ///
    /// # Errors
    /// Returns [`MessagingError::ThreadNotFound`] for unknown threads, or the
    /// history load failure.
    pub async fn set_active_thread(
        &self,
        thread_id: &ThreadId,
        viewer_id: &UserId,
    ) -> Result<(), MessagingError> {
        let (epoch, needs_load) = {
            let mut state = self.state.write();
            state.viewer_id = Some(viewer_id.clone());
            if state.thread(thread_id).is_none() {
                let error = MessagingError::ThreadNotFound {
                    thread_id: thread_id.clone(),
                };
                state.error = Some(error.user_message());
                return Err(error);
            }
            state.active_thread_id = Some(thread_id.clone());
            let load_state = state
                .messages
                .get(thread_id)
                .map(|entry| entry.load_state)
                .unwrap_or_default();
            (
                state.epoch,
                matches!(load_state, LoadState::Unloaded | LoadState::Failed),
            )
        };
        debug!(thread_id = %thread_id, needs_load, "Activating thread");

        let loaded = if needs_load {
            self.load_messages(thread_id).await
        } else {
            Ok(())
        };

        {
            let mut state = self.state.write();
            if state.epoch != epoch {
                return Err(MessagingError::SessionCleared);
            }
            if state.active_thread_id.as_ref() != Some(thread_id) {
                debug!(thread_id = %thread_id, "Thread no longer active, skipping read receipt");
                return loaded;
            }
            if let Some(thread) = state.thread_mut(thread_id) {
                thread.mark_read_locally();
            }
        }
        self.spawn_mark_read(thread_id.clone());

        loaded
    }

    /// Sends `text` to the active thread.
    ///
    /// The returned message is not inserted: the socket echo is the only
    /// copy that enters the message list.
    ///
    /// # Errors
    /// Rejects without a network call when there is no active thread, the
    /// thread is read-only or the text is blank; otherwise returns the
    /// transport failure.
    pub async fn send_message(&self, text: &str) -> Result<MessageId, MessagingError> {
        let (epoch, thread_id) = {
            let mut state = self.state.write();
            match Self::check_sendable(&state, text) {
                Ok(thread_id) => {
                    state.sending_count += 1;
                    (state.epoch, thread_id)
                }
                Err(error) => {
                    debug!(error = %error, "Send rejected locally");
                    state.error = Some(error.user_message());
                    return Err(error);
                }
            }
        };
        debug!(thread_id = %thread_id, "Sending message");

        let result = self
            .api
            .send_message(&thread_id, OutgoingMessage::text(text.trim()))
            .await;

        let mut state = self.state.write();
        if state.epoch != epoch {
            return Err(MessagingError::SessionCleared);
        }
        state.sending_count = state.sending_count.saturating_sub(1);

        match result {
            Ok(message) => {
                info!(thread_id = %thread_id, message_id = %message.id, "Message sent");
                Ok(MessageId::new(message.id))
            }
            Err(e) => {
                let error = MessagingError::from(e);
                warn!(thread_id = %thread_id, error = %error, "Failed to send message");
                state.error = Some(error.user_message());
                Err(error)
            }
        }
    }

    fn check_sendable(state: &MessagingState, text: &str) -> Result<ThreadId, MessagingError> {
        let thread_id = state
            .active_thread_id
            .clone()
            .ok_or(MessagingError::NoActiveThread)?;
        let thread = state
            .thread(&thread_id)
            .ok_or_else(|| MessagingError::ThreadNotFound {
                thread_id: thread_id.clone(),
            })?;
        if thread.is_read_only() {
            return Err(MessagingError::ThreadReadOnly { thread_id });
        }
        if text.trim().is_empty() {
            return Err(MessagingError::EmptyMessage);
        }
        Ok(thread_id)
    }

    /// Applies a `new-message` event. Safe to call with replayed events.
    pub fn add_incoming_message(
        &self,
        event: &NewMessageEvent,
        viewer_id: &UserId,
    ) -> IncomingOutcome {
        let thread_id = ThreadId::new(event.thread_id.as_str());
        let message = thread_adapter::to_message(&event.message, &thread_id);
        let from_viewer = message.is_from(viewer_id);

        {
            let mut state = self.state.write();
            if state.thread(&thread_id).is_none() {
                debug!(thread_id = %thread_id, "Message for unknown thread");
                return IncomingOutcome::UnknownThread;
            }

            let entry = state.messages.entry(thread_id.clone()).or_default();
            if entry.contains(message.id()) {
                debug!(thread_id = %thread_id, message_id = %message.id(), "Dropping duplicate message");
                return IncomingOutcome::Duplicate;
            }
            let created_at = message.created_at();
            entry.messages.push(message);

            let is_active = state.active_thread_id.as_ref() == Some(&thread_id);
            if let Some(thread) = state.thread_mut(&thread_id) {
                thread.touch(created_at);
                if !from_viewer && !is_active {
                    thread.increment_unread();
                }
            }
        }

        if !from_viewer {
            self.alerts.play_message_sound();
        }
        IncomingOutcome::Appended { from_viewer }
    }

    /// Applies a `message-read` event: every message in the thread becomes
    /// read. Returns how many messages changed.
    pub fn mark_as_read(&self, event: &MessageReadEvent) -> usize {
        let thread_id = ThreadId::new(event.thread_id.as_str());
        let reader = UserId::new(event.user_id.as_str());

        let mut state = self.state.write();
        let changed = state.messages.get_mut(&thread_id).map_or(0, |entry| {
            entry
                .messages
                .iter_mut()
                .filter_map(|m| m.advance_status(MessageStatus::Read).then_some(()))
                .count()
        });

        if state.viewer_id.as_ref() == Some(&reader)
            && let Some(thread) = state.thread_mut(&thread_id)
        {
            thread.mark_read_locally();
        }
        debug!(thread_id = %thread_id, changed, "Messages marked read");
        changed
    }

    /// Opens the thread created for `order_id`, polling until it exists.
    ///
    /// The thread is created by the backend some time after a provider is
    /// approved, so the thread list is reloaded up to
    /// `thread_poll_attempts` times. Once found, a local banner mentioning
    /// `display_ref` is shown while the history loads.
    ///
    /// # Errors
    /// [`MessagingError::ThreadNotCreated`] when the thread never appears.
    pub async fn open_thread_for_order(
        &self,
        order_id: &OrderId,
        display_ref: &str,
        viewer_id: &UserId,
    ) -> Result<ThreadId, MessagingError> {
        let epoch = self.state.read().epoch;
        let attempts = self.settings.thread_poll_attempts.max(1);
        info!(order_id = %order_id, attempts, "Waiting for order thread");

        let mut found = None;
        for attempt in 1..=attempts {
            match self.load_threads(viewer_id).await {
                Err(MessagingError::SessionCleared) => return Err(MessagingError::SessionCleared),
                Err(e) => debug!(attempt, error = %e, "Thread poll attempt failed"),
                Ok(()) => {}
            }

            found = self
                .state
                .read()
                .threads
                .iter()
                .find(|t| t.order_id() == order_id)
                .map(|t| t.id().clone());
            if found.is_some() {
                debug!(attempt, "Order thread found");
                break;
            }
            if attempt < attempts {
                tokio::time::sleep(self.settings.thread_poll_interval).await;
            }
        }

        let Some(thread_id) = found else {
            let error = MessagingError::ThreadNotCreated {
                order_id: order_id.clone(),
                attempts,
            };
            error!(order_id = %order_id, attempts, "Order thread never appeared");
            let mut state = self.state.write();
            if state.epoch == epoch {
                state.error = Some(error.user_message());
            }
            return Err(error);
        };

        {
            let mut state = self.state.write();
            if state.epoch != epoch {
                return Err(MessagingError::SessionCleared);
            }
            Self::inject_banner(&mut state, &thread_id, display_ref);
        }

        self.set_active_thread(&thread_id, viewer_id).await?;
        Ok(thread_id)
    }

    fn inject_banner(state: &mut MessagingState, thread_id: &ThreadId, display_ref: &str) {
        if state.banners.contains(thread_id) {
            return;
        }
        let entry = state.messages.entry(thread_id.clone()).or_default();
        if entry.messages.iter().any(Message::is_system) {
            return;
        }
        entry
            .messages
            .insert(0, Message::system_banner(thread_id, display_ref, Utc::now()));
        state.banners.insert(thread_id.clone());
        debug!(thread_id = %thread_id, "System banner added");
    }

    /// Fetches the order and re-derives read-only state of its thread.
    ///
    /// # Errors
    /// Returns the transport failure after recording it on the error field.
    pub async fn refresh_order_status(
        &self,
        order_id: &OrderId,
    ) -> Result<OrderStatus, MessagingError> {
        let epoch = self.state.read().epoch;
        let result = self.api.fetch_order(order_id).await;

        let mut state = self.state.write();
        if state.epoch != epoch {
            return Err(MessagingError::SessionCleared);
        }
        let order = match result {
            Ok(resource) => thread_adapter::to_order(&resource),
            Err(e) => {
                let error = MessagingError::from(e);
                warn!(order_id = %order_id, error = %error, "Failed to refresh order");
                state.error = Some(error.user_message());
                return Err(error);
            }
        };

        let status = state
            .order_statuses
            .get(order_id)
            .map_or(order.status(), |known| {
                OrderStatus::freshest(*known, order.status())
            });
        state.order_statuses.insert(order_id.clone(), status);
        for thread in state.threads.iter_mut().filter(|t| t.order_id() == order_id) {
            thread.observe_order_status(status);
        }
        if order.freezes_thread() {
            info!(order_id = %order_id, status = %status, "Order ended, thread is now read-only");
        }
        Ok(status)
    }

    /// Wipes all state. In-flight operations started before the call are
    /// discarded when they complete.
    pub fn clear(&self) {
        let mut state = self.state.write();
        let epoch = state.epoch.wrapping_add(1);
        *state = MessagingState {
            epoch,
            ..MessagingState::default()
        };
        info!("Messaging state cleared");
    }

    fn spawn_mark_read(&self, thread_id: ThreadId) {
        let api = Arc::clone(&self.api);
        let attempts = self.settings.mark_read_retries.saturating_add(1);
        let delay = self.settings.mark_read_retry_delay;

        tokio::spawn(async move {
            for attempt in 1..=attempts {
                match api.mark_thread_read(&thread_id).await {
                    Ok(()) => {
                        debug!(thread_id = %thread_id, attempt, "Read receipt sent");
                        return;
                    }
                    Err(e) if attempt < attempts && e.is_recoverable() => {
                        warn!(thread_id = %thread_id, attempt, error = %e, "Read receipt failed, retrying");
                        tokio::time::sleep(delay * attempt).await;
                    }
                    Err(e) => {
                        error!(thread_id = %thread_id, attempt, error = %e, "Read receipt dropped");
                        return;
                    }
                }
            }
        });
    }

    #[must_use]
    pub fn threads(&self) -> Vec<Thread> {
        self.state.read().threads.clone()
    }

    #[must_use]
    pub fn thread(&self, thread_id: &ThreadId) -> Option<Thread> {
        self.state.read().thread(thread_id).cloned()
    }

    #[must_use]
    pub fn messages(&self, thread_id: &ThreadId) -> Vec<Message> {
        self.state
            .read()
            .messages
            .get(thread_id)
            .map(|entry| entry.messages.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn active_thread_id(&self) -> Option<ThreadId> {
        self.state.read().active_thread_id.clone()
    }

    #[must_use]
    pub fn viewer_id(&self) -> Option<UserId> {
        self.state.read().viewer_id.clone()
    }

    #[must_use]
    pub fn load_state(&self, thread_id: &ThreadId) -> LoadState {
        self.state
            .read()
            .messages
            .get(thread_id)
            .map(|entry| entry.load_state)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_loading_messages(&self, thread_id: &ThreadId) -> bool {
        self.load_state(thread_id) == LoadState::Loading
    }

    #[must_use]
    pub fn has_older_messages(&self, thread_id: &ThreadId) -> bool {
        self.state
            .read()
            .messages
            .get(thread_id)
            .is_some_and(|entry| entry.next_cursor.is_some())
    }

    #[must_use]
    pub fn is_loading_threads(&self) -> bool {
        self.state.read().is_loading_threads
    }

    /// True only while at least one send request is in flight.
    #[must_use]
    pub fn is_sending_message(&self) -> bool {
        self.state.read().sending_count > 0
    }

    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.state.read().error.clone()
    }

    pub fn dismiss_error(&self) {
        self.state.write().error = None;
    }

    #[must_use]
    pub fn total_unread(&self) -> u32 {
        self.state
            .read()
            .threads
            .iter()
            .map(Thread::unread_count)
            .sum()
    }
}
