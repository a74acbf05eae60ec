//! Marketplace REST port.

use async_trait::async_trait;

use crate::domain::entities::{ApplicationId, OrderId, RequestId, ThreadId};
use crate::domain::errors::TransportError;
use crate::domain::wire::{
    AcceptedRequest, ChatMessage, MessagePage, OrderResource, OutgoingMessage, ThreadPage,
};

/// Authenticated access to the marketplace REST API.
///
/// Every method maps non-2xx responses to [`TransportError::Http`] and
/// missing responses to [`TransportError::Network`]; implementations never
/// panic on malformed bodies.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketplacePort: Send + Sync {
    /// `GET /threads` for the authenticated viewer.
    async fn fetch_threads(&self) -> Result<ThreadPage, TransportError>;

    /// `GET /threads/{id}/messages`, optionally continuing from `cursor`.
    async fn fetch_messages(
        &self,
        thread_id: &ThreadId,
        cursor: Option<String>,
    ) -> Result<MessagePage, TransportError>;

    /// `POST /threads/{id}/messages`.
    async fn send_message(
        &self,
        thread_id: &ThreadId,
        message: OutgoingMessage,
    ) -> Result<ChatMessage, TransportError>;

    /// `POST /threads/{id}/read`.
    async fn mark_thread_read(&self, thread_id: &ThreadId) -> Result<(), TransportError>;

    /// `GET /orders/{id}`.
    async fn fetch_order(&self, order_id: &OrderId) -> Result<OrderResource, TransportError>;

    /// `POST /requests/{id}/accept`.
    async fn accept_request(
        &self,
        request_id: &RequestId,
        application_id: &ApplicationId,
    ) -> Result<AcceptedRequest, TransportError>;
}

#[cfg(test)]
pub mod mock {
    use std::collections::{HashMap, VecDeque};
    use std::sync::Arc;

    use chrono::{DateTime, TimeZone, Utc};
    use parking_lot::Mutex;
    use tokio::sync::Notify;

    use super::*;
    use crate::domain::entities::{MessageKind, MessageStatus, OrderStatus, ThreadStatus};
    use crate::domain::wire::ParticipantSummary;
    use crate::domain::wire::ThreadSummary;

    /// Counts of calls made against [`FakeMarketplace`].
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct CallCounts {
        pub fetch_threads: u32,
        pub fetch_messages: u32,
        pub send_message: u32,
        pub mark_thread_read: u32,
        pub fetch_order: u32,
        pub accept_request: u32,
    }

    #[derive(Default)]
    struct FakeState {
        thread_script: VecDeque<Result<Vec<ThreadSummary>, TransportError>>,
        threads: Vec<ThreadSummary>,
        messages: HashMap<ThreadId, Result<MessagePage, TransportError>>,
        older: HashMap<(ThreadId, String), MessagePage>,
        gates: HashMap<ThreadId, Arc<Notify>>,
        orders: HashMap<OrderId, OrderResource>,
        accepted: Option<Result<AcceptedRequest, TransportError>>,
        send_error: Option<TransportError>,
        mark_read_failures: u32,
        mark_read_failure_status: Option<u16>,
        sent: Vec<(ThreadId, OutgoingMessage)>,
        calls: CallCounts,
    }

    /// In-memory marketplace with scripted responses.
    #[derive(Default, Clone)]
    pub struct FakeMarketplace {
        state: Arc<Mutex<FakeState>>,
    }

    impl FakeMarketplace {
        pub fn new() -> Self {
            Self::default()
        }

        /// Steady-state thread list returned once the script is exhausted.
        pub fn set_threads(&self, threads: Vec<ThreadSummary>) {
            self.state.lock().threads = threads;
        }

        /// Queues one `fetch_threads` outcome ahead of the steady state.
        pub fn push_threads_response(&self, response: Result<Vec<ThreadSummary>, TransportError>) {
            self.state.lock().thread_script.push_back(response);
        }

        pub fn set_messages(&self, thread_id: &str, page: MessagePage) {
            self.state
                .lock()
                .messages
                .insert(ThreadId::new(thread_id), Ok(page));
        }

        pub fn fail_messages(&self, thread_id: &str, error: TransportError) {
            self.state
                .lock()
                .messages
                .insert(ThreadId::new(thread_id), Err(error));
        }

        pub fn set_older_messages(&self, thread_id: &str, cursor: &str, page: MessagePage) {
            self.state
                .lock()
                .older
                .insert((ThreadId::new(thread_id), cursor.to_string()), page);
        }

        /// Makes `fetch_messages` for `thread_id` wait until the returned
        /// handle is notified.
        pub fn hold_messages(&self, thread_id: &str) -> Arc<Notify> {
            let gate = Arc::new(Notify::new());
            self.state
                .lock()
                .gates
                .insert(ThreadId::new(thread_id), Arc::clone(&gate));
            gate
        }

        pub fn set_order(&self, order_id: &str, status: OrderStatus) {
            self.state.lock().orders.insert(
                OrderId::new(order_id),
                OrderResource {
                    id: order_id.to_string(),
                    request_id: None,
                    status,
                },
            );
        }

        pub fn set_accept_response(&self, response: Result<AcceptedRequest, TransportError>) {
            self.state.lock().accepted = Some(response);
        }

        pub fn fail_sends(&self, error: TransportError) {
            self.state.lock().send_error = Some(error);
        }

        /// Fails the next `count` mark-read calls with a 503.
        pub fn fail_mark_read(&self, count: u32) {
            self.state.lock().mark_read_failures = count;
        }

        /// Fails the next `count` read receipts with `status`.
        pub fn reject_mark_read(&self, count: u32, status: u16) {
            let mut state = self.state.lock();
            state.mark_read_failures = count;
            state.mark_read_failure_status = Some(status);
        }

        pub fn calls(&self) -> CallCounts {
            self.state.lock().calls
        }

        pub fn sent(&self) -> Vec<(ThreadId, OutgoingMessage)> {
            self.state.lock().sent.clone()
        }
    }

    #[async_trait]
    impl MarketplacePort for FakeMarketplace {
        async fn fetch_threads(&self) -> Result<ThreadPage, TransportError> {
            let mut state = self.state.lock();
            state.calls.fetch_threads += 1;
            let data = match state.thread_script.pop_front() {
                Some(response) => response?,
                None => state.threads.clone(),
            };
            Ok(ThreadPage {
                total: data.len() as u64,
                page: 1,
                limit: 50,
                data,
            })
        }

        async fn fetch_messages(
            &self,
            thread_id: &ThreadId,
            cursor: Option<String>,
        ) -> Result<MessagePage, TransportError> {
            let gate = {
                let mut state = self.state.lock();
                state.calls.fetch_messages += 1;
                state.gates.remove(thread_id)
            };
            if let Some(gate) = gate {
                gate.notified().await;
            }

            let state = self.state.lock();
            if let Some(cursor) = cursor {
                return Ok(state
                    .older
                    .get(&(thread_id.clone(), cursor))
                    .cloned()
                    .unwrap_or_default());
            }
            state
                .messages
                .get(thread_id)
                .cloned()
                .unwrap_or_else(|| Ok(MessagePage::default()))
        }

        async fn send_message(
            &self,
            thread_id: &ThreadId,
            message: OutgoingMessage,
        ) -> Result<ChatMessage, TransportError> {
            let mut state = self.state.lock();
            state.calls.send_message += 1;
            if let Some(error) = state.send_error.clone() {
                return Err(error);
            }
            let echo = chat_message(
                &format!("srv-{}", state.sent.len() + 1),
                thread_id.as_str(),
                "u1",
                &message.text,
            );
            state.sent.push((thread_id.clone(), message));
            Ok(echo)
        }

        async fn mark_thread_read(&self, _thread_id: &ThreadId) -> Result<(), TransportError> {
            let mut state = self.state.lock();
            state.calls.mark_thread_read += 1;
            if state.mark_read_failures > 0 {
                state.mark_read_failures -= 1;
                return Err(TransportError::status(
                    state.mark_read_failure_status.unwrap_or(503),
                ));
            }
            Ok(())
        }

        async fn fetch_order(&self, order_id: &OrderId) -> Result<OrderResource, TransportError> {
            let mut state = self.state.lock();
            state.calls.fetch_order += 1;
            state
                .orders
                .get(order_id)
                .cloned()
                .ok_or_else(|| TransportError::status(404))
        }

        async fn accept_request(
            &self,
            _request_id: &RequestId,
            _application_id: &ApplicationId,
        ) -> Result<AcceptedRequest, TransportError> {
            let mut state = self.state.lock();
            state.calls.accept_request += 1;
            state
                .accepted
                .clone()
                .unwrap_or_else(|| Err(TransportError::status(404)))
        }
    }

    /// Fixed timestamp `minute` minutes past a reference instant.
    pub fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 10, minute, 0)
            .single()
            .unwrap_or_default()
    }

    /// Thread summary between `participants`, bound to `order_id`.
    pub fn thread_summary(id: &str, order_id: &str, participants: [&str; 2]) -> ThreadSummary {
        ThreadSummary {
            id: id.to_string(),
            order_id: Some(order_id.to_string()),
            title: Some(format!("Order {order_id}")),
            participants: participants
                .iter()
                .map(|p| ParticipantSummary {
                    id: (*p).to_string(),
                    display_name: Some(format!("User {p}")),
                })
                .collect(),
            status: ThreadStatus::Open,
            order_status: Some(OrderStatus::InProgress),
            last_message_at: None,
            unread_counts: HashMap::new(),
        }
    }

    pub fn chat_message(id: &str, thread_id: &str, sender_id: &str, text: &str) -> ChatMessage {
        ChatMessage {
            id: id.to_string(),
            thread_id: Some(thread_id.to_string()),
            sender_id: sender_id.to_string(),
            kind: MessageKind::Text,
            text: Some(text.to_string()),
            url: None,
            caption: None,
            file_name: None,
            file_size: None,
            created_at: at(0),
            status: MessageStatus::Sent,
        }
    }

    pub fn page(messages: Vec<ChatMessage>) -> MessagePage {
        MessagePage {
            data: messages,
            next_cursor: None,
        }
    }
}
