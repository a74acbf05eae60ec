//! Mapping from backend wire shapes to entities. No I/O.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::domain::entities::{
    InboxNotification, Message, MessageBody, MessageId, MessageKind, NotificationId, Order,
    OrderId, OrderStatus, RequestId, Thread, ThreadId, UserId,
};
use crate::domain::wire::{ChatMessage, NotificationPayload, OrderResource, ThreadSummary};

/// Converts a thread summary into a [`Thread`] as seen by `viewer`.
///
/// `known_order_status` is the freshest order status the caller learned
/// outside the thread list; it is reconciled with the status embedded in the
/// summary. Returns `None` for summaries that cannot form a valid two-party
/// thread bound to an order.
#[must_use]
pub fn to_thread(
    summary: &ThreadSummary,
    viewer: &UserId,
    known_order_status: Option<OrderStatus>,
) -> Option<Thread> {
    let Some(order_id) = summary.order_id.as_deref().map(OrderId::new) else {
        warn!(thread_id = %summary.id, "Dropping thread without an order");
        return None;
    };

    let mut participants: Vec<(UserId, Option<&str>)> = Vec::with_capacity(2);
    for participant in &summary.participants {
        let id = UserId::new(participant.id.as_str());
        if !participants.iter().any(|(existing, _)| *existing == id) {
            participants.push((id, participant.display_name.as_deref()));
        }
    }
    let [first, second] = participants.as_slice() else {
        warn!(
            thread_id = %summary.id,
            participants = participants.len(),
            "Dropping thread without exactly two participants"
        );
        return None;
    };

    let counter_party_name = [first, second]
        .into_iter()
        .find(|(id, _)| id != viewer)
        .and_then(|(_, name)| *name)
        .map(str::trim)
        .filter(|name| !name.is_empty());
    let title = counter_party_name
        .or_else(|| summary.title.as_deref().map(str::trim).filter(|t| !t.is_empty()))
        .map_or_else(|| format!("Order {order_id}"), ToString::to_string);

    let order_status = match (known_order_status, summary.order_status) {
        (Some(known), Some(incoming)) => Some(OrderStatus::freshest(known, incoming)),
        (known, incoming) => incoming.or(known),
    };

    let unread = summary
        .unread_counts
        .get(viewer.as_str())
        .copied()
        .unwrap_or(0);

    Some(
        Thread::new(
            ThreadId::new(summary.id.as_str()),
            order_id,
            title,
            [first.0.clone(), second.0.clone()],
        )
        .with_status(summary.status)
        .with_order_status(order_status)
        .with_last_message_at(summary.last_message_at)
        .with_unread_count(unread),
    )
}

/// Converts a wire message. `thread_id` is used when the payload omits it.
#[must_use]
pub fn to_message(wire: &ChatMessage, thread_id: &ThreadId) -> Message {
    let body = match wire.kind {
        MessageKind::Text => MessageBody::text(wire.text.clone().unwrap_or_default()),
        MessageKind::Image => MessageBody::Image {
            url: wire.url.clone().unwrap_or_default(),
            caption: wire.caption.clone().or_else(|| wire.text.clone()),
        },
        MessageKind::File => MessageBody::File {
            url: wire.url.clone().unwrap_or_default(),
            file_name: wire
                .file_name
                .clone()
                .unwrap_or_else(|| "attachment".to_string()),
            size: wire.file_size,
        },
    };

    let thread_id = wire
        .thread_id
        .as_deref()
        .map_or_else(|| thread_id.clone(), ThreadId::new);

    Message::new(
        MessageId::new(wire.id.as_str()),
        thread_id,
        UserId::new(wire.sender_id.as_str()),
        body,
        wire.created_at,
    )
    .with_status(wire.status)
}

#[must_use]
pub fn to_order(resource: &OrderResource) -> Order {
    Order::new(
        OrderId::new(resource.id.as_str()),
        resource.request_id.as_deref().map(RequestId::new),
        resource.status,
    )
}

/// Converts a notification payload. `now` stamps payloads without a date.
#[must_use]
pub fn to_notification(payload: &NotificationPayload, now: DateTime<Utc>) -> InboxNotification {
    let kind = payload.kind.clone().unwrap_or_else(|| "general".to_string());
    let title = payload
        .title
        .clone()
        .unwrap_or_else(|| "Notification".to_string());

    InboxNotification::new(
        NotificationId::new(payload.id.as_str()),
        kind,
        title,
        payload.body.clone().unwrap_or_default(),
        payload.created_at.unwrap_or(now),
    )
    .with_read(payload.read)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::domain::entities::{MessageStatus, ThreadStatus};
    use crate::domain::ports::mocks::{at, chat_message, thread_summary};
    use crate::domain::wire::ParticipantSummary;
    use test_case::test_case;

    fn viewer() -> UserId {
        UserId::new("u1")
    }

    #[test]
    fn test_title_is_counter_party_name() {
        let summary = thread_summary("t1", "o1", ["u1", "u2"]);
        let thread = to_thread(&summary, &viewer(), None).unwrap();

        assert_eq!(thread.title(), "User u2");
        assert_eq!(thread.order_id().as_str(), "o1");
    }

    #[test]
    fn test_title_falls_back_to_summary_title() {
        let mut summary = thread_summary("t1", "o1", ["u1", "u2"]);
        summary.participants[1].display_name = None;

        let thread = to_thread(&summary, &viewer(), None).unwrap();
        assert_eq!(thread.title(), "Order o1");
    }

    #[test]
    fn test_unread_count_for_viewer_only() {
        let mut summary = thread_summary("t1", "o1", ["u1", "u2"]);
        summary.unread_counts = HashMap::from([("u2".to_string(), 7)]);
        assert_eq!(to_thread(&summary, &viewer(), None).unwrap().unread_count(), 0);

        summary.unread_counts.insert("u1".to_string(), 3);
        assert_eq!(to_thread(&summary, &viewer(), None).unwrap().unread_count(), 3);
    }

    #[test]
    fn test_participants_are_normalized_and_deduplicated() {
        let mut summary = thread_summary("t1", "o1", ["u1", "u2"]);
        summary.participants.push(ParticipantSummary {
            id: " u2 ".to_string(),
            display_name: None,
        });

        let thread = to_thread(&summary, &viewer(), None).unwrap();
        assert!(thread.has_participant(&UserId::new("u2")));
    }

    #[test]
    fn test_thread_without_two_participants_is_dropped() {
        let mut summary = thread_summary("t1", "o1", ["u1", "u2"]);
        summary.participants.truncate(1);
        assert!(to_thread(&summary, &viewer(), None).is_none());

        let mut unbound = thread_summary("t2", "o2", ["u1", "u2"]);
        unbound.order_id = None;
        assert!(to_thread(&unbound, &viewer(), None).is_none());
    }

    #[test_case(ThreadStatus::Open, Some(OrderStatus::InProgress), None, false ; "active_order")]
    #[test_case(ThreadStatus::Archived, Some(OrderStatus::InProgress), None, true ; "archived")]
    #[test_case(ThreadStatus::Blocked, None, None, true ; "blocked")]
    #[test_case(ThreadStatus::Open, Some(OrderStatus::Completed), None, true ; "completed_order")]
    #[test_case(ThreadStatus::Open, Some(OrderStatus::InProgress), Some(OrderStatus::Canceled), true ; "known_cancel_wins")]
    #[test_case(ThreadStatus::Open, None, Some(OrderStatus::Completed), true ; "known_only")]
    #[test_case(ThreadStatus::Open, Some(OrderStatus::PendingCompletion), Some(OrderStatus::InProgress), false ; "summary_newer")]
    fn test_read_only_derivation(
        status: ThreadStatus,
        embedded: Option<OrderStatus>,
        known: Option<OrderStatus>,
        expected: bool,
    ) {
        let mut summary = thread_summary("t1", "o1", ["u1", "u2"]);
        summary.status = status;
        summary.order_status = embedded;

        let thread = to_thread(&summary, &viewer(), known).unwrap();
        assert_eq!(thread.is_read_only(), expected);
    }

    #[test]
    fn test_message_mapping() {
        let mut wire = chat_message("m1", "t1", "42", "hello");
        wire.status = MessageStatus::Delivered;

        let message = to_message(&wire, &ThreadId::new("ignored"));
        assert_eq!(message.thread_id().as_str(), "t1");
        assert_eq!(message.sender_id().as_str(), "42");
        assert_eq!(message.body().preview(), "hello");
        assert_eq!(message.status(), MessageStatus::Delivered);
        assert!(!message.is_local());
    }

    #[test]
    fn test_file_message_without_name() {
        let mut wire = chat_message("m1", "t1", "u2", "");
        wire.thread_id = None;
        wire.kind = MessageKind::File;
        wire.url = Some("https://cdn/x".to_string());

        let message = to_message(&wire, &ThreadId::new("t9"));
        assert_eq!(message.thread_id().as_str(), "t9");
        assert_eq!(message.body().preview(), "[file] attachment");
    }

    #[test]
    fn test_notification_defaults() {
        let payload = NotificationPayload {
            id: "n1".to_string(),
            kind: None,
            title: None,
            body: Some("Your order started".to_string()),
            created_at: None,
            read: false,
        };

        let notification = to_notification(&payload, at(5));
        assert_eq!(notification.title, "Notification");
        assert_eq!(notification.created_at, at(5));
        assert!(!notification.read);
    }
}
