//! In-app notification list fed by the `/notifications` namespace.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::debug;

use super::thread_adapter;
use crate::domain::entities::{InboxNotification, NotificationId};
use crate::domain::ports::AlertPort;
use crate::domain::wire::{NotificationPayload, NotificationRef};

/// Newest-first notification list with an unread counter.
#[derive(Clone)]
pub struct NotificationInbox {
    items: Arc<RwLock<Vec<InboxNotification>>>,
    alerts: Arc<dyn AlertPort>,
}

impl NotificationInbox {
    #[must_use]
    pub fn new(alerts: Arc<dyn AlertPort>) -> Self {
        Self {
            items: Arc::new(RwLock::new(Vec::new())),
            alerts,
        }
    }

    /// Adds a pushed notification. Returns false for an id already present.
    pub fn receive(&self, payload: &NotificationPayload) -> bool {
        let notification = thread_adapter::to_notification(payload, Utc::now());
        {
            let mut items = self.items.write();
            if items.iter().any(|n| n.id == notification.id) {
                debug!(notification_id = %notification.id, "Duplicate notification");
                return false;
            }
            items.insert(0, notification.clone());
        }

        if !notification.read {
            self.alerts.show(&notification.title, &notification.body);
        }
        true
    }

    pub fn mark_read(&self, reference: &NotificationRef) -> bool {
        let id = NotificationId::new(reference.id.as_str());
        let mut items = self.items.write();
        match items.iter_mut().find(|n| n.id == id) {
            Some(notification) if !notification.read => {
                notification.read = true;
                true
            }
            _ => false,
        }
    }

    pub fn mark_all_read(&self) -> usize {
        let mut items = self.items.write();
        let mut changed = 0;
        for notification in items.iter_mut().filter(|n| !n.read) {
            notification.read = true;
            changed += 1;
        }
        changed
    }

    pub fn remove(&self, reference: &NotificationRef) -> bool {
        let id = NotificationId::new(reference.id.as_str());
        let mut items = self.items.write();
        let before = items.len();
        items.retain(|n| n.id != id);
        items.len() != before
    }

    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.items.read().iter().filter(|n| !n.read).count()
    }

    #[must_use]
    pub fn items(&self) -> Vec<InboxNotification> {
        self.items.read().clone()
    }

    pub fn clear(&self) {
        self.items.write().clear();
    }
}
