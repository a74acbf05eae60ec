//! Application services.

mod messaging_session;
mod messaging_store;
mod notification_inbox;
pub mod thread_adapter;

pub use messaging_session::MessagingSession;
pub use messaging_store::{IncomingOutcome, LoadState, MessagingStore, StoreSettings};
pub use notification_inbox::NotificationInbox;
