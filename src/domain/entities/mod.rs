//! Domain entity definitions.

mod id;
mod message;
mod notification;
mod order;
mod request;
mod thread;
mod token;
mod user;

pub use message::{Message, MessageBody, MessageId, MessageKind, MessageStatus};
pub use notification::{InboxNotification, NotificationId};
pub use order::{Order, OrderId, OrderStatus};
pub use request::{ApplicationId, RequestId, RequestStatus};
pub use thread::{Thread, ThreadId, ThreadStatus};
pub use token::{AuthToken, SharedCredentials};
pub use user::{SYSTEM_SENDER, UserId};
