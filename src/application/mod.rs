//! Application layer with the messaging store, session wiring and use cases.

/// Data transfer objects.
pub mod dto;
/// Messaging store, notification inbox and session services.
pub mod services;
/// Use case implementations.
pub mod use_cases;

pub use dto::{LoginRequest, LoginResponse, TokenSource};
pub use services::{MessagingSession, MessagingStore, NotificationInbox, StoreSettings};
pub use use_cases::{ApproveProviderUseCase, LoginUseCase, ResolveTokenUseCase};
