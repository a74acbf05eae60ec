//! Marketchat - real-time chat for a local-services marketplace.
//!
//! Keeps a client-side view of order conversations in sync with the
//! marketplace backend: thread lists and paged history over REST, live
//! messages, read receipts and notifications over two Socket.IO namespaces.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing the messaging store, session and use cases.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing adapters for external services.
pub mod infrastructure;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "marketchat";
