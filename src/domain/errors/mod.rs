//! Domain error types.

mod auth_error;
mod messaging_error;
mod transport_error;

pub use auth_error::AuthError;
pub use messaging_error::MessagingError;
pub use transport_error::TransportError;
