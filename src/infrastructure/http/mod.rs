//! REST transport.

mod client;

pub use client::{MarketplaceClient, decode_body, decode_error, endpoint};
