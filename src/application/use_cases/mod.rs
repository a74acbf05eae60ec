//! Use case implementations.

mod approve_provider_use_case;
mod login_use_case;
mod resolve_token_use_case;

pub use approve_provider_use_case::{ApproveProviderUseCase, ApprovedOrder};
pub use login_use_case::LoginUseCase;
pub use resolve_token_use_case::{ResolveTokenUseCase, ResolvedToken};
