//! Authentication module
//!
//! Supports: Basic (api_id / api_token) and Bearer (auth_token)
//!
//! The `Authenticator` applies the configured credentials to every request.

mod authenticator;
mod types;

pub use authenticator::Authenticator;
pub use types::AuthConfig;
