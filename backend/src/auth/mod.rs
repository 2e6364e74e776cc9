//! Google sign-in: code exchange, identity-token verification and the
//! bearer-token extractor used by protected routes.
//!
//! This module provides:
//! - `TokenExchanger` and its reqwest implementation for Google's token endpoint
//! - `IdTokenVerifier` backed by Google's cached JWKS
//! - The exchange flow and its HTTP handler
//! - `AuthUser` extractor and refresh-token cookie builder

mod exchange;
mod google;
mod handlers;
mod middleware;
pub mod types;
mod verify;

pub use google::{GoogleTokenClient, TokenExchanger};
pub use handlers::google_exchange;
pub use types::{AuthUser, TokenSet};
pub use verify::{GoogleIdTokenVerifier, IdTokenVerifier};
