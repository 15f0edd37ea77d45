//! Session handling.
//!
//! Users sign in through the provider's hosted login page, never through this service. The
//! resulting access token is stored by the frontend in a session cookie; this module reads that
//! cookie, asks the provider who it belongs to, and expires it on sign-out.
//!
//! - [`session`]: cookie parsing and the expired `Set-Cookie` value
//! - [`current_user`]: extractors resolving the caller's [`crate::provider::Session`]
//!
//! # Usage in Handlers
//!
//! ```ignore
//! use hsctl::auth::current_user::CurrentSession;
//!
//! async fn protected(CurrentSession(session): CurrentSession) -> String {
//!     format!("Hello, {}", session.user_id)
//! }
//! ```

pub mod current_user;
pub mod session;
