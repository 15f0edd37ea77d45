//! HTTP request handlers.
//!
//! - [`account`]: account deletion
//! - [`auth`]: sign-out
//! - [`pages`]: home page and navigation bar
//!
//! Handlers that need a signed-in caller take [`crate::auth::current_user::CurrentSession`];
//! pages that render for everyone take [`crate::auth::current_user::MaybeSession`]. Errors are
//! returned as [`crate::errors::Error`], which renders as a JSON body with the matching status.

pub mod account;
pub mod auth;
pub mod pages;

/// Liveness probe
pub async fn healthz() -> &'static str {
    "OK"
}
