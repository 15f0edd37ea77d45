//! Response types for the HTTP handlers.
//!
//! - [`auth`]: redirects that end the caller's session

pub mod auth;
