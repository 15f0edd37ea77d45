//! HTTP layer.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Response types shared by the handlers
//!
//! # Routes
//!
//! - `GET /`: home page hosting the navigation bar
//! - `GET /navbar`: the navigation bar on its own, `?modal=delete-account` opens the confirmation
//! - `POST /auth/delete-account` (also `DELETE`): delete the caller's account and redirect to `/`
//! - `POST /auth/sign-out`: end the session and redirect to `/`
//! - `GET /healthz`: liveness

pub mod handlers;
pub mod models;
