//! # hsctl: account control service for Headshots AI
//!
//! `hsctl` is the server side of account management for the Headshots AI web application. It
//! serves the navigation bar (login state, credit balance, account menu) and the endpoints that
//! end a session or delete an account.
//!
//! ## Overview
//!
//! The service owns no data. Users, sessions and the `credits` and `models` tables live in a
//! hosted auth + database provider (Supabase: GoTrue for auth, PostgREST for rows); trained
//! models live in an external image-generation API (Astria `tunes`). Every operation is a
//! call-through to one of those two services, so the interesting parts are ordering and
//! failure handling rather than storage.
//!
//! ### Request Flow
//!
//! A browser loads `/` (or the bare `/navbar` fragment). The [`auth::current_user`] extractors
//! read the provider access token from the session cookie and resolve it into a
//! [`provider::Session`]. The [`ui::Navbar`] then fetches the user's credits row and renders.
//!
//! Choosing "Delete Account" re-renders the bar with a confirmation modal
//! (`?modal=delete-account`). Confirming posts to `/auth/delete-account`, which:
//!
//! 1. rejects callers without a valid session (401)
//! 2. deletes the user's credits rows
//! 3. lists the user's trained models
//! 4. deletes every model from the image API concurrently, logging failures
//! 5. deletes the auth user
//! 6. signs the session out and expires the cookie
//! 7. redirects to `/`
//!
//! Steps 2, 3 and 5 abort the request with a JSON error naming the failed step. Nothing is
//! rolled back: a failure after step 2 leaves a user without credits.
//!
//! ### Core Components
//!
//! - [`api`]: route handlers and response types
//! - [`auth`]: session cookie parsing and the session extractors
//! - [`provider`]: the [`provider::AccountProvider`] trait and its Supabase implementation
//! - [`tunes`]: the [`tunes::TuneClient`] trait, its Astria implementation and bulk deletion
//! - [`ui`]: minijinja templates and the navigation bar view
//! - [`config`]: YAML + environment configuration, validated at startup
//! - [`telemetry`]: tracing subscriber and optional OTLP export
//!
//! ## Configuration
//!
//! See [`config`] for the full list. The three required values are normally supplied through
//! the environment:
//!
//! ```bash
//! export SUPABASE_URL="https://xyzcompany.supabase.co"
//! export SUPABASE_SERVICE_ROLE_KEY="..."
//! export ASTRIA_API_KEY="..."
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
mod http;
pub mod provider;
pub mod telemetry;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod tunes;
pub mod types;
pub mod ui;

use axum::{
    Router,
    routing::{get, post},
};
use bon::Builder;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, debug, info};

pub use config::Config;
pub use http::install_crypto_provider;
pub use types::UserId;

use crate::{api::handlers, provider::AccountProvider, tunes::TuneClient};

/// Application state shared across all request handlers.
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .provider(provider)
///     .tunes(tunes)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub provider: Arc<dyn AccountProvider>,
    pub tunes: Arc<dyn TuneClient>,
}

/// Build the application router with every route and the tracing layer
pub fn build_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/", get(handlers::pages::home))
        .route("/navbar", get(handlers::pages::navbar))
        .route(
            "/auth/delete-account",
            post(handlers::account::delete_account).delete(handlers::account::delete_account),
        )
        .route("/auth/sign-out", post(handlers::auth::sign_out))
        .route("/healthz", get(handlers::healthz))
        .with_state(state);

    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    )
}

/// Main application struct.
///
/// 1. **Create**: [`Application::new`] builds the provider and image API clients from the
///    validated config
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and handles requests until the
///    shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        // Keys are skipped when serializing, so this is safe to log
        debug!(
            "Starting with configuration: {}",
            serde_json::to_string(&config).unwrap_or_default()
        );

        let provider = provider::create_provider(&config.provider)?;
        let tunes = tunes::create_tune_client(&config.tunes)?;

        let state = AppState::builder()
            .config(config.clone())
            .provider(provider)
            .tunes(tunes)
            .build();

        Ok(Self::from_state(state))
    }

    /// Build around an existing state, e.g. one holding in-memory clients
    pub fn from_state(state: AppState) -> Self {
        let config = state.config.clone();
        Self {
            router: build_router(state),
            config,
        }
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "{} account service listening on http://{}, available at http://localhost:{}",
            self.config.site_name, bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Server stopped, flushing telemetry");
        telemetry::shutdown_telemetry();
        Ok(())
    }
}
