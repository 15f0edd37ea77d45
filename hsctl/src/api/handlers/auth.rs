use axum::{extract::State, http::HeaderMap};
use tracing::{debug, warn};

use crate::{AppState, api::models::auth::SessionEndedRedirect, auth::session};

/// End the caller's session.
///
/// The provider-side sign-out is best-effort: the cookie is expired and the caller redirected
/// to `/` even when there is no cookie or the provider call fails.
#[tracing::instrument(skip_all)]
pub async fn sign_out(State(state): State<AppState>, headers: HeaderMap) -> SessionEndedRedirect {
    let session_config = &state.config.auth.session;

    match session::access_token_from_headers(&headers, &session_config.cookie_name) {
        Some(token) => {
            if let Err(e) = state.provider.sign_out(&token).await {
                warn!("Provider sign-out failed, clearing cookie anyway: {e}");
            }
        }
        None => debug!("Sign-out without a session cookie"),
    }

    SessionEndedRedirect::home(session_config)
}
