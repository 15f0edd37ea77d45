use crate::{
    AppState,
    auth::session,
    errors::{Error, Result},
    provider::Session,
};
use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::{debug, instrument, warn};

/// Resolve the caller's session from the session cookie.
/// Returns:
/// - Ok(None): no session cookie, or the provider rejected the token
/// - Ok(Some(session)): valid session
/// - Err(error): the provider could not be reached or answered unexpectedly
#[instrument(skip_all)]
async fn resolve_session(parts: &Parts, state: &AppState) -> Result<Option<Session>> {
    let Some(token) = session::access_token_from_headers(&parts.headers, &state.config.auth.session.cookie_name) else {
        debug!("No session cookie present");
        return Ok(None);
    };

    state
        .provider
        .get_session(&token)
        .await
        .map_err(|e| Error::upstream("Failed to resolve session", e))
}

/// Extractor for routes that require an authenticated caller. Rejects with 401 when there is
/// no valid session.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Session);

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        match resolve_session(parts, state).await? {
            Some(session) => Ok(CurrentSession(session)),
            None => Err(Error::Unauthenticated { message: None }),
        }
    }
}

/// Extractor for pages that render for both anonymous and signed-in callers.
///
/// Provider failures degrade to anonymous rather than failing the page.
#[derive(Debug, Clone)]
pub struct MaybeSession(pub Option<Session>);

impl FromRequestParts<AppState> for MaybeSession {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        match resolve_session(parts, state).await {
            Ok(session) => Ok(MaybeSession(session)),
            Err(e) => {
                warn!("Treating caller as anonymous, session lookup failed: {e}");
                Ok(MaybeSession(None))
            }
        }
    }
}
