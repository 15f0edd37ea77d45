use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::{auth::session, config::SessionConfig};

/// `303 See Other` that also expires the session cookie.
///
/// Returned after sign-out and after account deletion so that the browser follows up with a
/// plain `GET` and no longer presents the old token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEndedRedirect {
    pub location: String,
    pub cookie: String,
}

impl SessionEndedRedirect {
    pub fn home(config: &SessionConfig) -> Self {
        Self {
            location: "/".to_string(),
            cookie: session::expired_session_cookie(config),
        }
    }
}

impl IntoResponse for SessionEndedRedirect {
    fn into_response(self) -> Response {
        (
            StatusCode::SEE_OTHER,
            [(header::LOCATION, self.location), (header::SET_COOKIE, self.cookie)],
        )
            .into_response()
    }
}
