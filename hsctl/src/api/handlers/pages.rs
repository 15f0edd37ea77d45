//! Server-rendered pages: the home page and the navigation bar fragment.

use axum::{
    extract::{Query, State},
    response::Html,
};
use minijinja::Value;
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    auth::current_user::MaybeSession,
    errors::Error,
    ui::{self, Navbar, navbar::DELETE_ACCOUNT_MODAL},
};

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    /// Name of the modal to show, currently only `delete-account`
    pub modal: Option<String>,
}

impl PageQuery {
    fn wants_delete_modal(&self) -> bool {
        self.modal.as_deref() == Some(DELETE_ACCOUNT_MODAL)
    }
}

async fn load_navbar(state: &AppState, session: MaybeSession, query: &PageQuery, path: &str) -> Navbar {
    let mut navbar = Navbar::load(state.provider.as_ref(), session.0.as_ref(), &state.config)
        .await
        .at_path(path);
    if query.wants_delete_modal() {
        navbar.open_delete_modal();
    }
    navbar
}

/// Navigation bar fragment
#[tracing::instrument(skip_all)]
pub async fn navbar(
    State(state): State<AppState>,
    session: MaybeSession,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, Error> {
    let navbar = load_navbar(&state, session, &query, "/navbar").await;
    Ok(Html(navbar.render()?))
}

#[derive(Serialize)]
struct HomeContext<'a> {
    site_name: &'a str,
    signed_in: bool,
    navbar: Value,
}

/// Home page, also the landing target after sign-out and account deletion
#[tracing::instrument(skip_all)]
pub async fn home(
    State(state): State<AppState>,
    session: MaybeSession,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, Error> {
    let navbar = load_navbar(&state, session, &query, "/").await;
    let ctx = HomeContext {
        site_name: &state.config.site_name,
        signed_in: navbar.user().is_some(),
        navbar: Value::from_safe_string(navbar.render()?),
    };
    Ok(Html(ui::render("page.html", ctx)?))
}

#[cfg(test)]
mod tests {
    use crate::{
        build_router,
        test_utils::{InMemoryProvider, ProviderOp, create_test_state},
    };
    use axum_test::TestServer;
    use std::sync::Arc;

    fn server(provider: Arc<InMemoryProvider>) -> TestServer {
        TestServer::new(build_router(create_test_state(provider))).unwrap()
    }

    #[tokio::test]
    async fn test_anonymous_navbar() {
        let server = server(Arc::new(InMemoryProvider::new()));

        let response = server.get("/navbar").await;

        response.assert_status_ok();
        let html = response.text();
        assert!(html.contains("Login / Signup"));
        assert!(!html.contains("Credits:"));
    }

    #[tokio::test]
    async fn test_signed_in_navbar_shows_credits_and_menu() {
        let provider = Arc::new(InMemoryProvider::new());
        let user = provider.add_user("jane@example.com");
        provider.add_credits(user.user_id, 42);
        let server = server(provider);

        let response = server.get("/navbar").add_header("cookie", user.cookie()).await;

        response.assert_status_ok();
        let html = response.text();
        assert!(html.contains("Credits: 42"));
        assert!(html.contains("jane@example.com"));
        assert!(!html.contains("Get Credits"));
        assert!(!html.contains("<dialog"));
    }

    #[tokio::test]
    async fn test_modal_query_opens_confirmation() {
        let provider = Arc::new(InMemoryProvider::new());
        let user = provider.add_user("jane@example.com");
        let server = server(provider);

        let response = server
            .get("/navbar")
            .add_query_param("modal", "delete-account")
            .add_header("cookie", user.cookie())
            .await;

        let html = response.text();
        assert!(html.contains("<dialog"));
        assert!(html.contains(r#"href="/navbar">Cancel"#));
    }

    #[tokio::test]
    async fn test_unknown_modal_is_ignored() {
        let provider = Arc::new(InMemoryProvider::new());
        let user = provider.add_user("jane@example.com");
        let server = server(provider);

        let response = server
            .get("/navbar")
            .add_query_param("modal", "something-else")
            .add_header("cookie", user.cookie())
            .await;

        assert!(!response.text().contains("<dialog"));
    }

    #[tokio::test]
    async fn test_session_outage_renders_anonymous() {
        let provider = Arc::new(InMemoryProvider::new());
        let user = provider.add_user("jane@example.com");
        provider.fail(ProviderOp::GetSession);
        let server = server(provider);

        let response = server.get("/navbar").add_header("cookie", user.cookie()).await;

        response.assert_status_ok();
        assert!(response.text().contains("Login / Signup"));
    }

    #[tokio::test]
    async fn test_home_embeds_navbar_unescaped() {
        let provider = Arc::new(InMemoryProvider::new());
        let user = provider.add_user("jane@example.com");
        let server = server(provider);

        let response = server.get("/").add_header("cookie", user.cookie()).await;

        response.assert_status_ok();
        let html = response.text();
        assert!(html.contains(r#"<nav class="navbar">"#));
        assert!(html.contains("Go to your headshots"));
    }

    #[tokio::test]
    async fn test_healthz() {
        let server = server(Arc::new(InMemoryProvider::new()));
        let response = server.get("/healthz").await;
        response.assert_status_ok();
        response.assert_text("OK");
    }
}
