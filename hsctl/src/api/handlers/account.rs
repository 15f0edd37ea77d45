//! Account deletion.
//!
//! Deletion touches three systems in a fixed order: the caller's credits row, the trained
//! models hosted by the image API, then the auth user itself. The steps are not atomic. A
//! failure while deleting credits or listing models aborts before the user is touched; failed
//! model deletions are logged and left behind so that the user can still leave.

use axum::extract::State;
use tracing::{info, warn};

use crate::{
    AppState,
    api::models::auth::SessionEndedRedirect,
    auth::current_user::CurrentSession,
    errors::Error,
    tunes,
    types::abbrev_uuid,
};

/// Delete the caller's account, then sign out and redirect to `/`
#[tracing::instrument(skip_all)]
pub async fn delete_account(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<SessionEndedRedirect, Error> {
    let user_id = session.user_id;
    info!(user_id = %abbrev_uuid(&user_id), "Deleting account");

    state
        .provider
        .delete_credits(user_id)
        .await
        .map_err(|e| Error::upstream("Failed to delete user credits", e))?;

    let models = state
        .provider
        .list_models(user_id)
        .await
        .map_err(|e| Error::upstream("Failed to fetch user models", e))?;

    let total = models.len();
    let tune_ids: Vec<_> = models.into_iter().filter_map(|model| model.model_id).collect();
    if tune_ids.len() < total {
        warn!(
            user_id = %abbrev_uuid(&user_id),
            skipped = total - tune_ids.len(),
            "Skipping model records without a tune id"
        );
    }

    let report = tunes::delete_tunes(state.tunes.as_ref(), tune_ids).await;
    if !report.is_clean() {
        info!(
            user_id = %abbrev_uuid(&user_id),
            failed = report.failed.len(),
            "Continuing with account deletion despite failed tune deletions"
        );
    }

    state
        .provider
        .delete_user(user_id)
        .await
        .map_err(|e| Error::upstream("Failed to delete account", e))?;

    if let Err(e) = state.provider.sign_out(&session.access_token).await {
        warn!(user_id = %abbrev_uuid(&user_id), "Provider sign-out after deletion failed: {e}");
    }

    info!(user_id = %abbrev_uuid(&user_id), "Account deleted");
    Ok(SessionEndedRedirect::home(&state.config.auth.session))
}

#[cfg(test)]
mod tests {
    use crate::{
        build_router,
        errors::ErrorBody,
        test_utils::{InMemoryProvider, ProviderOp, RecordingTuneClient, create_test_state, create_test_state_with},
        types::TuneId,
    };
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use std::sync::Arc;

    fn server_with(provider: Arc<InMemoryProvider>, tunes: Arc<RecordingTuneClient>) -> TestServer {
        TestServer::new(build_router(create_test_state_with(provider, tunes))).unwrap()
    }

    #[tokio::test]
    async fn test_no_session_is_unauthorized_and_deletes_nothing() {
        let provider = Arc::new(InMemoryProvider::new());
        let user = provider.add_user("jane@example.com");
        provider.add_credits(user.user_id, 10);
        let server = TestServer::new(build_router(create_test_state(provider.clone()))).unwrap();

        let response = server.post("/auth/delete-account").await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: ErrorBody = response.json();
        assert_eq!(body.error, "Unauthorized");
        assert!(provider.calls().is_empty());
        assert!(provider.user_exists(user.user_id));
        assert_eq!(provider.credits_rows(user.user_id), 1);
    }

    #[tokio::test]
    async fn test_rejected_token_is_unauthorized() {
        let provider = Arc::new(InMemoryProvider::new());
        let server = TestServer::new(build_router(create_test_state(provider.clone()))).unwrap();

        let response = server
            .post("/auth/delete-account")
            .add_header("cookie", "sb-access-token=expired")
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(provider.calls(), vec![ProviderOp::GetSession]);
    }

    #[tokio::test]
    async fn test_credits_failure_aborts_before_user_deletion() {
        let provider = Arc::new(InMemoryProvider::new());
        let user = provider.add_user("jane@example.com");
        provider.add_model(user.user_id, TuneId::from(1));
        provider.fail(ProviderOp::DeleteCredits);
        let tunes = Arc::new(RecordingTuneClient::new());
        let server = server_with(provider.clone(), tunes.clone());

        let response = server.post("/auth/delete-account").add_header("cookie", user.cookie()).await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorBody = response.json();
        assert_eq!(body.error, "Failed to delete user credits");
        assert!(body.details.is_some_and(|d| d.contains("injected")));
        assert!(provider.user_exists(user.user_id));
        assert!(!provider.calls().contains(&ProviderOp::ListModels));
        assert!(tunes.attempted().is_empty());
    }

    #[tokio::test]
    async fn test_model_listing_failure_aborts() {
        let provider = Arc::new(InMemoryProvider::new());
        let user = provider.add_user("jane@example.com");
        provider.fail(ProviderOp::ListModels);
        let server = TestServer::new(build_router(create_test_state(provider.clone()))).unwrap();

        let response = server.post("/auth/delete-account").add_header("cookie", user.cookie()).await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorBody = response.json();
        assert_eq!(body.error, "Failed to fetch user models");
        assert!(provider.user_exists(user.user_id));
        assert!(!provider.calls().contains(&ProviderOp::DeleteUser));
    }

    #[tokio::test]
    async fn test_user_deletion_failure_is_reported() {
        let provider = Arc::new(InMemoryProvider::new());
        let user = provider.add_user("jane@example.com");
        provider.fail(ProviderOp::DeleteUser);
        let server = TestServer::new(build_router(create_test_state(provider.clone()))).unwrap();

        let response = server.post("/auth/delete-account").add_header("cookie", user.cookie()).await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorBody = response.json();
        assert_eq!(body.error, "Failed to delete account");
        assert!(provider.user_exists(user.user_id));
        assert!(!provider.calls().contains(&ProviderOp::SignOut));
    }

    #[test_log::test(tokio::test)]
    async fn test_partial_tune_failures_do_not_block_deletion() {
        let provider = Arc::new(InMemoryProvider::new());
        let user = provider.add_user("jane@example.com");
        provider.add_credits(user.user_id, 3);
        for id in [101, 102, 103] {
            provider.add_model(user.user_id, TuneId::from(id));
        }
        let tunes = Arc::new(RecordingTuneClient::failing_for([TuneId::from(102)]));
        let server = server_with(provider.clone(), tunes.clone());

        let response = server.post("/auth/delete-account").add_header("cookie", user.cookie()).await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header("location"), "/");
        assert_eq!(
            tunes.attempted(),
            vec![TuneId::from(101), TuneId::from(102), TuneId::from(103)]
        );
        assert!(!provider.user_exists(user.user_id));
    }

    #[tokio::test]
    async fn test_successful_deletion_runs_every_step_in_order() {
        let provider = Arc::new(InMemoryProvider::new());
        let user = provider.add_user("jane@example.com");
        let other = provider.add_user("other@example.com");
        provider.add_credits(user.user_id, 25);
        provider.add_credits(other.user_id, 7);
        provider.add_model(user.user_id, TuneId::from(7));
        provider.add_model(user.user_id, TuneId::new("tune-abc"));
        let tunes = Arc::new(RecordingTuneClient::new());
        let server = server_with(provider.clone(), tunes.clone());

        let response = server
            .post("/auth/delete-account")
            .add_header("cookie", user.cookie())
            .form(&[("_method", "delete")])
            .await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header("location"), "/");
        let cookie = response.header("set-cookie");
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with("sb-access-token=;"));
        assert!(cookie.contains("Max-Age=0"));

        assert_eq!(
            provider.calls(),
            vec![
                ProviderOp::GetSession,
                ProviderOp::DeleteCredits,
                ProviderOp::ListModels,
                ProviderOp::DeleteUser,
                ProviderOp::SignOut,
            ]
        );
        assert_eq!(provider.credits_rows(user.user_id), 0);
        assert_eq!(provider.credits_rows(other.user_id), 1);
        assert_eq!(tunes.attempted(), vec![TuneId::from(7), TuneId::new("tune-abc")]);
        assert!(!provider.user_exists(user.user_id));
        assert!(provider.user_exists(other.user_id));
        assert!(!provider.token_is_valid(&user.access_token));
    }

    #[tokio::test]
    async fn test_model_without_tune_id_does_not_block_deletion() {
        let provider = Arc::new(InMemoryProvider::new());
        let user = provider.add_user("jane@example.com");
        provider.add_model(user.user_id, TuneId::from(101));
        provider.add_pending_model(user.user_id);
        let tunes = Arc::new(RecordingTuneClient::new());
        let server = server_with(provider.clone(), tunes.clone());

        let response = server.post("/auth/delete-account").add_header("cookie", user.cookie()).await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(tunes.attempted(), vec![TuneId::from(101)]);
        assert!(!provider.user_exists(user.user_id));
    }

    #[tokio::test]
    async fn test_sign_out_failure_still_redirects() {
        let provider = Arc::new(InMemoryProvider::new());
        let user = provider.add_user("jane@example.com");
        provider.fail(ProviderOp::SignOut);
        let server = TestServer::new(build_router(create_test_state(provider.clone()))).unwrap();

        let response = server.post("/auth/delete-account").add_header("cookie", user.cookie()).await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert!(!provider.user_exists(user.user_id));
    }

    #[tokio::test]
    async fn test_delete_method_is_routed() {
        let provider = Arc::new(InMemoryProvider::new());
        let user = provider.add_user("jane@example.com");
        let server = TestServer::new(build_router(create_test_state(provider.clone()))).unwrap();

        let response = server.delete("/auth/delete-account").add_header("cookie", user.cookie()).await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert!(!provider.user_exists(user.user_id));
    }
}
