//! Test utilities (available with `test-utils` feature).
//!
//! In-memory stand-ins for the auth/database provider and the image API, with switches to
//! make individual operations fail, plus constructors for config and state.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::{
    AppState,
    config::{Config, ProviderConfig, SessionConfig, TunesConfig},
    provider::{AccountProvider, CreditsRow, ModelRecord, ProviderError, Result, Session},
    tunes::{TuneClient, TuneError},
    types::{TuneId, UserId},
};

pub fn create_test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        provider: ProviderConfig {
            url: Some("http://provider.invalid".parse().unwrap()),
            service_role_key: Some("test-service-role-key".to_string()),
        },
        tunes: TunesConfig {
            base_url: "http://tunes.invalid".parse().unwrap(),
            api_key: Some("test-astria-key".to_string()),
        },
        auth: crate::config::AuthConfig {
            session: SessionConfig {
                cookie_name: "sb-access-token".to_string(),
                secure: false,
            },
        },
        ..Default::default()
    }
}

/// State wired to the given provider and a tune client on which every delete succeeds
pub fn create_test_state(provider: Arc<InMemoryProvider>) -> AppState {
    create_test_state_with(provider, Arc::new(RecordingTuneClient::new()))
}

pub fn create_test_state_with(provider: Arc<InMemoryProvider>, tunes: Arc<RecordingTuneClient>) -> AppState {
    AppState::builder()
        .config(create_test_config())
        .provider(provider)
        .tunes(tunes)
        .build()
}

/// Provider operations, used to record calls and to inject failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderOp {
    GetSession,
    DeleteCredits,
    ListModels,
    FetchCredits,
    DeleteUser,
    SignOut,
}

#[derive(Debug, Clone)]
pub struct TestUser {
    pub user_id: UserId,
    pub email: String,
    pub access_token: String,
}

impl TestUser {
    pub fn cookie(&self) -> String {
        format!("sb-access-token={}", self.access_token)
    }
}

#[derive(Default)]
struct ProviderState {
    users: HashMap<UserId, String>,
    tokens: HashMap<String, UserId>,
    credits: Vec<CreditsRow>,
    models: HashMap<UserId, Vec<ModelRecord>>,
    failing: HashSet<ProviderOp>,
    calls: Vec<ProviderOp>,
    next_credits_id: i64,
}

/// In-memory [`AccountProvider`] that mirrors the semantics of the hosted provider
#[derive(Default)]
pub struct InMemoryProvider {
    state: Mutex<ProviderState>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, email: &str) -> TestUser {
        let user = TestUser {
            user_id: Uuid::new_v4(),
            email: email.to_string(),
            access_token: format!("token-{}", Uuid::new_v4().simple()),
        };
        let mut state = self.state.lock().unwrap();
        state.users.insert(user.user_id, user.email.clone());
        state.tokens.insert(user.access_token.clone(), user.user_id);
        user
    }

    pub fn add_credits(&self, user_id: UserId, credits: i64) {
        let mut state = self.state.lock().unwrap();
        state.next_credits_id += 1;
        let id = state.next_credits_id;
        state.credits.push(CreditsRow {
            id,
            user_id,
            credits,
            created_at: None,
        });
    }

    pub fn add_model(&self, user_id: UserId, tune_id: TuneId) {
        let mut state = self.state.lock().unwrap();
        state
            .models
            .entry(user_id)
            .or_default()
            .push(ModelRecord { model_id: Some(tune_id) });
    }

    /// Add a model row that has not been assigned a tune id yet
    pub fn add_pending_model(&self, user_id: UserId) {
        let mut state = self.state.lock().unwrap();
        state.models.entry(user_id).or_default().push(ModelRecord { model_id: None });
    }

    /// Make every later call of `op` fail with a provider API error
    pub fn fail(&self, op: ProviderOp) {
        self.state.lock().unwrap().failing.insert(op);
    }

    /// Make session lookups fail as if the provider were unreachable
    pub fn fail_sessions(&self) {
        self.fail(ProviderOp::GetSession);
    }

    pub fn user_exists(&self, user_id: UserId) -> bool {
        self.state.lock().unwrap().users.contains_key(&user_id)
    }

    pub fn credits_rows(&self, user_id: UserId) -> usize {
        self.state.lock().unwrap().credits.iter().filter(|row| row.user_id == user_id).count()
    }

    pub fn token_is_valid(&self, token: &str) -> bool {
        self.state.lock().unwrap().tokens.contains_key(token)
    }

    pub fn calls(&self) -> Vec<ProviderOp> {
        self.state.lock().unwrap().calls.clone()
    }

    fn enter(&self, op: ProviderOp) -> Result<std::sync::MutexGuard<'_, ProviderState>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(op);
        if state.failing.contains(&op) {
            return Err(ProviderError::Api {
                status: 500,
                message: format!("injected {op:?} failure"),
            });
        }
        Ok(state)
    }
}

#[async_trait]
impl AccountProvider for InMemoryProvider {
    async fn get_session(&self, access_token: &str) -> Result<Option<Session>> {
        let state = self.enter(ProviderOp::GetSession)?;
        Ok(state.tokens.get(access_token).map(|user_id| Session {
            user_id: *user_id,
            email: state.users.get(user_id).cloned(),
            access_token: access_token.to_string(),
        }))
    }

    async fn delete_credits(&self, user_id: UserId) -> Result<()> {
        let mut state = self.enter(ProviderOp::DeleteCredits)?;
        state.credits.retain(|row| row.user_id != user_id);
        Ok(())
    }

    async fn list_models(&self, user_id: UserId) -> Result<Vec<ModelRecord>> {
        let state = self.enter(ProviderOp::ListModels)?;
        Ok(state.models.get(&user_id).cloned().unwrap_or_default())
    }

    async fn fetch_credits(&self, user_id: UserId) -> Result<Option<CreditsRow>> {
        let state = self.enter(ProviderOp::FetchCredits)?;
        let rows: Vec<&CreditsRow> = state.credits.iter().filter(|row| row.user_id == user_id).collect();
        Ok(match rows.as_slice() {
            [row] => Some((*row).clone()),
            _ => None,
        })
    }

    async fn delete_user(&self, user_id: UserId) -> Result<()> {
        let mut state = self.enter(ProviderOp::DeleteUser)?;
        if state.users.remove(&user_id).is_none() {
            return Err(ProviderError::Api {
                status: 404,
                message: "User not found".to_string(),
            });
        }
        state.tokens.retain(|_, owner| *owner != user_id);
        Ok(())
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let mut state = self.enter(ProviderOp::SignOut)?;
        state.tokens.remove(access_token);
        Ok(())
    }
}

/// [`TuneClient`] that records every attempted delete and fails for chosen ids
#[derive(Default)]
pub struct RecordingTuneClient {
    failing: HashSet<TuneId>,
    attempted: Mutex<Vec<TuneId>>,
}

impl RecordingTuneClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(ids: impl IntoIterator<Item = TuneId>) -> Self {
        Self {
            failing: ids.into_iter().collect(),
            attempted: Mutex::new(Vec::new()),
        }
    }

    /// Attempted ids, sorted for stable comparison
    pub fn attempted(&self) -> Vec<TuneId> {
        let mut attempted = self.attempted.lock().unwrap().clone();
        attempted.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        attempted
    }
}

#[async_trait]
impl TuneClient for RecordingTuneClient {
    async fn delete_tune(&self, id: &TuneId) -> std::result::Result<(), TuneError> {
        self.attempted.lock().unwrap().push(id.clone());
        if self.failing.contains(id) {
            return Err(TuneError::Status {
                status: 500,
                body: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}
