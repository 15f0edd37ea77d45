//! Auth + database provider abstraction layer
//!
//! This module defines the `AccountProvider` trait which covers everything the service needs
//! from the hosted auth/database provider: resolving a session, deleting and reading the rows
//! that belong to a user, deleting the user itself, and ending a session.
//!
//! [`supabase::SupabaseProvider`] is the production implementation, speaking to the
//! provider's auth API and REST row API over HTTP with the service role key.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    config::ProviderConfig,
    types::{TuneId, UserId},
};

pub mod supabase;

/// Create the account provider from configuration
pub fn create_provider(config: &ProviderConfig) -> anyhow::Result<Arc<dyn AccountProvider>> {
    let url = config
        .url
        .clone()
        .ok_or_else(|| anyhow::anyhow!("provider URL is not configured"))?;
    let service_role_key = config
        .service_role_key
        .clone()
        .ok_or_else(|| anyhow::anyhow!("provider service role key is not configured"))?;

    Ok(Arc::new(supabase::SupabaseProvider::new(url, service_role_key)?))
}

/// Result type for provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors that can occur when calling the provider
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Provider API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Provider-supplied explanation, suitable for the `details` field of an error response
    pub fn details(&self) -> String {
        match self {
            ProviderError::Api { message, .. } => message.clone(),
            ProviderError::Transport(e) => e.to_string(),
            ProviderError::InvalidResponse(msg) => msg.clone(),
        }
    }
}

/// An authenticated caller, as resolved by the provider from an access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub email: Option<String>,
    pub access_token: String,
}

/// A row of the `models` table, projected to the remote tune id.
///
/// `modelId` is null while a training request is still waiting for the image API to assign an
/// id; such rows have nothing to delete remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRecord {
    #[serde(rename = "modelId", default)]
    pub model_id: Option<TuneId>,
}

/// A row of the `credits` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditsRow {
    pub id: i64,
    pub user_id: UserId,
    pub credits: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Abstract auth + database provider interface
///
/// Every operation except [`get_session`](AccountProvider::get_session) and
/// [`sign_out`](AccountProvider::sign_out) runs with service credentials, bypassing per-user
/// authorization.
#[async_trait]
pub trait AccountProvider: Send + Sync {
    /// Resolve an access token to a session.
    ///
    /// Returns `Ok(None)` when the provider rejects the token (expired, revoked, or the user is
    /// gone); `Err` only when the provider could not be asked.
    async fn get_session(&self, access_token: &str) -> Result<Option<Session>>;

    /// Delete every credits row belonging to the user
    async fn delete_credits(&self, user_id: UserId) -> Result<()>;

    /// List the user's model records (tune id only)
    async fn list_models(&self, user_id: UserId) -> Result<Vec<ModelRecord>>;

    /// Fetch the user's credits row.
    ///
    /// Exactly one row is expected; zero or several rows yield `Ok(None)`.
    async fn fetch_credits(&self, user_id: UserId) -> Result<Option<CreditsRow>>;

    /// Delete the user from the auth provider
    async fn delete_user(&self, user_id: UserId) -> Result<()>;

    /// Revoke the session behind the access token
    async fn sign_out(&self, access_token: &str) -> Result<()>;
}
