//! Supabase implementation of [`AccountProvider`].
//!
//! Sessions and user deletion go through the auth API (`/auth/v1`), row access goes through
//! the REST API (`/rest/v1`) with PostgREST filter syntax (`user_id=eq.<id>`).

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{debug, instrument};
use url::Url;

use crate::{
    http::{client, ensure_slash},
    provider::{AccountProvider, CreditsRow, ModelRecord, ProviderError, Result, Session},
    types::{UserId, abbrev_uuid},
};

pub struct SupabaseProvider {
    client: Client,
    base_url: Url,
    service_role_key: String,
}

#[derive(Debug, serde::Deserialize)]
struct AuthUser {
    id: UserId,
    email: Option<String>,
}

impl SupabaseProvider {
    pub fn new(base_url: Url, service_role_key: impl Into<String>) -> anyhow::Result<Self> {
        Ok(Self {
            client: client()?,
            base_url: ensure_slash(&base_url),
            service_role_key: service_role_key.into(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ProviderError::InvalidResponse(format!("build provider URL for {path}: {e}")))
    }

    /// REST endpoint for a table, filtered to one user's rows
    fn table_for_user(&self, table: &str, select: Option<&str>, user_id: UserId) -> Result<Url> {
        let mut url = self.endpoint(&format!("rest/v1/{table}"))?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(select) = select {
                query.append_pair("select", select);
            }
            query.append_pair("user_id", &format!("eq.{user_id}"));
        }
        Ok(url)
    }

    /// Attach service role credentials
    fn as_service(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.service_role_key)
            .bearer_auth(&self.service_role_key)
    }

    /// Attach a user's access token. The project key still has to be present as `apikey`.
    fn as_user(&self, request: RequestBuilder, access_token: &str) -> RequestBuilder {
        request.header("apikey", &self.service_role_key).bearer_auth(access_token)
    }
}

/// Turn a non-2xx response into a [`ProviderError::Api`], keeping the provider's message
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Api {
        status: status.as_u16(),
        message: error_message(status, &body),
    })
}

/// Extract a readable message from an error body.
///
/// The REST API answers `{"message": ...}`, the auth API uses `msg`, `error_description` or
/// `error` depending on the endpoint and version.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(serde_json::Value::Object(fields)) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "msg", "error_description", "error"] {
            if let Some(serde_json::Value::String(message)) = fields.get(key) {
                return message.clone();
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        status.canonical_reason().unwrap_or("unknown error").to_string()
    } else {
        trimmed.to_string()
    }
}

#[async_trait]
impl AccountProvider for SupabaseProvider {
    #[instrument(skip_all)]
    async fn get_session(&self, access_token: &str) -> Result<Option<Session>> {
        let url = self.endpoint("auth/v1/user")?;
        let response = self.as_user(self.client.get(url), access_token).send().await?;

        if matches!(response.status(), StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            debug!("Provider rejected access token with {}", response.status());
            return Ok(None);
        }

        let user: AuthUser = check(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("decode auth user: {e}")))?;

        Ok(Some(Session {
            user_id: user.id,
            email: user.email,
            access_token: access_token.to_string(),
        }))
    }

    #[instrument(skip_all, fields(user_id = %abbrev_uuid(&user_id)))]
    async fn delete_credits(&self, user_id: UserId) -> Result<()> {
        let url = self.table_for_user("credits", None, user_id)?;
        let response = self
            .as_service(self.client.delete(url))
            .header("Prefer", "return=minimal")
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    #[instrument(skip_all, fields(user_id = %abbrev_uuid(&user_id)))]
    async fn list_models(&self, user_id: UserId) -> Result<Vec<ModelRecord>> {
        let url = self.table_for_user("models", Some("modelId"), user_id)?;
        let response = self.as_service(self.client.get(url)).send().await?;
        let models: Vec<ModelRecord> = check(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("decode model records: {e}")))?;

        debug!("Found {} model records", models.len());
        Ok(models)
    }

    #[instrument(skip_all, fields(user_id = %abbrev_uuid(&user_id)))]
    async fn fetch_credits(&self, user_id: UserId) -> Result<Option<CreditsRow>> {
        let url = self.table_for_user("credits", Some("*"), user_id)?;
        let response = self.as_service(self.client.get(url)).send().await?;
        let mut rows: Vec<CreditsRow> = check(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("decode credits rows: {e}")))?;

        if rows.len() == 1 {
            Ok(rows.pop())
        } else {
            debug!("Expected a single credits row, found {}", rows.len());
            Ok(None)
        }
    }

    #[instrument(skip_all, fields(user_id = %abbrev_uuid(&user_id)))]
    async fn delete_user(&self, user_id: UserId) -> Result<()> {
        let url = self.endpoint(&format!("auth/v1/admin/users/{user_id}"))?;
        let response = self.as_service(self.client.delete(url)).send().await?;
        check(response).await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let url = self.endpoint("auth/v1/logout")?;
        let response = self.as_user(self.client.post(url), access_token).send().await?;
        check(response).await?;
        Ok(())
    }
}
