//! Client for the image-generation API that hosts trained models ("tunes").
//!
//! The only operation the service needs is deleting a tune. [`delete_tunes`] fans the
//! deletes out concurrently and waits for every one of them, so one failing tune never stops
//! the others from being cleaned up.

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::{
    config::TunesConfig,
    http::{client, ensure_slash},
    types::TuneId,
};

/// Errors from a single tune deletion
#[derive(Debug, thiserror::Error)]
pub enum TuneError {
    #[error("Request to delete tune failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Image API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid tune URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// A trait for deleting tunes on the image-generation API.
/// In practise this is [`AstriaClient`], talking HTTP via `reqwest`.
#[async_trait]
pub trait TuneClient: Send + Sync {
    async fn delete_tune(&self, id: &TuneId) -> Result<(), TuneError>;
}

/// Create the tune client from configuration
pub fn create_tune_client(config: &TunesConfig) -> anyhow::Result<Arc<dyn TuneClient>> {
    let api_key = config
        .api_key
        .clone()
        .ok_or_else(|| anyhow::anyhow!("image API key is not configured"))?;
    Ok(Arc::new(AstriaClient::new(config.base_url.clone(), api_key)?))
}

/// The concrete implementation of `TuneClient`.
pub struct AstriaClient {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl AstriaClient {
    pub fn new(base_url: Url, api_key: impl Into<String>) -> anyhow::Result<Self> {
        Ok(Self {
            client: client()?,
            base_url: ensure_slash(&base_url),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl TuneClient for AstriaClient {
    #[instrument(skip(self), fields(tune_id = %id))]
    async fn delete_tune(&self, id: &TuneId) -> Result<(), TuneError> {
        let url = self.base_url.join(&format!("tunes/{}", urlencoding::encode(id.as_str())))?;
        debug!("Deleting tune at {}", url);

        let response = self
            .client
            .delete(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TuneError::Status { status, body });
        }

        Ok(())
    }
}

/// Outcome of a best-effort bulk deletion
#[derive(Debug, Default)]
pub struct CleanupReport {
    pub deleted: Vec<TuneId>,
    pub failed: Vec<(TuneId, TuneError)>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Delete every tune concurrently and collect all outcomes.
///
/// Never short-circuits: each delete runs to completion regardless of the others. Failures are
/// logged here and returned in the report; callers decide whether they matter.
#[instrument(skip_all, fields(count = ids.len()))]
pub async fn delete_tunes(client: &dyn TuneClient, ids: Vec<TuneId>) -> CleanupReport {
    let outcomes = join_all(ids.into_iter().map(|id| async move {
        let result = client.delete_tune(&id).await;
        (id, result)
    }))
    .await;

    let mut report = CleanupReport::default();
    for (id, result) in outcomes {
        match result {
            Ok(()) => report.deleted.push(id),
            Err(e) => report.failed.push((id, e)),
        }
    }

    if !report.is_clean() {
        let failures: Vec<String> = report.failed.iter().map(|(id, e)| format!("{id}: {e}")).collect();
        warn!(
            failed = report.failed.len(),
            deleted = report.deleted.len(),
            "Errors occurred while deleting tunes: {}",
            failures.join("; ")
        );
    }

    report
}
