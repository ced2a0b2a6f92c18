use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::env;
use tracing::info;

use crate::models::OmdbSummary;

const OMDB_BASE: &str = "https://www.omdbapi.com/";

#[async_trait]
pub trait OmdbApi: Send + Sync {
    /// Short-plot summary for an IMDb id. `None` when the key is missing,
    /// the title is unknown, or OMDb answers with an error status.
    async fn summary_by_imdb_id(&self, imdb_id: &str) -> Result<Option<OmdbSummary>>;
}

#[derive(Debug, Clone)]
pub struct OmdbClient {
    client: Client,
    api_key: Option<String>,
}

impl OmdbClient {
    pub fn from_env() -> Self {
        let api_key = env::var("OMDB_API_KEY").ok().filter(|k| !k.is_empty());
        if api_key.is_none() {
            info!("OMDb client running without an API key; summaries disabled");
        }
        Self {
            client: Client::new(),
            api_key,
        }
    }
}

#[async_trait]
impl OmdbApi for OmdbClient {
    async fn summary_by_imdb_id(&self, imdb_id: &str) -> Result<Option<OmdbSummary>> {
        let Some(key) = &self.api_key else {
            return Ok(None);
        };

        // OMDb signals "not found" in the body, not the status line.
        #[derive(Deserialize)]
        struct Envelope {
            #[serde(rename = "Response", default)]
            response: Option<String>,
            #[serde(flatten)]
            summary: OmdbSummary,
        }

        let url = format!(
            "{OMDB_BASE}?apikey={}&i={}&plot=short",
            urlencoding::encode(key),
            urlencoding::encode(imdb_id)
        );
        let res = self
            .client
            .get(&url)
            .send()
            .await
            .context("OMDb request failed")?;
        if !res.status().is_success() {
            return Ok(None);
        }
        let envelope: Envelope = res.json().await.context("OMDb JSON parse failed")?;
        if envelope.response.as_deref() == Some("False") {
            return Ok(None);
        }
        Ok(Some(envelope.summary))
    }
}
