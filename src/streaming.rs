use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_HOST: &str = "streaming-availability.p.rapidapi.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// One streaming/purchase option for a title in a region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingOffer {
    #[serde(default)]
    pub service: Option<String>,
    #[serde(rename = "streamingType", default)]
    pub streaming_type: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(rename = "videoLink", default, skip_serializing_if = "Option::is_none")]
    pub video_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
}

/// The upstream returns offers keyed by country, or a flat array when a
/// country parameter was supplied. Both shapes are accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamingInfo {
    ByCountry(HashMap<String, Vec<StreamingOffer>>),
    Flat(Vec<StreamingOffer>),
}

impl StreamingInfo {
    pub fn offers_for_region(&self, region: &str) -> Vec<StreamingOffer> {
        match self {
            StreamingInfo::Flat(offers) => offers.clone(),
            StreamingInfo::ByCountry(map) => map
                .get(region)
                .or_else(|| map.get(&region.to_lowercase()))
                .cloned()
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaShow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "imdbId", default, skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
    #[serde(rename = "tmdbId", default, skip_serializing_if = "Option::is_none")]
    pub tmdb_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(rename = "posterPath", default, skip_serializing_if = "Option::is_none")]
    pub poster_path: Option<String>,
    #[serde(rename = "streamingInfo", default, skip_serializing_if = "Option::is_none")]
    pub streaming_info: Option<StreamingInfo>,
}

/// Unmodified upstream response plus timing, for the debug proxy.
#[derive(Debug, Clone, Serialize)]
pub struct RawProbe {
    pub ok: bool,
    pub status: u16,
    pub duration_ms: i64,
    pub url: String,
    pub info_type: &'static str,
    pub body: Value,
}

#[async_trait]
pub trait StreamingApi: Send + Sync {
    /// Availability lookup by IMDb id. Best effort: configuration gaps and
    /// upstream failures surface as `None`, never as request errors.
    async fn show_by_imdb_id(&self, imdb_id: &str, country: &str) -> Result<Option<SaShow>>;

    /// Uncached passthrough used by the debug endpoints.
    async fn raw_show(
        &self,
        imdb_id: &str,
        country: Option<&str>,
        series_granularity: &str,
        output_language: &str,
    ) -> Result<RawProbe>;

    fn is_configured(&self) -> bool;
}

#[derive(Debug, Clone)]
pub struct StreamingClient {
    client: Client,
    api_key: Option<String>,
    host: String,
}

impl StreamingClient {
    pub fn from_env() -> Self {
        let api_key = env::var("RAPIDAPI_STREAMINGAVAIL_KEY")
            .ok()
            .filter(|k| !k.is_empty());
        let host =
            env::var("RAPIDAPI_STREAMINGAVAIL_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        if api_key.is_none() {
            info!("Streaming Availability client running without an API key");
        }
        Self {
            client: Client::new(),
            api_key,
            host,
        }
    }

    fn show_url(
        &self,
        imdb_id: &str,
        country: Option<&str>,
        series_granularity: &str,
        output_language: &str,
    ) -> String {
        let mut url = format!(
            "https://{}/shows/{}?series_granularity={}&output_language={}",
            self.host,
            urlencoding::encode(imdb_id),
            urlencoding::encode(series_granularity),
            urlencoding::encode(output_language)
        );
        if let Some(country) = country {
            url.push_str("&country=");
            url.push_str(&urlencoding::encode(country));
        }
        url
    }
}

#[async_trait]
impl StreamingApi for StreamingClient {
    async fn show_by_imdb_id(&self, imdb_id: &str, country: &str) -> Result<Option<SaShow>> {
        let Some(key) = &self.api_key else {
            return Ok(None);
        };
        let url = self.show_url(imdb_id, Some(&country.to_uppercase()), "show", "en");
        let res = self
            .client
            .get(&url)
            .header("X-RapidAPI-Key", key)
            .header("X-RapidAPI-Host", &self.host)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await;
        let res = match res {
            Ok(res) => res,
            Err(e) => {
                debug!("Streaming Availability request failed: {}", e);
                return Ok(None);
            }
        };
        if !res.status().is_success() {
            debug!("Streaming Availability answered {}", res.status());
            return Ok(None);
        }
        match res.json::<SaShow>().await {
            Ok(show) => Ok(Some(show)),
            Err(e) => {
                debug!("Streaming Availability JSON parse failed: {}", e);
                Ok(None)
            }
        }
    }

    async fn raw_show(
        &self,
        imdb_id: &str,
        country: Option<&str>,
        series_granularity: &str,
        output_language: &str,
    ) -> Result<RawProbe> {
        let key = self
            .api_key
            .as_ref()
            .context("RAPIDAPI_STREAMINGAVAIL_KEY not set")?;
        let url = self.show_url(imdb_id, country, series_granularity, output_language);

        let started = Utc::now();
        let res = self
            .client
            .get(&url)
            .header("X-RapidAPI-Key", key)
            .header("X-RapidAPI-Host", &self.host)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .context("Streaming Availability fetch failed")?;
        let status = res.status();
        let text = res.text().await.context("reading body failed")?;
        let duration_ms = (Utc::now() - started).num_milliseconds();

        let body: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));
        let info_type = match body.get("streamingInfo") {
            Some(Value::Array(_)) => "array",
            Some(Value::Object(_)) => "object",
            _ => "null",
        };
        Ok(RawProbe {
            ok: status.is_success(),
            status: status.as_u16(),
            duration_ms,
            url,
            info_type,
            body,
        })
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streaming_info_accepts_both_wire_shapes() {
        let flat: StreamingInfo =
            serde_json::from_str(r#"[{"service": "netflix", "streamingType": "subscription"}]"#)
                .unwrap();
        assert_eq!(flat.offers_for_region("GB").len(), 1);

        let keyed: StreamingInfo = serde_json::from_str(
            r#"{"gb": [{"service": "now", "streamingType": "subscription", "link": "https://example"}]}"#,
        )
        .unwrap();
        assert_eq!(keyed.offers_for_region("GB").len(), 1);
        assert!(keyed.offers_for_region("US").is_empty());
    }
}
