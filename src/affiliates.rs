use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use tracing::info;

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};
use crate::models::MediaType;

/// Affiliate knobs read once at startup. Every field is optional; a missing
/// value disables that provider/region pairing (or falls back to the plain
/// landing page where one exists).
#[derive(Debug, Clone, Default)]
pub struct AffiliateConfig {
    pub amazon_tag_us: Option<String>,
    pub amazon_tag_gb: Option<String>,
    pub apple_at: Option<String>,
    pub paramount_url_us: Option<String>,
    pub paramount_url_gb: Option<String>,
    pub now_affiliate_gb: Option<String>,
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

impl AffiliateConfig {
    pub fn from_env() -> Self {
        Self {
            amazon_tag_us: env_opt("AMAZON_TAG_US"),
            amazon_tag_gb: env_opt("AMAZON_TAG_GB"),
            apple_at: env_opt("APPLE_AT"),
            paramount_url_us: env_opt("PARAMOUNT_URL_US"),
            paramount_url_gb: env_opt("PARAMOUNT_URL_GB"),
            now_affiliate_gb: env_opt("NOW_AFFILIATE_GB"),
        }
    }

    /// Affiliate URL for a provider slug in a region; unknown regions use the
    /// US table. `None` means no mapping (Netflix never has one).
    pub fn resolve(&self, slug: &str, region: &str) -> Option<String> {
        if region == "GB" {
            return self.resolve_gb(slug);
        }
        self.resolve_us(slug)
    }

    fn resolve_us(&self, slug: &str) -> Option<String> {
        match slug {
            "prime" => self.amazon_tag_us.as_ref().map(|tag| {
                format!(
                    "https://www.amazon.com/gp/video/storefront?tag={}",
                    urlencoding::encode(tag)
                )
            }),
            "paramount" => Some(
                self.paramount_url_us
                    .clone()
                    .unwrap_or_else(|| "https://www.paramountplus.com/".to_string()),
            ),
            "appletv" => Some(match &self.apple_at {
                Some(at) => format!("https://tv.apple.com/?at={}", urlencoding::encode(at)),
                None => "https://tv.apple.com/".to_string(),
            }),
            _ => None,
        }
    }

    fn resolve_gb(&self, slug: &str) -> Option<String> {
        match slug {
            "prime" => self.amazon_tag_gb.as_ref().map(|tag| {
                format!(
                    "https://www.amazon.co.uk/gp/video/storefront?tag={}",
                    urlencoding::encode(tag)
                )
            }),
            "now" => Some(
                self.now_affiliate_gb
                    .clone()
                    .unwrap_or_else(|| "https://www.nowtv.com/".to_string()),
            ),
            "appletv" => Some(match &self.apple_at {
                Some(at) => format!("https://tv.apple.com/gb?at={}", urlencoding::encode(at)),
                None => "https://tv.apple.com/gb".to_string(),
            }),
            "paramount" => Some(
                self.paramount_url_gb
                    .clone()
                    .unwrap_or_else(|| "https://www.paramountplus.com/gb/".to_string()),
            ),
            _ => None,
        }
    }

    pub fn has_affiliate(&self, provider_name: &str, region: &str) -> bool {
        let slug = provider_slug_from_name(provider_name);
        if slug.is_empty() || slug == "netflix" {
            return false;
        }
        self.resolve(&slug, region).is_some()
    }
}

static SLUG_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("amazon prime video", "prime"),
        ("amazon", "prime"),
        ("prime video", "prime"),
        ("paramount+", "paramount"),
        ("apple tv", "appletv"),
        ("apple tv+", "appletv"),
        ("now", "now"),
    ])
});

/// Display name to affiliate slug: known aliases first, otherwise lowercased
/// with non-alphanumerics removed.
pub fn provider_slug_from_name(name: &str) -> String {
    let key = name.to_lowercase().trim().to_string();
    if let Some(slug) = SLUG_ALIASES.get(key.as_str()) {
        return (*slug).to_string();
    }
    key.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

#[derive(Debug, Deserialize)]
pub struct GoQuery {
    pub id: Option<String>,
    pub imdb: Option<String>,
    pub region: Option<String>,
    #[serde(rename = "type")]
    pub media_type: Option<MediaType>,
}

/// `GET /go/{provider}` - 302 to the region's affiliate URL.
pub async fn go_redirect(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<GoQuery>,
) -> ApiResult<Response> {
    let region = query
        .region
        .as_deref()
        .map(str::to_uppercase)
        .unwrap_or_else(|| state.default_region.clone());
    let tmdb_id: Option<i64> = query.id.as_deref().and_then(|s| s.parse().ok());

    // Amazon's storefront link is title-independent; everyone else needs an id.
    if provider.is_empty() || (tmdb_id.is_none() && provider != "prime") {
        return Err(ApiError::bad_request("Invalid params"));
    }

    let Some(url) = state.affiliates.resolve(&provider, &region) else {
        return Err(ApiError::not_found("No affiliate mapping for provider/region"));
    };

    info!(
        provider = %provider,
        media_type = %query.media_type.unwrap_or(MediaType::Movie),
        tmdb_id = ?tmdb_id,
        imdb = ?query.imdb,
        region = %region,
        url = %url,
        "affiliate redirect"
    );

    Ok((StatusCode::FOUND, [(header::LOCATION, url)]).into_response())
}
