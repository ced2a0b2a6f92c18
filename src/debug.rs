use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeSet;

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};
use crate::models::MediaType;
use crate::streaming::{StreamingInfo, StreamingOffer};

#[derive(Debug, Deserialize)]
pub struct StreamingDebugQuery {
    #[serde(rename = "imdbId")]
    pub imdb_id: Option<String>,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    pub id: Option<String>,
    pub country: Option<String>,
}

fn summarize_offers(country: &str, offers: &[StreamingOffer]) -> Value {
    let services: BTreeSet<&str> = offers.iter().filter_map(|o| o.service.as_deref()).collect();
    let sample: Vec<&StreamingOffer> = offers.iter().take(5).collect();
    json!({
        "country": country,
        "count": offers.len(),
        "sample": sample,
        "services": services,
    })
}

/// `GET /api/debug/streaming` - availability sanity check. Resolves the IMDb
/// id via TMDB when only a TMDB type/id pair is given.
pub async fn streaming_summary(
    State(state): State<AppState>,
    Query(params): Query<StreamingDebugQuery>,
) -> ApiResult<Json<Value>> {
    let country = params
        .country
        .as_deref()
        .map(str::to_uppercase)
        .unwrap_or_else(|| state.default_region.clone());

    let imdb_id = match params.imdb_id {
        Some(imdb_id) => imdb_id,
        None => {
            let media: Option<MediaType> =
                params.media_type.as_deref().and_then(|s| s.parse().ok());
            let id: Option<i64> = params.id.as_deref().and_then(|s| s.parse().ok());
            let (Some(media), Some(id)) = (media, id) else {
                return Err(ApiError::bad_request(
                    "Provide imdbId, or type=movie|tv and id (TMDB id).",
                ));
            };
            let external = state
                .tmdb
                .external_ids(media, id)
                .await
                .map_err(ApiError::upstream)?;
            match external.imdb_id() {
                Some(imdb_id) => imdb_id.to_string(),
                None => {
                    return Err(ApiError::not_found(
                        "No imdb_id found for given TMDB type/id.",
                    ))
                }
            }
        }
    };

    let show = state
        .streaming
        .show_by_imdb_id(&imdb_id, &country)
        .await
        .map_err(ApiError::upstream)?;

    let services: Vec<Value> = match show.as_ref().and_then(|s| s.streaming_info.as_ref()) {
        Some(StreamingInfo::Flat(offers)) => vec![summarize_offers(&country, offers)],
        Some(StreamingInfo::ByCountry(map)) => map
            .iter()
            .map(|(cc, offers)| summarize_offers(cc, offers))
            .collect(),
        None => Vec::new(),
    };

    Ok(Json(json!({
        "ok": true,
        "country": country,
        "imdbId": imdb_id,
        "hasData": show.is_some(),
        "services": services,
        "raw": show,
    })))
}

#[derive(Debug, Deserialize)]
pub struct StreamingRawQuery {
    #[serde(rename = "imdbId")]
    pub imdb_id: Option<String>,
    pub country: Option<String>,
    #[serde(rename = "series_granularity")]
    pub series_granularity: Option<String>,
    #[serde(rename = "output_language")]
    pub output_language: Option<String>,
}

/// `GET /api/debug/streaming/raw` - uncached passthrough to the availability
/// API, with upstream status and timing echoed back.
pub async fn streaming_raw(
    State(state): State<AppState>,
    Query(params): Query<StreamingRawQuery>,
) -> ApiResult<Json<Value>> {
    let Some(imdb_id) = params.imdb_id.as_deref().filter(|s| !s.is_empty()) else {
        return Err(ApiError::bad_request("imdbId is required"));
    };
    if !state.streaming.is_configured() {
        return Err(ApiError::Internal(
            "RAPIDAPI_STREAMINGAVAIL_KEY not set".to_string(),
        ));
    }
    let country = params
        .country
        .as_deref()
        .filter(|c| !c.is_empty())
        .map(str::to_uppercase);
    let series_granularity = params.series_granularity.as_deref().unwrap_or("show");
    let output_language = params.output_language.as_deref().unwrap_or("en");

    let probe = state
        .streaming
        .raw_show(imdb_id, country.as_deref(), series_granularity, output_language)
        .await
        .map_err(ApiError::upstream)?;

    Ok(Json(json!({
        "ok": probe.ok,
        "status": probe.status,
        "durationMs": probe.duration_ms,
        "request": {
            "url": probe.url,
            "country": country,
            "seriesGranularity": series_granularity,
            "outputLanguage": output_language,
        },
        "infoType": probe.info_type,
        "body": probe.body,
    })))
}
