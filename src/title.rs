use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};
use crate::models::{Availability, Credits, ExternalIds, MediaType, OmdbSummary, TitleDetails};
use crate::offers::{normalize_provider_key, select_best_offer};
use crate::region;
use crate::streaming::{SaShow, StreamingOffer};

#[derive(Debug, Deserialize)]
pub struct TitleQuery {
    /// Preferred provider key from the caller's settings, e.g. `prime`.
    pub preferred: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TitlePayload {
    pub details: TitleDetails,
    pub credits: Credits,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub providers: Option<Availability>,
    pub external: ExternalIds,
    #[serde(rename = "imdbSummary", skip_serializing_if = "Option::is_none")]
    pub imdb_summary: Option<OmdbSummary>,
    #[serde(
        rename = "streamingAvailability",
        skip_serializing_if = "Option::is_none"
    )]
    pub streaming_availability: Option<SaShow>,
    pub offers: Vec<StreamingOffer>,
    #[serde(rename = "bestOffer", skip_serializing_if = "Option::is_none")]
    pub best_offer: Option<StreamingOffer>,
}

/// `GET /api/title/{type}/{id}` - merged detail payload: TMDB details,
/// credits, watch providers and external ids, enriched best effort with the
/// OMDb summary and regional streaming offers.
pub async fn title_details(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((media, id)): Path<(String, String)>,
    Query(params): Query<TitleQuery>,
) -> ApiResult<Json<TitlePayload>> {
    let media: MediaType = media
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid type or id"))?;
    let id: i64 = id
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid type or id"))?;

    let region = region::detect_region(&headers, &state.default_region);

    let (details, credits, providers, external) = tokio::try_join!(
        state.tmdb.details(media, id),
        state.tmdb.credits(media, id),
        state.tmdb.watch_providers(media, id, &region),
        state.tmdb.external_ids(media, id),
    )
    .map_err(ApiError::upstream)?;

    let mut imdb_summary = None;
    let mut streaming_availability = None;
    if let Some(imdb_id) = external.imdb_id() {
        imdb_summary = state
            .omdb
            .summary_by_imdb_id(imdb_id)
            .await
            .unwrap_or_else(|e| {
                warn!("OMDb lookup for {} failed: {}", imdb_id, e);
                None
            });
        streaming_availability = state
            .streaming
            .show_by_imdb_id(imdb_id, &region)
            .await
            .unwrap_or_else(|e| {
                warn!("Streaming availability lookup for {} failed: {}", imdb_id, e);
                None
            });
    }

    let offers: Vec<StreamingOffer> = streaming_availability
        .as_ref()
        .and_then(|sa| sa.streaming_info.as_ref())
        .map(|info| info.offers_for_region(&region))
        .unwrap_or_default();
    let preferred = params
        .preferred
        .as_deref()
        .map(|p| normalize_provider_key(Some(p)));
    let best_offer = select_best_offer(&offers, preferred.as_deref()).cloned();

    Ok(Json(TitlePayload {
        details,
        credits,
        providers,
        external,
        imdb_summary,
        streaming_availability,
        offers,
        best_offer,
    }))
}
