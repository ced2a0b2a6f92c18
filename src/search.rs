use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};
use crate::models::{PersonSummary, TitleSummary};
use crate::region;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
    pub only: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SearchResults {
    People(Vec<PersonSummary>),
    Titles(Vec<TitleSummary>),
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: SearchResults,
}

/// `GET /api/search?query=&only=` - unified movie/TV search, or person search
/// when `only=person`.
pub async fn search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<SearchQuery>,
) -> ApiResult<Json<SearchResponse>> {
    let query = params.query.as_deref().map(str::trim).unwrap_or_default();
    if query.is_empty() {
        return Err(ApiError::bad_request("Missing query parameter"));
    }

    if params.only.as_deref() == Some("person") {
        let people = state
            .tmdb
            .search_person(query)
            .await
            .map_err(ApiError::upstream)?;
        return Ok(Json(SearchResponse {
            results: SearchResults::People(people),
        }));
    }

    let titles = state
        .tmdb
        .search_multi(query)
        .await
        .map_err(ApiError::upstream)?;

    // Attach availability per result concurrently; a provider lookup failing
    // must not cost us the search response.
    let region = region::detect_region(&headers, &state.default_region);
    let mut tasks = Vec::with_capacity(titles.len());
    for title in titles {
        let tmdb = state.tmdb.clone();
        let region = region.clone();
        tasks.push(tokio::spawn(async move {
            let providers = tmdb
                .watch_providers(title.media_type, title.id, &region)
                .await
                .ok()
                .flatten();
            TitleSummary { providers, ..title }
        }));
    }

    let mut results = Vec::with_capacity(tasks.len());
    for task in tasks {
        match task.await {
            Ok(title) => results.push(title),
            Err(e) => warn!("Provider attachment task failed: {}", e),
        }
    }

    Ok(Json(SearchResponse {
        results: SearchResults::Titles(results),
    }))
}
