use anyhow::{anyhow, Context, Result};
use axum::{
    extract::{Query, State},
    Json,
};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use super::GameNode;
use crate::app::AppState;
use crate::error::{ApiError, ApiResult};
use crate::models::MediaType;
use crate::tmdb::{DiscoverFilter, TmdbApi};

/// TMDB person id of the default destination, Kevin Bacon.
const DEFAULT_TARGET_PERSON_ID: i64 = 4724;
const STARTING_MOVES: u32 = 7;
const START_REROLL_ATTEMPTS: u64 = 5;
/// Discover pages the seeded start pick draws from.
const START_POOL_PAGES: u64 = 5;
const DEFAULT_FRONTIER_LIMIT: usize = 20;
const MAX_FRONTIER_LIMIT: usize = 30;

#[derive(Debug, Deserialize)]
pub struct InitQuery {
    pub seed: Option<String>,
    #[serde(rename = "targetKind")]
    pub target_kind: Option<String>,
    #[serde(rename = "targetId")]
    pub target_id: Option<String>,
    #[serde(rename = "targetMediaType")]
    pub target_media_type: Option<String>,
    #[serde(rename = "startId")]
    pub start_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InitPayload {
    pub seed: u64,
    pub start: GameNode,
    pub target: GameNode,
    pub moves: u32,
}

/// A high-rated US movie picked deterministically from the seed, so shared
/// links reproduce the same round.
async fn random_start(tmdb: &Arc<dyn TmdbApi>, seed: u64) -> Result<GameNode> {
    let filter = DiscoverFilter {
        min_vote_count: Some(1000),
        min_vote_average: Some(7.0),
        origin_country: Some("US".to_string()),
        ..Default::default()
    };
    let page = 1 + (seed % START_POOL_PAGES) as u32;
    let movies = tmdb
        .discover_movies(&filter, page)
        .await
        .context("loading start movie pool")?;
    let mut rng = StdRng::seed_from_u64(seed);
    let pick = movies
        .choose(&mut rng)
        .ok_or_else(|| anyhow!("discover returned an empty start pool"))?;
    Ok(GameNode::Title {
        id: pick.id,
        media_type: MediaType::Movie,
        title: pick.title.clone(),
        poster_path: pick.poster_path.clone(),
        release_year: pick.release_year,
    })
}

async fn resolve_target(state: &AppState, params: &InitQuery) -> Result<GameNode> {
    let target_kind = params
        .target_kind
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();
    let target_id: Option<i64> = params.target_id.as_deref().and_then(|s| s.parse().ok());
    let target_media: Option<MediaType> = params
        .target_media_type
        .as_deref()
        .and_then(|s| s.parse().ok());

    match (target_kind.as_str(), target_id, target_media) {
        ("person", Some(id), _) => {
            let person = state
                .tmdb
                .person(id)
                .await
                .context("Failed to load target person")?;
            Ok(GameNode::from_person(person))
        }
        ("title", Some(id), Some(media)) => {
            let details = state
                .tmdb
                .details(media, id)
                .await
                .context("Failed to load target title")?;
            Ok(GameNode::from_details(details))
        }
        _ => {
            let person = state
                .tmdb
                .person(DEFAULT_TARGET_PERSON_ID)
                .await
                .context("Failed to load default target")?;
            Ok(GameNode::from_person(person))
        }
    }
}

/// Whether the round would be winnable in one move.
async fn is_trivial_start(state: &AppState, start: &GameNode, target: &GameNode) -> bool {
    match target {
        GameNode::Person { id: target_id, .. } => state
            .tmdb
            .credits(MediaType::Movie, start.id())
            .await
            .map(|credits| credits.cast.iter().any(|m| m.id == *target_id))
            .unwrap_or(false),
        GameNode::Title { id: target_id, .. } => start.id() == *target_id,
    }
}

/// `GET /api/game/seven/init` - bootstrap a round: a start movie, a target
/// (person or title) and the move budget.
pub async fn init(
    State(state): State<AppState>,
    Query(params): Query<InitQuery>,
) -> ApiResult<Json<InitPayload>> {
    let seed: u64 = params
        .seed
        .as_deref()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| rand::thread_rng().gen_range(0..1_000_000_000));
    let start_id: Option<i64> = params.start_id.as_deref().and_then(|s| s.parse().ok());

    let mut start = match start_id {
        Some(id) => {
            let details = state
                .tmdb
                .details(MediaType::Movie, id)
                .await
                .map_err(ApiError::upstream)?;
            GameNode::from_details(details)
        }
        None => random_start(&state.tmdb, seed)
            .await
            .map_err(ApiError::upstream)?,
    };

    let target = resolve_target(&state, &params)
        .await
        .map_err(ApiError::upstream)?;

    // Re-roll starts that connect to the target in a single move. An
    // explicitly requested start is honored even when trivial.
    for attempt in 0..START_REROLL_ATTEMPTS {
        if !is_trivial_start(&state, &start, &target).await {
            break;
        }
        if start_id.is_some() {
            break;
        }
        debug!("Re-rolling trivial start (attempt {})", attempt + 1);
        start = random_start(&state.tmdb, seed + attempt + 1)
            .await
            .map_err(ApiError::upstream)?;
    }

    Ok(Json(InitPayload {
        seed,
        start,
        target,
        moves: STARTING_MOVES,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ExpandQuery {
    pub kind: Option<String>,
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExpandResponse {
    pub nodes: Vec<GameNode>,
}

/// `GET /api/game/seven/expand` - the frontier for the current node: cast for
/// a title, movie/TV credits for a person. Upstream failures produce an empty
/// frontier rather than ending the round.
pub async fn expand(
    State(state): State<AppState>,
    Query(params): Query<ExpandQuery>,
) -> ApiResult<Json<ExpandResponse>> {
    let id: i64 = params
        .id
        .as_deref()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ApiError::bad_request("Invalid params"))?;
    let kind = params
        .kind
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("Invalid params"))?;
    let limit = params
        .limit
        .as_deref()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(DEFAULT_FRONTIER_LIMIT)
        .clamp(1, MAX_FRONTIER_LIMIT);

    match kind {
        "title" => {
            let media: MediaType = params
                .media_type
                .as_deref()
                .and_then(|s| s.parse().ok())
                .unwrap_or(MediaType::Movie);
            let cast = match state.tmdb.credits(media, id).await {
                Ok(credits) => credits.cast,
                Err(e) => {
                    warn!("Credits for {} {} failed: {}", media, id, e);
                    Vec::new()
                }
            };
            let nodes = cast
                .into_iter()
                .take(limit)
                .map(GameNode::from_cast_member)
                .collect();
            Ok(Json(ExpandResponse { nodes }))
        }
        "person" => {
            let titles = match state.tmdb.person_combined_credits(id).await {
                Ok(titles) => titles,
                Err(e) => {
                    warn!("Combined credits for person {} failed: {}", id, e);
                    Vec::new()
                }
            };
            let nodes = titles
                .into_iter()
                .take(limit)
                .map(GameNode::from_summary)
                .collect();
            Ok(Json(ExpandResponse { nodes }))
        }
        _ => Err(ApiError::bad_request("Unknown kind")),
    }
}
