use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};
use crate::region;
use crate::tmdb::DiscoverFilter;

const DECK_SIZE: usize = 30;
const DISCOVER_PAGES: u32 = 3;

struct Category {
    with_genres: &'static str,
    min_vote_count: u32,
}

/// Genre mixes for the "Play Your Movies Right" decks. Vote-count floors keep
/// obscure titles with wild ratings out of the game.
static CATEGORIES: Lazy<HashMap<&'static str, Category>> = Lazy::new(|| {
    HashMap::from([
        (
            "comedy",
            Category {
                with_genres: "35",
                min_vote_count: 200,
            },
        ),
        (
            "sci-fi",
            Category {
                with_genres: "878",
                min_vote_count: 200,
            },
        ),
        (
            "rom-com",
            Category {
                with_genres: "35,10749",
                min_vote_count: 150,
            },
        ),
        (
            "action",
            Category {
                with_genres: "28",
                min_vote_count: 200,
            },
        ),
        (
            "family",
            Category {
                with_genres: "10751",
                min_vote_count: 100,
            },
        ),
    ])
});

#[derive(Debug, Deserialize)]
pub struct DeckQuery {
    pub category: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeckCard {
    pub id: i64,
    pub title: String,
    pub poster_path: Option<String>,
    pub vote_average: f64,
}

#[derive(Debug, Serialize)]
pub struct DeckResponse {
    pub deck: Vec<DeckCard>,
}

/// `GET /api/games/pymr/deck?category=` - a shuffled deck of rated movies for
/// the higher/lower game.
pub async fn deck(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<DeckQuery>,
) -> ApiResult<Json<DeckResponse>> {
    let category = params.category.unwrap_or_default().to_lowercase();
    let Some(def) = CATEGORIES.get(category.as_str()) else {
        return Err(ApiError::bad_request("Unknown category"));
    };
    let region = params
        .region
        .as_deref()
        .filter(|r| region::is_region_code(r))
        .map(str::to_uppercase)
        .unwrap_or_else(|| region::detect_region(&headers, &state.default_region));

    let filter = DiscoverFilter {
        with_genres: Some(def.with_genres.to_string()),
        min_vote_count: Some(def.min_vote_count),
        region: Some(region),
        ..Default::default()
    };

    // A few pages gives the shuffle enough variety without hammering TMDB.
    let mut all = Vec::new();
    for page in 1..=DISCOVER_PAGES {
        let movies = state
            .tmdb
            .discover_movies(&filter, page)
            .await
            .map_err(ApiError::upstream)?;
        all.extend(movies);
    }

    let mut deck: Vec<DeckCard> = all
        .into_iter()
        .filter(|m| m.vote_average.is_some() && !m.title.is_empty())
        .map(|m| DeckCard {
            id: m.id,
            title: m.title,
            poster_path: m.poster_path,
            vote_average: (m.vote_average.unwrap_or(0.0) * 10.0).round() / 10.0,
        })
        .collect();
    deck.shuffle(&mut rand::thread_rng());
    deck.truncate(DECK_SIZE);

    Ok(Json(DeckResponse { deck }))
}
