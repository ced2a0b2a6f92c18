use serde::Deserialize;
use std::collections::HashMap;

use crate::models::{
    release_year, Availability, DiscoverMovie, Genre, MediaType, PersonSummary, ProviderInfo,
    TitleDetails, TitleSummary,
};

#[derive(Debug, Deserialize)]
pub(crate) struct SearchPage {
    #[serde(default)]
    pub results: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchItem {
    pub id: i64,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
}

/// Multi-search rows cover movies, TV and people; only the first two become titles.
pub(crate) fn map_search_item(item: SearchItem) -> Option<TitleSummary> {
    let media_type: MediaType = item.media_type.as_deref()?.parse().ok()?;
    Some(TitleSummary {
        id: item.id,
        media_type,
        title: item.title.or(item.name).unwrap_or_default(),
        overview: item.overview.unwrap_or_default(),
        poster_path: item.poster_path,
        release_year: release_year(item.release_date.as_deref())
            .or_else(|| release_year(item.first_air_date.as_deref())),
        providers: None,
    })
}

#[derive(Debug, Deserialize)]
pub(crate) struct PersonPage {
    #[serde(default)]
    pub results: Vec<PersonItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PersonItem {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub profile_path: Option<String>,
}

pub(crate) fn map_person(item: PersonItem) -> PersonSummary {
    PersonSummary {
        id: item.id,
        name: item.name,
        profile_path: item.profile_path,
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Detail {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub genres: Option<Vec<Genre>>,
    #[serde(default)]
    pub runtime: Option<i32>,
    #[serde(default)]
    pub episode_run_time: Option<Vec<i32>>,
}

pub(crate) fn map_detail(media: MediaType, detail: Detail) -> TitleDetails {
    let release_year = release_year(detail.release_date.as_deref())
        .or_else(|| release_year(detail.first_air_date.as_deref()));
    TitleDetails {
        id: detail.id,
        media_type: media,
        title: detail.title.or(detail.name).unwrap_or_default(),
        overview: detail.overview.unwrap_or_default(),
        poster_path: detail.poster_path,
        release_year,
        genres: detail.genres,
        runtime: detail.runtime,
        episode_run_time: detail.episode_run_time,
        release_date: detail.release_date,
        first_air_date: detail.first_air_date,
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProviderRegions {
    #[serde(default)]
    pub results: HashMap<String, RegionOffers>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RegionOffers {
    #[serde(default)]
    pub flatrate: Option<Vec<ProviderInfo>>,
    #[serde(default)]
    pub buy: Option<Vec<ProviderInfo>>,
    #[serde(default)]
    pub rent: Option<Vec<ProviderInfo>>,
}

/// Picks the requested region's offers, falling back to US, `None` when empty.
pub(crate) fn map_availability(mut regions: ProviderRegions, region: &str) -> Option<Availability> {
    let offers = regions
        .results
        .remove(region)
        .or_else(|| regions.results.remove("US"))?;
    let availability = Availability {
        flatrate: offers.flatrate.filter(|v| !v.is_empty()),
        buy: offers.buy.filter(|v| !v.is_empty()),
        rent: offers.rent.filter(|v| !v.is_empty()),
    };
    if availability.is_empty() {
        None
    } else {
        Some(availability)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CombinedCredits {
    #[serde(default)]
    pub cast: Vec<CombinedCredit>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CombinedCredit {
    pub id: i64,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub popularity: Option<f64>,
}

/// Movie/TV acting credits ordered most-popular first.
pub(crate) fn map_combined_credits(credits: CombinedCredits) -> Vec<TitleSummary> {
    let mut entries: Vec<(f64, TitleSummary)> = credits
        .cast
        .into_iter()
        .filter_map(|c| {
            let media_type: MediaType = c.media_type.as_deref()?.parse().ok()?;
            let popularity = c.popularity.unwrap_or(0.0);
            Some((
                popularity,
                TitleSummary {
                    id: c.id,
                    media_type,
                    title: c.title.or(c.name).unwrap_or_default(),
                    overview: c.overview.unwrap_or_default(),
                    poster_path: c.poster_path,
                    release_year: release_year(c.release_date.as_deref())
                        .or_else(|| release_year(c.first_air_date.as_deref())),
                    providers: None,
                },
            ))
        })
        .collect();
    entries.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    entries.into_iter().map(|(_, t)| t).collect()
}

#[derive(Debug, Deserialize)]
pub(crate) struct DiscoverPage {
    #[serde(default)]
    pub results: Vec<DiscoverItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DiscoverItem {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub release_date: Option<String>,
}

pub(crate) fn map_discover(page: DiscoverPage) -> Vec<DiscoverMovie> {
    page.results
        .into_iter()
        .map(|m| DiscoverMovie {
            id: m.id,
            title: m.title.or(m.name).unwrap_or_default(),
            poster_path: m.poster_path,
            vote_average: m.vote_average,
            release_year: release_year(m.release_date.as_deref()),
        })
        .collect()
}
