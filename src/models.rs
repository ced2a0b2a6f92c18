use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Tv,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
        }
    }
}

impl FromStr for MediaType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "movie" => Ok(MediaType::Movie),
            "tv" => Ok(MediaType::Tv),
            other => Err(anyhow!("unknown media type '{}'", other)),
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub provider_id: i64,
    pub provider_name: String,
    pub logo_path: Option<String>,
}

/// Watch-provider availability for a title in one region.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Availability {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flatrate: Option<Vec<ProviderInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buy: Option<Vec<ProviderInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rent: Option<Vec<ProviderInfo>>,
}

impl Availability {
    pub fn is_empty(&self) -> bool {
        self.flatrate.is_none() && self.buy.is_none() && self.rent.is_none()
    }
}

/// Unified movie/TV search result shape served to clients.
#[derive(Debug, Clone, Serialize)]
pub struct TitleSummary {
    pub id: i64,
    pub media_type: MediaType,
    pub title: String,
    pub overview: String,
    pub poster_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub providers: Option<Availability>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PersonSummary {
    pub id: i64,
    pub name: String,
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

/// Detail payload for one title, remapped from the TMDB detail response.
#[derive(Debug, Clone, Serialize)]
pub struct TitleDetails {
    pub id: i64,
    pub media_type: MediaType,
    pub title: String,
    pub overview: String,
    pub poster_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<Genre>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode_run_time: Option<Vec<i32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_air_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastMember {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character: Option<String>,
    #[serde(default)]
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrewMember {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default)]
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<CastMember>,
    #[serde(default)]
    pub crew: Vec<CrewMember>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExternalIds {
    #[serde(default)]
    pub imdb_id: Option<String>,
}

impl ExternalIds {
    /// IMDb id, treating the empty string TMDB sometimes returns as absent.
    pub fn imdb_id(&self) -> Option<&str> {
        self.imdb_id.as_deref().filter(|s| !s.is_empty())
    }
}

/// One row from a TMDB discover page.
#[derive(Debug, Clone)]
pub struct DiscoverMovie {
    pub id: i64,
    pub title: String,
    pub poster_path: Option<String>,
    pub vote_average: Option<f64>,
    pub release_year: Option<i32>,
}

/// OMDb summary, passed through with its upstream PascalCase field names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OmdbSummary {
    #[serde(rename = "imdbID", default, skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
    #[serde(rename = "Title", default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "Year", default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(rename = "Rated", default, skip_serializing_if = "Option::is_none")]
    pub rated: Option<String>,
    #[serde(rename = "Released", default, skip_serializing_if = "Option::is_none")]
    pub released: Option<String>,
    #[serde(rename = "Runtime", default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    #[serde(rename = "Genre", default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(rename = "Director", default, skip_serializing_if = "Option::is_none")]
    pub director: Option<String>,
    #[serde(rename = "Writer", default, skip_serializing_if = "Option::is_none")]
    pub writer: Option<String>,
    #[serde(rename = "Actors", default, skip_serializing_if = "Option::is_none")]
    pub actors: Option<String>,
    #[serde(rename = "Plot", default, skip_serializing_if = "Option::is_none")]
    pub plot: Option<String>,
    #[serde(rename = "Language", default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(rename = "Country", default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(rename = "Awards", default, skip_serializing_if = "Option::is_none")]
    pub awards: Option<String>,
    #[serde(rename = "Poster", default, skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    #[serde(rename = "Ratings", default, skip_serializing_if = "Option::is_none")]
    pub ratings: Option<Vec<OmdbRating>>,
    #[serde(rename = "imdbRating", default, skip_serializing_if = "Option::is_none")]
    pub imdb_rating: Option<String>,
    #[serde(rename = "imdbVotes", default, skip_serializing_if = "Option::is_none")]
    pub imdb_votes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OmdbRating {
    #[serde(rename = "Source")]
    pub source: String,
    #[serde(rename = "Value")]
    pub value: String,
}

/// First four digits of a `YYYY-MM-DD` date string.
pub fn release_year(date: Option<&str>) -> Option<i32> {
    let date = date?;
    let year = date.split('-').next()?;
    if year.len() != 4 {
        return None;
    }
    year.parse().ok()
}
