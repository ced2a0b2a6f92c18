use anyhow::Result;
use async_trait::async_trait;

mod client;
mod map;

pub use client::TmdbClient;

use crate::models::{
    Availability, Credits, DiscoverMovie, ExternalIds, MediaType, PersonSummary, TitleDetails,
    TitleSummary,
};

/// Filters for `/discover/movie`. Unset fields are omitted from the request.
#[derive(Debug, Clone, Default)]
pub struct DiscoverFilter {
    pub with_genres: Option<String>,
    pub min_vote_count: Option<u32>,
    pub min_vote_average: Option<f32>,
    pub origin_country: Option<String>,
    pub region: Option<String>,
}

#[async_trait]
pub trait TmdbApi: Send + Sync {
    async fn search_multi(&self, query: &str) -> Result<Vec<TitleSummary>>;
    async fn search_person(&self, query: &str) -> Result<Vec<PersonSummary>>;
    async fn details(&self, media: MediaType, id: i64) -> Result<TitleDetails>;
    async fn credits(&self, media: MediaType, id: i64) -> Result<Credits>;
    async fn external_ids(&self, media: MediaType, id: i64) -> Result<ExternalIds>;
    async fn watch_providers(
        &self,
        media: MediaType,
        id: i64,
        region: &str,
    ) -> Result<Option<Availability>>;
    async fn person(&self, id: i64) -> Result<PersonSummary>;
    async fn person_combined_credits(&self, id: i64) -> Result<Vec<TitleSummary>>;
    async fn discover_movies(&self, filter: &DiscoverFilter, page: u32)
        -> Result<Vec<DiscoverMovie>>;
}
