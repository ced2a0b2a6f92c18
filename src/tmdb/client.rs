use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::env;

use super::map;
use super::{DiscoverFilter, TmdbApi};
use crate::models::{
    Availability, Credits, DiscoverMovie, ExternalIds, MediaType, PersonSummary, TitleDetails,
    TitleSummary,
};

const TMDB_BASE: &str = "https://api.themoviedb.org/3";

#[derive(Debug, Clone)]
enum TmdbAuth {
    /// v4 read access token, sent as a bearer header.
    Bearer(String),
    /// v3 key, appended as the `api_key` query parameter.
    V3Key(String),
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    auth: TmdbAuth,
}

impl TmdbClient {
    pub fn from_env() -> Result<Self> {
        let auth = if let Ok(token) = env::var("TMDB_ACCESS_TOKEN") {
            TmdbAuth::Bearer(token)
        } else {
            let key = env::var("TMDB_API_KEY")
                .context("Set TMDB_API_KEY (v3) or TMDB_ACCESS_TOKEN (v4)")?;
            // JWT-shaped values contain dots; treat them as v4 bearer tokens.
            if key.contains('.') {
                TmdbAuth::Bearer(key)
            } else {
                TmdbAuth::V3Key(key)
            }
        };
        Ok(Self {
            client: Client::new(),
            auth,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let mut query = String::from("language=en-US");
        for (key, value) in params {
            query.push('&');
            query.push_str(key);
            query.push('=');
            query.push_str(&urlencoding::encode(value));
        }
        if let TmdbAuth::V3Key(key) = &self.auth {
            query.push_str("&api_key=");
            query.push_str(&urlencoding::encode(key));
        }
        let url = format!("{TMDB_BASE}{path}?{query}");

        let mut req = self.client.get(&url);
        if let TmdbAuth::Bearer(token) = &self.auth {
            req = req.bearer_auth(token);
        }
        let res = req.send().await.context("TMDB request failed")?;
        let status = res.status();
        let text = res.text().await.context("reading TMDB body failed")?;
        if !status.is_success() {
            return Err(anyhow!("TMDB {} {} -> {}", status, path, text));
        }
        let parsed: T = serde_json::from_str(&text).context("TMDB JSON parse failed")?;
        Ok(parsed)
    }
}

#[async_trait]
impl TmdbApi for TmdbClient {
    async fn search_multi(&self, query: &str) -> Result<Vec<TitleSummary>> {
        let page: map::SearchPage = self
            .get_json(
                "/search/multi",
                &[
                    ("query", query.to_string()),
                    ("include_adult", "false".to_string()),
                    ("page", "1".to_string()),
                ],
            )
            .await?;
        Ok(page
            .results
            .into_iter()
            .filter_map(map::map_search_item)
            .collect())
    }

    async fn search_person(&self, query: &str) -> Result<Vec<PersonSummary>> {
        let page: map::PersonPage = self
            .get_json(
                "/search/person",
                &[
                    ("query", query.to_string()),
                    ("include_adult", "false".to_string()),
                    ("page", "1".to_string()),
                ],
            )
            .await?;
        Ok(page.results.into_iter().map(map::map_person).collect())
    }

    async fn details(&self, media: MediaType, id: i64) -> Result<TitleDetails> {
        let detail: map::Detail = self
            .get_json(&format!("/{}/{}", media.as_str(), id), &[])
            .await?;
        Ok(map::map_detail(media, detail))
    }

    async fn credits(&self, media: MediaType, id: i64) -> Result<Credits> {
        self.get_json(&format!("/{}/{}/credits", media.as_str(), id), &[])
            .await
    }

    async fn external_ids(&self, media: MediaType, id: i64) -> Result<ExternalIds> {
        self.get_json(&format!("/{}/{}/external_ids", media.as_str(), id), &[])
            .await
    }

    async fn watch_providers(
        &self,
        media: MediaType,
        id: i64,
        region: &str,
    ) -> Result<Option<Availability>> {
        let regions: map::ProviderRegions = self
            .get_json(&format!("/{}/{}/watch/providers", media.as_str(), id), &[])
            .await?;
        Ok(map::map_availability(regions, region))
    }

    async fn person(&self, id: i64) -> Result<PersonSummary> {
        let item: map::PersonItem = self.get_json(&format!("/person/{id}"), &[]).await?;
        Ok(map::map_person(item))
    }

    async fn person_combined_credits(&self, id: i64) -> Result<Vec<TitleSummary>> {
        let credits: map::CombinedCredits = self
            .get_json(&format!("/person/{id}/combined_credits"), &[])
            .await?;
        Ok(map::map_combined_credits(credits))
    }

    async fn discover_movies(
        &self,
        filter: &DiscoverFilter,
        page: u32,
    ) -> Result<Vec<DiscoverMovie>> {
        let mut params = vec![
            ("sort_by", "popularity.desc".to_string()),
            ("include_adult", "false".to_string()),
            ("page", page.to_string()),
        ];
        if let Some(genres) = &filter.with_genres {
            params.push(("with_genres", genres.clone()));
        }
        if let Some(count) = filter.min_vote_count {
            params.push(("vote_count.gte", count.to_string()));
        }
        if let Some(avg) = filter.min_vote_average {
            params.push(("vote_average.gte", avg.to_string()));
        }
        if let Some(country) = &filter.origin_country {
            params.push(("with_origin_country", country.clone()));
        }
        if let Some(region) = &filter.region {
            params.push(("region", region.clone()));
        }
        let discovered: map::DiscoverPage = self.get_json("/discover/movie", &params).await?;
        Ok(map::map_discover(discovered))
    }
}
