//! Fetch the merged TMDB payload for one title and print it as JSON.
//! Usage:
//!   cargo run --bin title_probe -- movie <tmdb_id> [region]
//!   cargo run --bin title_probe -- tv <tmdb_id> [region]
//! Requires TMDB credentials in the environment (.env supported).

use anyhow::{Context, Result};
use dotenvy::dotenv;
use serde_json::json;
use std::env;

use whatson::models::MediaType;
use whatson::tmdb::{TmdbApi, TmdbClient};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let mut args = env::args().skip(1);
    let media: MediaType = args
        .next()
        .context("usage: title_probe <movie|tv> <tmdb_id> [region]")?
        .parse()?;
    let id: i64 = args
        .next()
        .context("usage: title_probe <movie|tv> <tmdb_id> [region]")?
        .parse()
        .context("tmdb_id must be numeric")?;
    let region = args.next().unwrap_or_else(|| "US".to_string());

    let tmdb = TmdbClient::from_env()?;
    let (details, credits, providers, external) = tokio::try_join!(
        tmdb.details(media, id),
        tmdb.credits(media, id),
        tmdb.watch_providers(media, id, &region),
        tmdb.external_ids(media, id),
    )?;

    let cast: Vec<_> = credits.cast.iter().take(10).map(|c| &c.name).collect();
    let payload = json!({
        "details": details,
        "cast": cast,
        "providers": providers,
        "external": external,
    });
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}
