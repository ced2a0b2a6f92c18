use anyhow::Result;
use dotenvy::dotenv;
use std::env;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn check_env() -> Result<()> {
    if env::var("TMDB_API_KEY").is_err() && env::var("TMDB_ACCESS_TOKEN").is_err() {
        anyhow::bail!("Set TMDB_API_KEY (v3) or TMDB_ACCESS_TOKEN (v4) in the environment");
    }
    if env::var("OMDB_API_KEY").is_err() {
        warn!("OMDB_API_KEY not set - IMDb summaries disabled");
    }
    if env::var("RAPIDAPI_STREAMINGAVAIL_KEY").is_err() {
        warn!("RAPIDAPI_STREAMINGAVAIL_KEY not set - streaming offers disabled");
    }
    info!("Environment check passed");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    match dotenv() {
        Ok(path) => info!("Loaded environment from {:?}", path),
        Err(e) => warn!("No .env file loaded ({}) - relying on environment", e),
    }
    init_tracing();
    check_env()?;
    whatson::app::run_server().await
}
