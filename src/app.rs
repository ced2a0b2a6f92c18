use anyhow::Result;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::json;
use std::{collections::HashMap, env, net::SocketAddr, sync::Arc};
use tokio::sync::Mutex;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::affiliates::{self, AffiliateConfig};
use crate::analytics;
use crate::debug;
use crate::games;
use crate::omdb::{OmdbApi, OmdbClient};
use crate::region::{self, is_region_code};
use crate::search;
use crate::streaming::{StreamingApi, StreamingClient};
use crate::title;
use crate::tmdb::{TmdbApi, TmdbClient};

const MAX_BODY_BYTES: usize = 1024 * 1024; // 1MB safety cap
const PER_IP_LIMIT: u32 = 120; // per minute
const PER_IP_BURST: u32 = 30;
const GLOBAL_LIMIT: u32 = 1200; // per minute
const GLOBAL_BURST: u32 = 100;
const MAX_RATE_LIMIT_ENTRIES: usize = 10_000;
const DEFAULT_PORT: u16 = 3146;

#[derive(Clone)]
pub struct AppState {
    pub tmdb: Arc<dyn TmdbApi>,
    pub omdb: Arc<dyn OmdbApi>,
    pub streaming: Arc<dyn StreamingApi>,
    pub affiliates: Arc<AffiliateConfig>,
    /// Region used when neither cookie nor headers identify one.
    pub default_region: String,
    /// Seed for the region cookie when detection finds nothing.
    pub fallback_region: String,
    pub rate_limits: Arc<Mutex<HashMap<String, WindowCounter>>>,
    pub global_limit: Arc<Mutex<WindowCounter>>,
}

#[derive(Clone, Debug)]
pub struct WindowCounter {
    pub window: u64,
    pub count: u32,
}

fn env_region(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .filter(|r| is_region_code(r))
        .map(|r| r.to_uppercase())
}

pub async fn run_server() -> Result<()> {
    let tmdb: Arc<dyn TmdbApi> = Arc::new(TmdbClient::from_env()?);
    let omdb: Arc<dyn OmdbApi> = Arc::new(OmdbClient::from_env());
    let streaming: Arc<dyn StreamingApi> = Arc::new(StreamingClient::from_env());
    let affiliates = Arc::new(AffiliateConfig::from_env());

    let default_region = env_region("DEFAULT_REGION").unwrap_or_else(|| "US".to_string());
    let fallback_region = env_region("DEV_REGION").unwrap_or_else(|| "GB".to_string());
    info!(
        "Default region {}, cookie fallback {}",
        default_region, fallback_region
    );

    let state = AppState {
        tmdb,
        omdb,
        streaming,
        affiliates,
        default_region,
        fallback_region,
        rate_limits: Arc::new(Mutex::new(HashMap::new())),
        global_limit: Arc::new(Mutex::new(WindowCounter {
            window: 0,
            count: 0,
        })),
    };

    let app = build_router(state);

    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/search", get(search::search))
        .route("/api/title/:media_type/:id", get(title::title_details))
        .route("/api/game/seven/init", get(games::seven::init))
        .route("/api/game/seven/expand", get(games::seven::expand))
        .route("/api/games/pymr/deck", get(games::pymr::deck))
        .route("/go/:provider", get(affiliates::go_redirect))
        .route("/api/region", post(region::set_region))
        .route("/api/analytics/log", post(analytics::log_play))
        .route("/api/debug/streaming", get(debug::streaming_summary))
        .route("/api/debug/streaming/raw", get(debug::streaming_raw))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            region::region_cookie_mw,
        ))
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit_mw))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn rate_limit_mw(
    State(state): State<AppState>,
    req: Request,
    next: middleware::Next,
) -> Response {
    let ip = extract_ip(req.headers());
    if !check_rate_limit(&state, &ip).await || !check_global_rate_limit(&state).await {
        warn!("Rate limit exceeded for {}", ip);
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "Too many requests" })),
        )
            .into_response();
    }
    next.run(req).await
}

pub fn extract_ip(headers: &HeaderMap) -> String {
    headers
        .get("cf-connecting-ip")
        .or_else(|| headers.get("x-real-ip"))
        .or_else(|| headers.get("x-forwarded-for"))
        .and_then(|v| v.to_str().ok())
        .map(|s| s.split(',').next().unwrap_or(s).trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

async fn check_rate_limit(state: &AppState, ip: &str) -> bool {
    let window = (Utc::now().timestamp() / 60) as u64;
    let mut guards = state.rate_limits.lock().await;
    if guards.len() > MAX_RATE_LIMIT_ENTRIES {
        guards.retain(|_, v| v.window == window);
    }
    let entry = guards
        .entry(ip.to_string())
        .or_insert(WindowCounter { window, count: 0 });
    if entry.window != window {
        entry.window = window;
        entry.count = 0;
    }
    if entry.count >= PER_IP_LIMIT + PER_IP_BURST {
        return false;
    }
    entry.count += 1;
    true
}

async fn check_global_rate_limit(state: &AppState) -> bool {
    let window = (Utc::now().timestamp() / 60) as u64;
    let mut guard = state.global_limit.lock().await;
    if guard.window != window {
        guard.window = window;
        guard.count = 0;
    }
    if guard.count >= GLOBAL_LIMIT + GLOBAL_BURST {
        return false;
    }
    guard.count += 1;
    true
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        term.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
