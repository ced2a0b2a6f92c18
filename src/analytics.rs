use axum::{body::Bytes, http::HeaderMap, Json};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;

use crate::app::extract_ip;

/// `POST /api/analytics/log` - fire-and-forget game-play telemetry. Bodies are
/// parsed best effort; a garbled payload still logs as "unknown".
pub async fn log_play(headers: HeaderMap, body: Bytes) -> Json<Value> {
    let parsed: Value = serde_json::from_slice(&body).unwrap_or_else(|_| json!({}));
    let game = parsed
        .get("game")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown");
    let score = parsed.get("score").and_then(|v| v.as_i64()).unwrap_or(0);
    let ip = extract_ip(&headers);

    info!(
        time_utc = %Utc::now().to_rfc3339(),
        game = %game,
        ip = %ip,
        score,
        "game play"
    );

    Json(json!({ "ok": true }))
}
