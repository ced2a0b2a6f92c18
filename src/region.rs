use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;

use crate::app::AppState;

pub const REGION_COOKIE: &str = "wow_region";
const COOKIE_MAX_AGE_SECS: u32 = 60 * 60 * 24 * 365;

/// Edge-provided country headers, most specific first.
const COUNTRY_HEADERS: [&str; 4] = [
    "x-vercel-ip-country",
    "cf-ipcountry",
    "x-country-code",
    "x-geo-country",
];

pub fn is_region_code(s: &str) -> bool {
    s.len() == 2 && s.chars().all(|c| c.is_ascii_alphabetic())
}

/// Value of the `wow_region` cookie, when present and well-formed.
pub fn cookie_region(headers: &HeaderMap) -> Option<String> {
    for value in headers.get_all(header::COOKIE) {
        let Ok(raw) = value.to_str() else { continue };
        for pair in raw.split(';') {
            let pair = pair.trim();
            if let Some(code) = pair.strip_prefix("wow_region=") {
                if is_region_code(code) {
                    return Some(code.to_uppercase());
                }
            }
        }
    }
    None
}

fn header_region(headers: &HeaderMap) -> Option<String> {
    COUNTRY_HEADERS
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|v| v.to_str().ok())
        .find(|v| is_region_code(v))
        .map(str::to_uppercase)
}

/// Region for the current request: cookie, then edge headers, then the
/// configured default.
pub fn detect_region(headers: &HeaderMap, default_region: &str) -> String {
    cookie_region(headers)
        .or_else(|| header_region(headers))
        .unwrap_or_else(|| default_region.to_string())
}

fn region_cookie_value(region: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{REGION_COOKIE}={region}; Path=/; Max-Age={COOKIE_MAX_AGE_SECS}"
    ))
    .ok()
}

fn query_region(query: Option<&str>) -> Option<String> {
    let query = query?;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "region")
        .map(|(_, value)| value)
        .filter(|v| is_region_code(v))
        .map(str::to_uppercase)
}

/// Response middleware: an explicit `?region=XX` override always refreshes the
/// cookie; otherwise a missing or malformed cookie is seeded from the edge
/// country headers or the configured fallback.
pub async fn region_cookie_mw(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let override_region = query_region(req.uri().query());
    let set_region = match &override_region {
        Some(region) => Some(region.clone()),
        None if cookie_region(req.headers()).is_some() => None,
        None => Some(
            header_region(req.headers()).unwrap_or_else(|| state.fallback_region.clone()),
        ),
    };

    let mut res = next.run(req).await;
    // A handler that already set the cookie (the region endpoint) wins.
    let already_set = res
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with("wow_region="));
    if let Some(region) = set_region {
        if !already_set {
            if let Some(cookie) = region_cookie_value(&region) {
                res.headers_mut().append(header::SET_COOKIE, cookie);
            }
        }
    }
    res
}

/// `POST /api/region` - persist an explicit region choice.
pub async fn set_region(body: Bytes) -> Response {
    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap_or_else(|_| json!({}));
    let region = parsed
        .get("region")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_uppercase();

    if !is_region_code(&region) {
        warn!("Rejecting region update: {:?}", region);
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "ok": false, "error": "Invalid region" })),
        )
            .into_response();
    }

    let mut res = Json(json!({ "ok": true, "region": region })).into_response();
    if let Some(cookie) = region_cookie_value(&region) {
        res.headers_mut().append(header::SET_COOKIE, cookie);
    }
    res
}
