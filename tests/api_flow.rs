use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tower::util::ServiceExt;

use whatson::affiliates::AffiliateConfig;
use whatson::app::{build_router, AppState, WindowCounter};
use whatson::models::{
    Availability, CastMember, Credits, DiscoverMovie, ExternalIds, MediaType, OmdbSummary,
    PersonSummary, ProviderInfo, TitleDetails, TitleSummary,
};
use whatson::omdb::OmdbApi;
use whatson::streaming::{RawProbe, SaShow, StreamingApi, StreamingInfo, StreamingOffer};
use whatson::tmdb::{DiscoverFilter, TmdbApi};

#[derive(Default)]
struct FakeTmdb {
    search_titles: Vec<TitleSummary>,
    search_people: Vec<PersonSummary>,
    details: HashMap<i64, TitleDetails>,
    credits: HashMap<i64, Credits>,
    external: HashMap<i64, ExternalIds>,
    providers: HashMap<i64, Availability>,
    people: HashMap<i64, PersonSummary>,
    combined: HashMap<i64, Vec<TitleSummary>>,
    discover: Vec<DiscoverMovie>,
}

#[async_trait::async_trait]
impl TmdbApi for FakeTmdb {
    async fn search_multi(&self, _query: &str) -> anyhow::Result<Vec<TitleSummary>> {
        Ok(self.search_titles.clone())
    }

    async fn search_person(&self, _query: &str) -> anyhow::Result<Vec<PersonSummary>> {
        Ok(self.search_people.clone())
    }

    async fn details(&self, _media: MediaType, id: i64) -> anyhow::Result<TitleDetails> {
        self.details
            .get(&id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("missing details fixture {}", id))
    }

    async fn credits(&self, _media: MediaType, id: i64) -> anyhow::Result<Credits> {
        self.credits
            .get(&id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("missing credits fixture {}", id))
    }

    async fn external_ids(&self, _media: MediaType, id: i64) -> anyhow::Result<ExternalIds> {
        self.external
            .get(&id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("missing external ids fixture {}", id))
    }

    async fn watch_providers(
        &self,
        _media: MediaType,
        id: i64,
        _region: &str,
    ) -> anyhow::Result<Option<Availability>> {
        Ok(self.providers.get(&id).cloned())
    }

    async fn person(&self, id: i64) -> anyhow::Result<PersonSummary> {
        self.people
            .get(&id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("missing person fixture {}", id))
    }

    async fn person_combined_credits(&self, id: i64) -> anyhow::Result<Vec<TitleSummary>> {
        Ok(self.combined.get(&id).cloned().unwrap_or_default())
    }

    async fn discover_movies(
        &self,
        _filter: &DiscoverFilter,
        _page: u32,
    ) -> anyhow::Result<Vec<DiscoverMovie>> {
        Ok(self.discover.clone())
    }
}

#[derive(Default)]
struct FakeOmdb {
    summary: Option<OmdbSummary>,
}

#[async_trait::async_trait]
impl OmdbApi for FakeOmdb {
    async fn summary_by_imdb_id(&self, _imdb_id: &str) -> anyhow::Result<Option<OmdbSummary>> {
        Ok(self.summary.clone())
    }
}

#[derive(Default)]
struct FakeStreaming {
    show: Option<SaShow>,
    configured: bool,
}

#[async_trait::async_trait]
impl StreamingApi for FakeStreaming {
    async fn show_by_imdb_id(
        &self,
        _imdb_id: &str,
        _country: &str,
    ) -> anyhow::Result<Option<SaShow>> {
        Ok(self.show.clone())
    }

    async fn raw_show(
        &self,
        _imdb_id: &str,
        _country: Option<&str>,
        _series_granularity: &str,
        _output_language: &str,
    ) -> anyhow::Result<RawProbe> {
        Ok(RawProbe {
            ok: true,
            status: 200,
            duration_ms: 12,
            url: "https://fake/shows/tt1".to_string(),
            info_type: "object",
            body: serde_json::json!({ "streamingInfo": {} }),
        })
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}

fn title_summary(id: i64, title: &str) -> TitleSummary {
    TitleSummary {
        id,
        media_type: MediaType::Movie,
        title: title.to_string(),
        overview: String::new(),
        poster_path: None,
        release_year: Some(1995),
        providers: None,
    }
}

fn title_details(id: i64, title: &str) -> TitleDetails {
    TitleDetails {
        id,
        media_type: MediaType::Movie,
        title: title.to_string(),
        overview: "overview".to_string(),
        poster_path: Some("/poster.jpg".to_string()),
        release_year: Some(1995),
        genres: None,
        runtime: Some(170),
        episode_run_time: None,
        release_date: Some("1995-12-15".to_string()),
        first_air_date: None,
    }
}

fn cast(names: &[(&str, i64)]) -> Credits {
    Credits {
        cast: names
            .iter()
            .map(|(name, id)| CastMember {
                id: *id,
                name: name.to_string(),
                character: Some("Self".to_string()),
                profile_path: None,
            })
            .collect(),
        crew: Vec::new(),
    }
}

fn offer(service: &str, streaming_type: &str, link: &str) -> StreamingOffer {
    StreamingOffer {
        service: Some(service.to_string()),
        streaming_type: Some(streaming_type.to_string()),
        link: Some(link.to_string()),
        video_link: None,
        quality: None,
    }
}

fn app_with(tmdb: FakeTmdb, omdb: FakeOmdb, streaming: FakeStreaming) -> Router {
    let state = AppState {
        tmdb: Arc::new(tmdb),
        omdb: Arc::new(omdb),
        streaming: Arc::new(streaming),
        affiliates: Arc::new(AffiliateConfig {
            amazon_tag_us: Some("wow-21".to_string()),
            amazon_tag_gb: None,
            apple_at: None,
            paramount_url_us: None,
            paramount_url_gb: None,
            now_affiliate_gb: None,
        }),
        default_region: "US".to_string(),
        fallback_region: "GB".to_string(),
        rate_limits: Arc::new(tokio::sync::Mutex::new(HashMap::new())),
        global_limit: Arc::new(tokio::sync::Mutex::new(WindowCounter {
            window: 0,
            count: 0,
        })),
    };
    build_router(state)
}

fn default_app() -> Router {
    app_with(
        FakeTmdb::default(),
        FakeOmdb::default(),
        FakeStreaming::default(),
    )
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let res = app
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn search_requires_a_query() {
    let (status, body) = get_json(default_app(), "/api/search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing query parameter");

    let (status, _) = get_json(default_app(), "/api/search?query=%20%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_attaches_providers_per_title() {
    let mut tmdb = FakeTmdb {
        search_titles: vec![title_summary(1, "Heat"), title_summary(2, "Ronin")],
        ..FakeTmdb::default()
    };
    tmdb.providers.insert(
        1,
        Availability {
            flatrate: Some(vec![ProviderInfo {
                provider_id: 8,
                provider_name: "Netflix".to_string(),
                logo_path: None,
            }]),
            buy: None,
            rent: None,
        },
    );
    let app = app_with(tmdb, FakeOmdb::default(), FakeStreaming::default());

    let (status, body) = get_json(app, "/api/search?query=heat").await;
    assert_eq!(status, StatusCode::OK);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);

    let heat = results.iter().find(|r| r["id"] == 1).unwrap();
    assert_eq!(heat["title"], "Heat");
    assert_eq!(heat["media_type"], "movie");
    assert_eq!(
        heat["providers"]["flatrate"][0]["provider_name"],
        "Netflix"
    );
    let ronin = results.iter().find(|r| r["id"] == 2).unwrap();
    assert!(ronin.get("providers").is_none());
}

#[tokio::test]
async fn search_only_person_returns_people() {
    let tmdb = FakeTmdb {
        search_people: vec![PersonSummary {
            id: 4724,
            name: "Kevin Bacon".to_string(),
            profile_path: Some("/kb.jpg".to_string()),
        }],
        ..FakeTmdb::default()
    };
    let app = app_with(tmdb, FakeOmdb::default(), FakeStreaming::default());

    let (status, body) = get_json(app, "/api/search?query=bacon&only=person").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"][0]["name"], "Kevin Bacon");
    assert!(body["results"][0].get("media_type").is_none());
}

#[tokio::test]
async fn title_rejects_bad_type_or_id() {
    let (status, body) = get_json(default_app(), "/api/title/book/603").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid type or id");

    let (status, _) = get_json(default_app(), "/api/title/movie/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn title_merges_upstream_payloads() {
    let mut tmdb = FakeTmdb::default();
    tmdb.details.insert(603, title_details(603, "The Matrix"));
    tmdb.credits
        .insert(603, cast(&[("Keanu Reeves", 6384), ("Carrie-Anne Moss", 530)]));
    tmdb.external.insert(
        603,
        ExternalIds {
            imdb_id: Some("tt0133093".to_string()),
        },
    );
    tmdb.providers.insert(
        603,
        Availability {
            flatrate: Some(vec![ProviderInfo {
                provider_id: 8,
                provider_name: "Netflix".to_string(),
                logo_path: None,
            }]),
            buy: None,
            rent: None,
        },
    );

    let omdb = FakeOmdb {
        summary: Some(OmdbSummary {
            imdb_id: Some("tt0133093".to_string()),
            title: Some("The Matrix".to_string()),
            imdb_rating: Some("8.7".to_string()),
            ..OmdbSummary::default()
        }),
    };
    let streaming = FakeStreaming {
        show: Some(SaShow {
            id: None,
            imdb_id: Some("tt0133093".to_string()),
            tmdb_id: None,
            title: Some("The Matrix".to_string()),
            overview: None,
            kind: Some("movie".to_string()),
            year: Some(1999),
            poster_path: None,
            streaming_info: Some(StreamingInfo::Flat(vec![
                offer("netflix", "subscription", "https://netflix/watch"),
                offer("Amazon Prime Video", "subscription", "https://prime/watch"),
            ])),
        }),
        configured: true,
    };
    let app = app_with(tmdb, omdb, streaming);

    let (status, body) = get_json(app, "/api/title/movie/603?preferred=prime").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["details"]["title"], "The Matrix");
    assert_eq!(body["details"]["release_year"], 1995);
    assert_eq!(body["credits"]["cast"][0]["name"], "Keanu Reeves");
    assert_eq!(body["providers"]["flatrate"][0]["provider_id"], 8);
    assert_eq!(body["external"]["imdb_id"], "tt0133093");
    assert_eq!(body["imdbSummary"]["imdbRating"], "8.7");
    assert_eq!(body["offers"].as_array().unwrap().len(), 2);
    // preferred=prime wins over the netflix subscription listed first
    assert_eq!(body["bestOffer"]["link"], "https://prime/watch");
}

#[tokio::test]
async fn title_without_imdb_id_skips_enrichment() {
    let mut tmdb = FakeTmdb::default();
    tmdb.details.insert(42, title_details(42, "Obscure"));
    tmdb.credits.insert(42, cast(&[]));
    tmdb.external.insert(42, ExternalIds { imdb_id: None });

    let omdb = FakeOmdb {
        summary: Some(OmdbSummary::default()),
    };
    let app = app_with(tmdb, omdb, FakeStreaming::default());

    let (status, body) = get_json(app, "/api/title/movie/42").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("imdbSummary").is_none());
    assert!(body.get("streamingAvailability").is_none());
    assert_eq!(body["offers"].as_array().unwrap().len(), 0);
    assert!(body.get("bestOffer").is_none());
}

fn seven_tmdb() -> FakeTmdb {
    let mut tmdb = FakeTmdb {
        discover: vec![DiscoverMovie {
            id: 100,
            title: "Apollo 13".to_string(),
            poster_path: Some("/a13.jpg".to_string()),
            vote_average: Some(7.7),
            release_year: Some(1995),
        }],
        ..FakeTmdb::default()
    };
    tmdb.people.insert(
        4724,
        PersonSummary {
            id: 4724,
            name: "Kevin Bacon".to_string(),
            profile_path: Some("/kb.jpg".to_string()),
        },
    );
    // Apollo 13 without the target in the cast keeps the round non-trivial.
    tmdb.credits
        .insert(100, cast(&[("Tom Hanks", 31), ("Bill Paxton", 2167)]));
    tmdb
}

#[tokio::test]
async fn seven_init_defaults_to_kevin_bacon() {
    let app = app_with(seven_tmdb(), FakeOmdb::default(), FakeStreaming::default());

    let (status, body) = get_json(app, "/api/game/seven/init?seed=7").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["seed"], 7);
    assert_eq!(body["moves"], 7);
    assert_eq!(body["start"]["kind"], "title");
    assert_eq!(body["start"]["id"], 100);
    assert_eq!(body["start"]["media_type"], "movie");
    assert_eq!(body["target"]["kind"], "person");
    assert_eq!(body["target"]["name"], "Kevin Bacon");
}

#[tokio::test]
async fn seven_init_honors_an_explicit_trivial_start() {
    let mut tmdb = seven_tmdb();
    tmdb.details.insert(200, title_details(200, "Footloose"));
    // The requested start stars the target; it must not be re-rolled.
    tmdb.credits
        .insert(200, cast(&[("Kevin Bacon", 4724)]));
    let app = app_with(tmdb, FakeOmdb::default(), FakeStreaming::default());

    let (status, body) = get_json(app, "/api/game/seven/init?startId=200").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["start"]["id"], 200);
    assert_eq!(body["start"]["title"], "Footloose");
}

#[tokio::test]
async fn seven_init_accepts_a_title_target() {
    let mut tmdb = seven_tmdb();
    tmdb.details.insert(550, title_details(550, "Fight Club"));
    let app = app_with(tmdb, FakeOmdb::default(), FakeStreaming::default());

    let (status, body) = get_json(
        app,
        "/api/game/seven/init?seed=1&targetKind=title&targetId=550&targetMediaType=movie",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["target"]["kind"], "title");
    assert_eq!(body["target"]["title"], "Fight Club");
}

#[tokio::test]
async fn seven_expand_truncates_the_cast() {
    let mut tmdb = FakeTmdb::default();
    let names: Vec<(String, i64)> = (0..25).map(|i| (format!("Actor {i}"), i)).collect();
    let pairs: Vec<(&str, i64)> = names.iter().map(|(n, i)| (n.as_str(), *i)).collect();
    tmdb.credits.insert(9, cast(&pairs));
    let app = app_with(tmdb, FakeOmdb::default(), FakeStreaming::default());

    let (status, body) = get_json(app, "/api/game/seven/expand?kind=title&id=9&type=movie").await;
    assert_eq!(status, StatusCode::OK);
    let nodes = body["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 20);
    assert_eq!(nodes[0]["kind"], "person");
    assert_eq!(nodes[0]["character"], "Self");
}

#[tokio::test]
async fn seven_expand_lists_titles_for_a_person() {
    let mut tmdb = FakeTmdb::default();
    tmdb.combined.insert(
        31,
        vec![
            title_summary(100, "Apollo 13"),
            title_summary(101, "Big"),
            title_summary(102, "Cast Away"),
        ],
    );
    let app = app_with(tmdb, FakeOmdb::default(), FakeStreaming::default());

    let (status, body) = get_json(app, "/api/game/seven/expand?kind=person&id=31&limit=2").await;
    assert_eq!(status, StatusCode::OK);
    let nodes = body["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0]["kind"], "title");
    assert_eq!(nodes[0]["title"], "Apollo 13");
}

#[tokio::test]
async fn seven_expand_validates_params() {
    let (status, body) = get_json(default_app(), "/api/game/seven/expand?kind=title").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid params");

    let (status, body) = get_json(default_app(), "/api/game/seven/expand?kind=studio&id=1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Unknown kind");
}

#[tokio::test]
async fn seven_expand_swallows_upstream_failures() {
    // No credits fixture: the lookup fails and the frontier comes back empty.
    let (status, body) = get_json(default_app(), "/api/game/seven/expand?kind=title&id=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["nodes"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn pymr_rejects_unknown_categories() {
    let (status, body) = get_json(default_app(), "/api/games/pymr/deck?category=western").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Unknown category");

    let (status, _) = get_json(default_app(), "/api/games/pymr/deck").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn pymr_deck_is_cleaned_rounded_and_capped() {
    let mut discover = Vec::new();
    for i in 0..15 {
        discover.push(DiscoverMovie {
            id: i,
            title: format!("Movie {i}"),
            poster_path: None,
            vote_average: Some(7.345),
            release_year: Some(2000),
        });
    }
    discover.push(DiscoverMovie {
        id: 900,
        title: String::new(), // dropped: no title
        poster_path: None,
        vote_average: Some(5.0),
        release_year: None,
    });
    discover.push(DiscoverMovie {
        id: 901,
        title: "Unrated".to_string(), // dropped: no rating
        poster_path: None,
        vote_average: None,
        release_year: None,
    });
    let tmdb = FakeTmdb {
        discover,
        ..FakeTmdb::default()
    };
    let app = app_with(tmdb, FakeOmdb::default(), FakeStreaming::default());

    let (status, body) = get_json(app, "/api/games/pymr/deck?category=comedy").await;
    assert_eq!(status, StatusCode::OK);
    let deck = body["deck"].as_array().unwrap();
    // 15 valid movies per fake page, three pages, capped at 30.
    assert_eq!(deck.len(), 30);
    for card in deck {
        assert_ne!(card["id"], 900);
        assert_ne!(card["id"], 901);
        assert_eq!(card["vote_average"], 7.3);
    }
}

#[tokio::test]
async fn region_post_sets_the_cookie() {
    let app = default_app();
    let res = app
        .oneshot(
            Request::post("/api/region")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"region": "fr"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let cookie = res
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(cookie.starts_with("wow_region=FR"));
    assert!(cookie.contains("Max-Age=31536000"));
}

#[tokio::test]
async fn region_post_rejects_bad_codes() {
    for body in [r#"{"region": "EUR"}"#, r#"{}"#, "not json"] {
        let app = default_app();
        let res = app
            .oneshot(
                Request::post("/api/region")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn region_middleware_seeds_the_cookie() {
    // No cookie and no hints: the fallback region is written.
    let res = default_app()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let cookie = res
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(cookie.starts_with("wow_region=GB"));

    // Edge country header wins over the fallback.
    let res = default_app()
        .oneshot(
            Request::get("/health")
                .header("x-vercel-ip-country", "us")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let cookie = res
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(cookie.starts_with("wow_region=US"));

    // An existing cookie is left alone.
    let res = default_app()
        .oneshot(
            Request::get("/health")
                .header(header::COOKIE, "wow_region=FR")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(res.headers().get(header::SET_COOKIE).is_none());

    // A query override refreshes it even when a cookie exists.
    let res = default_app()
        .oneshot(
            Request::get("/health?region=de")
                .header(header::COOKIE, "wow_region=FR")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let cookie = res
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(cookie.starts_with("wow_region=DE"));
}

#[tokio::test]
async fn go_redirects_to_the_affiliate_url() {
    let res = default_app()
        .oneshot(
            Request::get("/go/appletv?id=603&type=movie")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(
        res.headers().get(header::LOCATION).unwrap(),
        "https://tv.apple.com/"
    );
}

#[tokio::test]
async fn go_prime_works_without_a_title_id() {
    let res = default_app()
        .oneshot(Request::get("/go/prime").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(
        res.headers().get(header::LOCATION).unwrap(),
        "https://www.amazon.com/gp/video/storefront?tag=wow-21"
    );
}

#[tokio::test]
async fn go_validates_and_404s_unmapped_providers() {
    let (status, body) = get_json(default_app(), "/go/appletv").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid params");

    let (status, body) = get_json(default_app(), "/go/netflix?id=603").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No affiliate mapping for provider/region");
}

#[tokio::test]
async fn analytics_always_acknowledges() {
    for body in [r#"{"game": "seven-degrees", "score": 4}"#, "garbage"] {
        let app = default_app();
        let res = app
            .oneshot(
                Request::post("/api/analytics/log")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["ok"], true);
    }
}

#[tokio::test]
async fn debug_streaming_requires_a_resolvable_title() {
    let (status, _) = get_json(default_app(), "/api/debug/streaming").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut tmdb = FakeTmdb::default();
    tmdb.external.insert(42, ExternalIds { imdb_id: None });
    let app = app_with(tmdb, FakeOmdb::default(), FakeStreaming::default());
    let (status, body) = get_json(app, "/api/debug/streaming?type=movie&id=42").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No imdb_id found for given TMDB type/id.");
}

#[tokio::test]
async fn debug_streaming_summarizes_offers() {
    let streaming = FakeStreaming {
        show: Some(SaShow {
            id: None,
            imdb_id: Some("tt0133093".to_string()),
            tmdb_id: None,
            title: Some("The Matrix".to_string()),
            overview: None,
            kind: Some("movie".to_string()),
            year: Some(1999),
            poster_path: None,
            streaming_info: Some(StreamingInfo::Flat(vec![
                offer("netflix", "subscription", "https://netflix/watch"),
                offer("prime", "rent", "https://prime/rent"),
            ])),
        }),
        configured: true,
    };
    let app = app_with(FakeTmdb::default(), FakeOmdb::default(), streaming);

    let (status, body) = get_json(app, "/api/debug/streaming?imdbId=tt0133093&country=gb").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["country"], "GB");
    assert_eq!(body["hasData"], true);
    assert_eq!(body["services"][0]["count"], 2);
    assert_eq!(body["services"][0]["services"][0], "netflix");
}

#[tokio::test]
async fn debug_raw_needs_configuration_and_an_id() {
    let (status, body) = get_json(default_app(), "/api/debug/streaming/raw").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "imdbId is required");

    let (status, _) = get_json(default_app(), "/api/debug/streaming/raw?imdbId=tt1").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let streaming = FakeStreaming {
        show: None,
        configured: true,
    };
    let app = app_with(FakeTmdb::default(), FakeOmdb::default(), streaming);
    let (status, body) = get_json(app, "/api/debug/streaming/raw?imdbId=tt1&country=gb").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], 200);
    assert_eq!(body["infoType"], "object");
    assert_eq!(body["request"]["country"], "GB");
}

#[tokio::test]
async fn rate_limit_kicks_in_for_a_single_client() {
    let app = default_app();
    let mut limited = false;
    // Per-IP budget is 150 per minute including burst.
    for _ in 0..160 {
        let res = app
            .clone()
            .oneshot(
                Request::get("/health")
                    .header("x-real-ip", "203.0.113.9")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        if res.status() == StatusCode::TOO_MANY_REQUESTS {
            limited = true;
            break;
        }
    }
    assert!(limited, "expected a 429 after exhausting the per-IP budget");
}
