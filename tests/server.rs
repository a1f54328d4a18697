//! HTTP API tests, driven through the router without binding a socket.

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use common::*;
use geotagger::cache::{request_key, ResultCache};
use geotagger::config::EngineConfig;
use geotagger::models::{FootprintMetadata, ProviderRequest, TagResult};
use geotagger::registry::TaggerRegistry;
use geotagger::server::router;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

fn app(cache: ResultCache) -> Router {
    let mut registry = TaggerRegistry::with_builtins();
    register_static(
        &mut registry,
        "LandCover",
        emits("landCover", json!({"classes": []}), "landcover", "GlobCover"),
    );
    router(
        Arc::new(engine_with(registry, EngineConfig::default())),
        cache,
    )
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_raw(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(app(ResultCache::disabled()), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));
}

#[tokio::test]
async fn test_list_taggers() {
    let (status, body) = send(app(ResultCache::disabled()), get("/taggers")).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["taggers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert!(names.contains(&"LandCover"));
    assert!(names.contains(&"Population"));
}

#[tokio::test]
async fn test_post_tag() {
    let (status, body) = send(
        app(ResultCache::disabled()),
        post_json(
            "/tag",
            json!({
                "footprint": SQUARE,
                "timestamp": "2020-01-01T00:00:00Z",
                "taggers": [{"name": "LandCover"}, {"name": "NoSuchTagger"}]
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["content"]["area"].is_number());
    assert_eq!(body["content"]["landCover"], json!({"classes": []}));
    assert_eq!(body["references"]["landcover"]["name"], json!("GlobCover"));
    assert_eq!(body["timestamp"], json!("2020-01-01T00:00:00Z"));
}

#[tokio::test]
async fn test_get_tag_with_query_parameters() {
    let uri = "/tag?footprint=POLYGON((1%2043,2%2043,2%2044,1%2044,1%2043))&taggers=LandCover";
    let (status, body) = send(app(ResultCache::disabled()), get(uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["footprint"], json!(SQUARE));
    assert!(body["content"].get("landCover").is_some());
    assert!(body["timestamp"].is_null());
}

#[tokio::test]
async fn test_missing_footprint_is_bad_request() {
    let (status, body) = send(app(ResultCache::disabled()), get("/tag?taggers=LandCover")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("missing_footprint"));
}

#[tokio::test]
async fn test_invalid_geometry_and_timestamp_are_bad_requests() {
    let (status, body) = send(
        app(ResultCache::disabled()),
        post_json("/tag", json!({"footprint": "POINT(1 2)"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("invalid_geometry"));

    let (status, body) = send(
        app(ResultCache::disabled()),
        post_json("/tag", json!({"footprint": SQUARE, "timestamp": "yesterday"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("bad_request"));
}

#[tokio::test]
async fn test_unparseable_bodies_use_the_error_contract() {
    for raw in [
        "{not json",
        r#"{"footprint":"x","taggers":"LandCover"}"#,
        r#"{"footprint": 5}"#,
    ] {
        let (status, body) = send(app(ResultCache::disabled()), post_raw("/tag", raw)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {:?}", raw);
        assert_eq!(body["error"]["code"], json!("bad_request"), "body {:?}", raw);
        assert!(body["error"]["message"].is_string());
    }
}

#[tokio::test]
async fn test_results_with_failed_taggers_are_not_cached() {
    let tmp = TempDir::new().unwrap();
    let cache = ResultCache::new(Some(tmp.path()));
    let mut registry = TaggerRegistry::with_builtins();
    registry.register("LandCover", |_| Ok(Box::new(FailingTagger)));
    let app = router(
        Arc::new(engine_with(registry, EngineConfig::default())),
        cache.clone(),
    );

    let (status, body) = send(
        app,
        post_json("/tag", json!({"footprint": SQUARE, "taggers": [{"name": "LandCover"}]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["content"].get("landCover").is_none());

    let request: ProviderRequest = ["LandCover"].into_iter().collect();
    let key = request_key(&FootprintMetadata::new(SQUARE), &request);
    assert!(!cache.is_in_cache(&key));
}

#[tokio::test]
async fn test_results_are_cached_and_served_from_cache() {
    let tmp = TempDir::new().unwrap();
    let cache = ResultCache::new(Some(tmp.path()));
    let body = json!({"footprint": SQUARE, "taggers": [{"name": "LandCover"}]});

    let (status, first) = send(app(cache.clone()), post_json("/tag", body.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let metadata = FootprintMetadata::new(SQUARE);
    let request: ProviderRequest = ["LandCover"].into_iter().collect();
    let key = request_key(&metadata, &request);
    assert!(cache.is_in_cache(&key));

    // Tamper with the stored entry to prove the second response comes from it.
    let mut stored: TagResult = cache.read(&key).unwrap().unwrap();
    stored.content.insert("cached".into(), json!(true));
    cache.write(&key, &stored).unwrap();

    let (status, second) = send(app(cache), post_json("/tag", body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["content"]["cached"], json!(true));
    assert_eq!(second["content"]["area"], first["content"]["area"]);
}
