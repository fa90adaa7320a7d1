use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use hyper::body::Bytes;
use index_core::index::DEFAULT_INDEX_MERGE_SIZE;
use index_core::{Document, Options, SchemaConfig, SearchEngine};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const SCHEMA: &str = r#"{
  "types": [
    {
      "schema_type": "Note",
      "properties": [
        { "path": "title", "term_match_type": "PREFIX" },
        { "path": "body", "term_match_type": "PREFIX" }
      ]
    }
  ]
}"#;

fn note(namespace: &str, uri: &str, title: &str, body: &str) -> Document {
    let mut properties = BTreeMap::new();
    properties.insert("title".to_string(), title.to_string());
    properties.insert("body".to_string(), body.to_string());
    Document {
        namespace: namespace.to_string(),
        uri: uri.to_string(),
        schema_type: "Note".to_string(),
        properties,
    }
}

fn build_tiny_index(dir: &Path) -> (String, String) {
    let schema_path = dir.join("schema.json");
    fs::write(&schema_path, SCHEMA).unwrap();
    let index_dir = dir.join("index");
    let schema: SchemaConfig = serde_json::from_str(SCHEMA).unwrap();
    let mut engine = SearchEngine::open(Options::new(&index_dir, 100), &schema).unwrap();
    engine.put(&note("blog", "a", "Rust is great", "rust systems programming")).unwrap();
    engine.put(&note("blog", "b", "Learning", "learning rust")).unwrap();
    engine.put(&note("wiki", "c", "Rustic cabins", "")).unwrap();
    engine.persist_to_disk().unwrap();
    (
        index_dir.to_string_lossy().to_string(),
        schema_path.to_string_lossy().to_string(),
    )
}

async fn call(app: Router, req: Request<Body>) -> (StatusCode, Bytes) {
    let resp = tower::ServiceExt::oneshot(app, req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Bytes) {
    call(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

#[tokio::test]
async fn suggest_returns_completions_by_hit_count() {
    let dir = tempdir().unwrap();
    let (index, schema) = build_tiny_index(dir.path());
    let app = server::build_app_with_admin_token(&index, &schema, DEFAULT_INDEX_MERGE_SIZE, None).unwrap();

    let (status, body) = get(app, "/suggest?prefix=ru&k=5").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    let arr = json["suggestions"].as_array().unwrap();
    assert_eq!(arr[0]["text"], "rust");
    assert_eq!(arr[0]["hit_count"], 3);
    assert_eq!(arr[1]["text"], "rustic");
}

#[tokio::test]
async fn suggest_respects_namespaces_and_keeps_query_prefix() {
    let dir = tempdir().unwrap();
    let (index, schema) = build_tiny_index(dir.path());
    let app = server::build_app_with_admin_token(&index, &schema, DEFAULT_INDEX_MERGE_SIZE, None).unwrap();

    let (status, body) = get(app, "/suggest?prefix=cozy%20ru&namespaces=wiki").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    let texts: Vec<&str> = json["suggestions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["text"].as_str().unwrap())
        .collect();
    assert_eq!(texts, vec!["cozy rustic"]);
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let dir = tempdir().unwrap();
    let (index, schema) = build_tiny_index(dir.path());
    let app = server::build_app_with_admin_token(&index, &schema, DEFAULT_INDEX_MERGE_SIZE, None).unwrap();

    let (status, body) = get(app, "/search?term=rust&k=2").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["uri"], "a");
    assert_eq!(arr[1]["uri"], "b");
}

#[tokio::test]
async fn bad_match_type_is_bad_request() {
    let dir = tempdir().unwrap();
    let (index, schema) = build_tiny_index(dir.path());
    let app = server::build_app_with_admin_token(&index, &schema, DEFAULT_INDEX_MERGE_SIZE, None).unwrap();

    let (status, _) = get(app, "/suggest?prefix=ru&match=fuzzy").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_batch_requires_token_and_indexes() {
    let dir = tempdir().unwrap();
    let (index, schema) = build_tiny_index(dir.path());
    let app = server::build_app_with_admin_token(&index, &schema, DEFAULT_INDEX_MERGE_SIZE, Some("secret".into())).unwrap();
    let batch = json!([note("blog", "d", "Zebra", "zebras everywhere")]).to_string();

    let unauthorized = Request::post("/index/batch")
        .header("content-type", "application/json")
        .body(Body::from(batch.clone()))
        .unwrap();
    let (status, _) = call(app.clone(), unauthorized).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let authorized = Request::post("/index/batch")
        .header("content-type", "application/json")
        .header("X-ADMIN-TOKEN", "secret")
        .body(Body::from(batch))
        .unwrap();
    let (status, body) = call(app.clone(), authorized).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["indexed"], 1);

    let (_, body) = get(app.clone(), "/suggest?prefix=zeb").await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["suggestions"].as_array().unwrap().len(), 2);

    let commit = Request::post("/index/commit")
        .header("X-ADMIN-TOKEN", "secret")
        .body(Body::empty())
        .unwrap();
    let (status, _) = call(app, commit).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn storage_reports_terms() {
    let dir = tempdir().unwrap();
    let (index, schema) = build_tiny_index(dir.path());
    let app = server::build_app_with_admin_token(&index, &schema, DEFAULT_INDEX_MERGE_SIZE, None).unwrap();

    let (status, body) = get(app, "/storage").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json["num_lite_terms"].as_u64().unwrap() > 0);
    assert!(json["index_size"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn merge_size_controls_when_batches_reach_main() {
    let dir = tempdir().unwrap();
    let (index, schema) = build_tiny_index(dir.path());
    let app = server::build_app_with_admin_token(&index, &schema, 12, Some("secret".into())).unwrap();
    let batch = json!([note("blog", "d", "one two three four five", "")]).to_string();
    let req = Request::post("/index/batch")
        .header("content-type", "application/json")
        .header("X-ADMIN-TOKEN", "secret")
        .body(Body::from(batch))
        .unwrap();
    let (status, _) = call(app.clone(), req).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = get(app, "/storage").await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["num_lite_hits"], 0);
    assert_eq!(json["num_main_terms"], 13);
}
