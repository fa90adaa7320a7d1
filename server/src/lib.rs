use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use index_core::engine::SearchResult;
use index_core::{
    Document, Error, IndexStorageInfo, Options, SchemaConfig, ScoringSpec, SearchEngine, SuggestionSpec,
    TermMatchType,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

type ApiError = (StatusCode, String);

#[derive(Deserialize)]
pub struct SuggestParams {
    pub prefix: String,
    #[serde(default = "default_k")]
    pub k: i32,
    #[serde(default, rename = "match")]
    pub match_type: Option<String>,
    /// Comma-separated namespace names; empty means all.
    #[serde(default)]
    pub namespaces: Option<String>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub term: String,
    #[serde(default = "default_k")]
    pub k: i32,
    #[serde(default, rename = "match")]
    pub match_type: Option<String>,
    #[serde(default)]
    pub namespaces: Option<String>,
}

fn default_k() -> i32 {
    10
}

#[derive(Serialize)]
pub struct Suggestion {
    pub text: String,
    pub hit_count: u32,
}

#[derive(Serialize)]
pub struct SuggestResponse {
    pub prefix: String,
    pub took_s: f64,
    pub suggestions: Vec<Suggestion>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub term: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchResult>,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RwLock<SearchEngine>>,
    pub admin_token: Option<String>,
}

/// Builds the router over the index in `index_dir`, taking the admin
/// token from `ADMIN_TOKEN`.
pub fn build_app(index_dir: &str, schema_path: &str, merge_size: u32) -> Result<Router> {
    build_app_with_admin_token(index_dir, schema_path, merge_size, std::env::var("ADMIN_TOKEN").ok())
}

pub fn build_app_with_admin_token(
    index_dir: &str,
    schema_path: &str,
    merge_size: u32,
    admin_token: Option<String>,
) -> Result<Router> {
    let schema = SchemaConfig::from_json_file(Path::new(schema_path))?;
    let engine = SearchEngine::open(Options::new(index_dir, merge_size), &schema)?;
    let app_state = AppState {
        engine: Arc::new(RwLock::new(engine)),
        admin_token,
    };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new()
                    .allow_origin(AllowOrigin::list(origins))
                    .allow_methods(Any)
                    .allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/suggest", get(suggest_handler))
        .route("/search", get(search_handler))
        .route("/storage", get(storage_handler))
        .route("/index/batch", post(index_batch))
        .route("/index/commit", post(index_commit))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);
    Ok(app)
}

pub async fn suggest_handler(
    State(state): State<AppState>,
    Query(params): Query<SuggestParams>,
) -> Result<Json<SuggestResponse>, ApiError> {
    let start = std::time::Instant::now();
    let match_type = parse_match_type(params.match_type.as_deref(), TermMatchType::Prefix)?;
    let namespaces = split_namespaces(params.namespaces.as_deref());
    let spec = SuggestionSpec::new(params.prefix.clone(), params.k.min(100), match_type);
    let terms = state.engine.read().suggest(&spec, namespaces.as_slice()).map_err(api_error)?;
    let suggestions = terms
        .into_iter()
        .map(|t| Suggestion {
            text: t.content,
            hit_count: t.hit_count,
        })
        .collect();
    Ok(Json(SuggestResponse {
        prefix: params.prefix,
        took_s: start.elapsed().as_secs_f64(),
        suggestions,
    }))
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let match_type = parse_match_type(params.match_type.as_deref(), TermMatchType::ExactOnly)?;
    let namespaces = split_namespaces(params.namespaces.as_deref());
    let k = params.k.clamp(1, 100) as usize;
    let results = state
        .engine
        .read()
        .search(&params.term, match_type, k, namespaces.as_slice(), &ScoringSpec::with_match_type(match_type))
        .map_err(api_error)?;
    Ok(Json(SearchResponse {
        term: params.term,
        took_s: start.elapsed().as_secs_f64(),
        total_hits: results.len(),
        results,
    }))
}

pub async fn storage_handler(State(state): State<AppState>) -> Result<Json<IndexStorageInfo>, ApiError> {
    state.engine.read().storage_info().map(Json).map_err(api_error)
}

// --- Admin endpoints ---
async fn index_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(docs): Json<Vec<Document>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    let mut engine = state.engine.write();
    let mut document_ids = Vec::with_capacity(docs.len());
    for doc in &docs {
        document_ids.push(engine.put(doc).map_err(api_error)?);
    }
    tracing::info!(count = document_ids.len(), "indexed batch");
    Ok(Json(serde_json::json!({ "indexed": document_ids.len(), "document_ids": document_ids })))
}

async fn index_commit(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    let engine = state.engine.read();
    engine.persist_to_disk().map_err(api_error)?;
    Ok(Json(serde_json::json!({ "committed": true, "documents": engine.num_documents() })))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}

fn api_error(err: Error) -> ApiError {
    let status = match &err {
        Error::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::FailedPrecondition(_) => StatusCode::PRECONDITION_FAILED,
        Error::ResourceExhausted(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!(error = %err, "request failed");
    }
    (status, err.to_string())
}

fn parse_match_type(raw: Option<&str>, default: TermMatchType) -> Result<TermMatchType, ApiError> {
    match raw.map(|s| s.to_ascii_lowercase()).as_deref() {
        None | Some("") => Ok(default),
        Some("exact") | Some("exact_only") => Ok(TermMatchType::ExactOnly),
        Some("prefix") => Ok(TermMatchType::Prefix),
        Some(other) => Err((StatusCode::BAD_REQUEST, format!("unknown match type '{other}'"))),
    }
}

fn split_namespaces(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
