use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::StatusCode, routing::{get, post}, Json, Router};
use search_core::{ingest_page, DocId, EngineConfig, IndexBuilder, IndexPaths, Normalizer, Page, SearchEngine, SledStore, Store};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}
fn default_limit() -> usize { 10 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub score: f64,
    pub title: String,
    pub url: Option<String>,
    pub last_modified: Option<String>,
    pub size: Option<u64>,
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SledStore>,
    pub builder: Arc<IndexBuilder<SledStore>>,
    pub engine: Arc<SearchEngine<SledStore>>,
    pub admin_token: Option<String>,
}

type ApiError = (StatusCode, String);

fn internal(err: search_core::Error) -> ApiError {
    tracing::error!(error = %err, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

pub fn build_app(index_dir: String) -> Result<Router> {
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    build_app_with(index_dir, EngineConfig::default(), Normalizer::default(), admin_token)
}

pub fn build_app_with(index_dir: String, config: EngineConfig, normalizer: Normalizer, admin_token: Option<String>) -> Result<Router> {
    let store = Arc::new(SledStore::open(&IndexPaths::new(&index_dir))?);
    let builder = Arc::new(
        IndexBuilder::new(Arc::clone(&store), normalizer.clone()).with_summary_size(config.summary_size),
    );
    let engine = Arc::new(SearchEngine::new(Arc::clone(&store), normalizer, config));
    tracing::info!(index_dir = %index_dir, documents = store.document_count()?, "opened index");
    let app_state = AppState { store, builder, engine, admin_token };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/index/batch", post(index_batch))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let ranked = state.engine.search(&params.q).map_err(internal)?;
    let total_hits = ranked.len();
    let limit = params.limit.max(1).min(state.engine.config().max_results);

    let mut results: Vec<SearchHit> = Vec::new();
    for hit in ranked.into_iter().skip(params.offset).take(limit) {
        let meta = state.store.get_document(hit.doc_id).map_err(internal)?;
        let view = match meta {
            Some(meta) => SearchHit {
                doc_id: hit.doc_id,
                score: hit.score,
                title: meta.title,
                url: Some(meta.url),
                last_modified: meta.last_modified,
                size: Some(meta.size),
            },
            None => SearchHit { doc_id: hit.doc_id, score: hit.score, title: String::new(), url: None, last_modified: None, size: None },
        };
        results.push(view);
    }

    let elapsed = start.elapsed();
    Ok(Json(SearchResponse { query: params.q, took_s: elapsed.as_secs_f64(), total_hits, results }))
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<DocId>) -> Result<Json<serde_json::Value>, ApiError> {
    let Some(meta) = state.store.get_document(doc_id).map_err(internal)? else {
        return Err((StatusCode::NOT_FOUND, "not found".into()));
    };
    let mut keywords = Vec::new();
    for keyword in state.store.get_forward_summary(doc_id).map_err(internal)?.unwrap_or_default() {
        if let Some(word) = state.store.get_word_for_id(keyword.term_id).map_err(internal)? {
            keywords.push(serde_json::json!([word, keyword.frequency]));
        }
    }
    let parents = state.store.get_incoming_links(doc_id).map_err(internal)?;
    Ok(Json(serde_json::json!({
        "doc_id": doc_id,
        "title": meta.title,
        "url": meta.url,
        "last_modified": meta.last_modified,
        "size": meta.size,
        "text": meta.body,
        "keywords": keywords,
        "parent_links": parents,
        "child_links": meta.links,
    })))
}

// --- Admin endpoints ---
async fn index_batch(State(state): State<AppState>, headers: axum::http::HeaderMap, Json(pages): Json<Vec<Page>>) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    let mut doc_ids = Vec::with_capacity(pages.len());
    for page in &pages {
        doc_ids.push(ingest_page(&state.builder, page).map_err(internal)?);
    }
    state.store.flush().map_err(internal)?;
    state.engine.clear_caches();
    tracing::info!(pages = doc_ids.len(), "indexed batch");
    Ok(Json(serde_json::json!({ "indexed": doc_ids.len(), "doc_ids": doc_ids })))
}

fn authorize(state: &AppState, headers: &axum::http::HeaderMap) -> Result<(), ApiError> {
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
