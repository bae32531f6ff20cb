use anyhow::Result;
use axum::{http::{HeaderMap, StatusCode}, routing::{get, post}, Router};
use docqa_core::content::{content_storage, ContentStorage};
use docqa_core::{IndexConfig, RecordStore, RetrievalService, SledStore};
use std::fmt::Display;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod answer;
pub mod config;
pub mod records;
pub mod retrieval;

use answer::AnswerGenerator;
use config::Config;

pub type ApiError = (StatusCode, String);

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SledStore>,
    pub retrieval: RetrievalService,
    pub content: Arc<dyn ContentStorage>,
    pub answers: Arc<AnswerGenerator>,
    pub admin_token: Option<String>,
}

impl AppState {
    pub fn new(store: Arc<SledStore>, config: &Config) -> Result<Self> {
        let records: Arc<dyn RecordStore> = store.clone();
        let retrieval = RetrievalService::new(records, IndexConfig { max_features: config.max_features, ..IndexConfig::default() });
        let content = content_storage(config.content_backend, store.clone(), &config.content_root);
        let answers = Arc::new(AnswerGenerator::from_config(&config.llm)?);
        Ok(Self { store, retrieval, content, answers, admin_token: config.admin_token.clone() })
    }
}

/// Open the record store at `db_path` and build the router around it.
pub fn build_app(db_path: &Path, config: &Config) -> Result<Router> {
    let store = Arc::new(SledStore::open(db_path)?);
    let state = AppState::new(store, config)?;
    Ok(router(state, config.cors_allow_origin.as_deref()))
}

pub fn router(state: AppState, cors_allow_origin: Option<&str>) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/tags", get(records::list_tags))
        .route("/api/tags/:id", get(records::get_tag))
        .route("/api/documents", get(records::list_documents).post(records::create_document))
        .route(
            "/api/documents/:id",
            get(records::get_document).put(records::update_document).delete(records::delete_document),
        )
        .route("/api/questions", get(records::list_questions).post(records::create_question))
        .route("/api/questions/:id", get(records::get_question))
        .route("/api/questions/:id/relevant", get(retrieval::relevant_for_question))
        .route("/api/questions/:id/related", post(retrieval::attach_related))
        .route("/api/questions/:id/answer", post(retrieval::answer_existing))
        .route("/api/retrieve", post(retrieval::retrieve))
        .route("/api/ask", post(retrieval::ask))
        .route("/api/refresh-index", post(retrieval::refresh_index))
        .with_state(state)
        .layer(cors_layer(cors_allow_origin))
        .layer(TraceLayer::new_for_http())
}

/// CORS from a comma-separated origin list; any origin when unset or unparsable.
fn cors_layer(allow_origin: Option<&str>) -> CorsLayer {
    let origins: Vec<_> = allow_origin
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();
    if origins.is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
    }
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

fn internal<E: Display>(err: E) -> ApiError {
    tracing::error!(%err, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

fn not_found(kind: &str, id: u64) -> ApiError {
    (StatusCode::NOT_FOUND, format!("{kind} {id} not found"))
}

fn bad_request(msg: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, msg.into())
}
