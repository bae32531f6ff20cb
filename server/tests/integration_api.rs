use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use docqa_core::{NewDocument, SledStore};
use docqa_server::config::Config;
use docqa_server::{router, AppState};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const TOKEN: &str = "secret";

fn seeded_store() -> Arc<SledStore> {
    let store = Arc::new(SledStore::temporary().unwrap());
    let tech = store.get_or_create_tag("Technology").unwrap();
    for (title, content) in [
        ("Machine Learning", "Machine learning is a type of artificial intelligence."),
        ("Cloud Computing", "Cloud computing provides computing resources over the internet."),
        ("AI Overview", "Artificial intelligence is the simulation of human intelligence."),
    ] {
        store
            .create_document(NewDocument { title: title.into(), content: content.into(), tags: vec![tech.id], ..Default::default() })
            .unwrap();
    }
    store
}

fn app_with(store: Arc<SledStore>, config: Config) -> Router {
    let state = AppState::new(store, &config).unwrap();
    router(state, None)
}

fn app(store: Arc<SledStore>) -> Router {
    app_with(store, Config { admin_token: Some(TOKEN.into()), ..Config::default() })
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>, token: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        builder = builder.header("X-ADMIN-TOKEN", t);
    }
    let req = match body {
        Some(json) => builder.header("content-type", "application/json").body(Body::from(json.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn retrieve_returns_ranked_results() {
    let app = app(seeded_store());
    let (status, json) = call(&app, "POST", "/api/retrieve", Some(json!({"question": "machine learning"})), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["question"], "machine learning");
    assert_eq!(json["total_documents"], 3);
    let results = json["results"].as_array().unwrap();
    assert!(!results.is_empty() && results.len() <= 3);
    assert_eq!(results[0]["title"], "Machine Learning");
    assert!(results[0]["score"].as_f64().unwrap() > 0.0);
    assert!(results[0]["content_preview"].as_str().unwrap().starts_with("Machine learning"));
}

#[tokio::test]
async fn retrieve_respects_top_k() {
    let app = app(seeded_store());
    let (status, json) = call(&app, "POST", "/api/retrieve", Some(json!({"question": "computing", "top_k": 1})), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["results"].as_array().unwrap().len() <= 1);
}

#[tokio::test]
async fn retrieve_rejects_invalid_requests() {
    let app = app(seeded_store());
    let (status, _) = call(&app, "POST", "/api/retrieve", Some(json!({})), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = call(&app, "POST", "/api/retrieve", Some(json!({"question": "q", "top_k": 0})), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = call(&app, "POST", "/api/retrieve", Some(json!({"question": "q", "min_score": 2.0})), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn retrieve_on_empty_store_is_empty() {
    let app = app(Arc::new(SledStore::temporary().unwrap()));
    let (status, json) = call(&app, "POST", "/api/retrieve", Some(json!({"question": "anything"})), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["results"], json!([]));
    assert_eq!(json["total_documents"], 0);
}

#[tokio::test]
async fn refresh_index_reports_count() {
    let app = app(seeded_store());
    let (status, json) = call(&app, "POST", "/api/refresh-index", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["documents_indexed"], 3);
    assert_eq!(json["message"], "Index refreshed successfully");
}

#[tokio::test]
async fn ask_creates_answered_question() {
    let store = seeded_store();
    let app = app(store.clone());
    let (status, json) = call(&app, "POST", "/api/ask", Some(json!({"question": "What is artificial intelligence?"})), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(json["answer"].as_str().unwrap().contains("simulated response"));
    assert!(json["answered_at"].is_string());
    let related = json["related_documents"].as_array().unwrap();
    assert!(!related.is_empty() && related.len() <= 3);

    let questions = store.list_questions().unwrap();
    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0].text, "What is artificial intelligence?");
    assert!(questions[0].has_answer());
    assert_eq!(json["question_id"], questions[0].id);
}

#[tokio::test]
async fn ask_without_matches_uses_fallback_answer() {
    let app = app(seeded_store());
    let (status, json) = call(&app, "POST", "/api/ask", Some(json!({"question": "xyz qwerty"})), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["answer"], "No relevant documents found to answer this question.");
    assert_eq!(json["related_documents"], json!([]));
}

#[tokio::test]
async fn ask_surfaces_generation_failure() {
    let store = seeded_store();
    let mut config = Config::default();
    config.llm.use_fake = false;
    config.llm.endpoint = "http://127.0.0.1:9/generate".into();
    config.llm.timeout = Duration::from_secs(2);
    let app = app_with(store.clone(), config);

    let (status, _) = call(&app, "POST", "/api/ask", Some(json!({"question": "What is machine learning?"})), None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let questions = store.list_questions().unwrap();
    assert_eq!(questions.len(), 1);
    assert!(!questions[0].has_answer());
}

#[tokio::test]
async fn ask_rejects_blank_question() {
    let app = app(seeded_store());
    let (status, _) = call(&app, "POST", "/api/ask", Some(json!({"question": "   "})), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn lists_documents_and_tags() {
    let app = app(seeded_store());
    let (status, json) = call(&app, "GET", "/api/documents", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 3);
    assert_eq!(json["results"][0]["tags"][0]["name"], "Technology");

    let id = json["results"][0]["id"].as_u64().unwrap();
    let (status, doc) = call(&app, "GET", &format!("/api/documents/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["content_reference"], "db");

    let (status, json) = call(&app, "GET", "/api/tags", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["results"][0]["document_count"], 3);

    let (status, _) = call(&app, "GET", "/api/documents/999999", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_endpoints_require_token() {
    let app = app(seeded_store());
    let body = json!({"title": "New", "content": "Quantum computing uses qubits."});
    let (status, _) = call(&app, "POST", "/api/documents", Some(body.clone()), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = call(&app, "POST", "/api/documents", Some(body), Some("wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn document_changes_refresh_the_index() {
    let app = app(seeded_store());
    let (_, before) = call(&app, "POST", "/api/retrieve", Some(json!({"question": "quantum qubits", "min_score": 0.1})), None).await;
    assert_eq!(before["results"], json!([]));

    let body = json!({"title": "Quantum", "content": "Quantum computing uses qubits.", "tags": ["Physics"]});
    let (status, created) = call(&app, "POST", "/api/documents", Some(body), Some(TOKEN)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["tags"][0]["name"], "Physics");
    let id = created["id"].as_u64().unwrap();

    let (_, after) = call(&app, "POST", "/api/retrieve", Some(json!({"question": "quantum qubits", "min_score": 0.1})), None).await;
    assert_eq!(after["results"][0]["document_id"], id);
    assert_eq!(after["total_documents"], 4);

    let update = json!({"title": "Quantum", "content": "Entanglement experiments."});
    let (status, _) = call(&app, "PUT", &format!("/api/documents/{id}"), Some(update), Some(TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    let (_, after) = call(&app, "POST", "/api/retrieve", Some(json!({"question": "entanglement", "min_score": 0.1})), None).await;
    assert_eq!(after["results"][0]["document_id"], id);

    let (status, _) = call(&app, "DELETE", &format!("/api/documents/{id}"), None, Some(TOKEN)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, after) = call(&app, "POST", "/api/retrieve", Some(json!({"question": "entanglement", "min_score": 0.1})), None).await;
    assert_eq!(after["results"], json!([]));
    assert_eq!(after["total_documents"], 3);
}

#[tokio::test]
async fn question_relevant_related_and_answer() {
    let store = seeded_store();
    let app = app(store.clone());
    let (status, q) = call(&app, "POST", "/api/questions", Some(json!({"text": "What is cloud computing?"})), None).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = q["id"].as_u64().unwrap();
    assert!(q["answer"].is_null());

    let (status, relevant) = call(&app, "GET", &format!("/api/questions/{id}/relevant"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    let results = relevant["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["title"], "Cloud Computing");

    let (status, related) = call(&app, "POST", &format!("/api/questions/{id}/related"), None, Some(TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(related["related_documents"][0]["title"], "Cloud Computing");
    assert!(related["answer"].is_null());

    let (status, answered) = call(&app, "POST", &format!("/api/questions/{id}/answer"), None, Some(TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(answered["answer"].is_string());

    let (status, list) = call(&app, "GET", "/api/questions", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["count"], 1);
}

#[tokio::test]
async fn admin_endpoints_reject_when_no_token_configured() {
    let app = app_with(seeded_store(), Config::default());
    let body = json!({"title": "New", "content": "Quantum computing uses qubits."});
    let (status, _) = call(&app, "POST", "/api/documents", Some(body), Some("anything")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = call(&app, "POST", "/api/refresh-index", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

async fn allowed_origin(app: &Router, origin: &str) -> Option<String> {
    let req = Request::builder().uri("/health").header("origin", origin).body(Body::empty()).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    resp.headers().get("access-control-allow-origin").and_then(|v| v.to_str().ok()).map(str::to_string)
}

#[tokio::test]
async fn cors_echoes_only_listed_origins() {
    let state = AppState::new(seeded_store(), &Config::default()).unwrap();
    let app = router(state, Some("http://a.example, http://b.example"));
    assert_eq!(allowed_origin(&app, "http://b.example").await.as_deref(), Some("http://b.example"));
    assert_eq!(allowed_origin(&app, "http://evil.example").await, None);
}

#[tokio::test]
async fn cors_allows_any_origin_when_unset() {
    let app = app(seeded_store());
    assert_eq!(allowed_origin(&app, "http://evil.example").await.as_deref(), Some("*"));
}

#[tokio::test]
async fn unknown_question_and_tag_are_not_found() {
    let app = app(seeded_store());
    let (status, _) = call(&app, "GET", "/api/questions/999999", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, "GET", "/api/tags/999999", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, "GET", "/api/questions/999999/relevant", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
