//! Retrieval, question answering and index maintenance endpoints.

use crate::answer::AnswerError;
use crate::records::{load_question, question_view, DocumentSummary, QuestionView};
use crate::{authorize, bad_request, internal, ApiError, AppState};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use docqa_core::index::DEFAULT_TOP_K;
use docqa_core::model::now_rfc3339;
use docqa_core::qa::{ANSWER_MIN_SCORE, ANSWER_TOP_K};
use docqa_core::{Question, QuestionId, RetrievalResult};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_TOP_K: i64 = 10;
/// Result count when showing documents relevant to a stored question.
pub const PRESENTATION_TOP_K: usize = 5;

#[derive(Deserialize)]
pub struct RetrieveRequest {
    #[serde(default)]
    pub question: String,
    pub top_k: Option<i64>,
    pub min_score: Option<f64>,
}

#[derive(Serialize)]
pub struct RetrieveResponse {
    pub question: String,
    pub results: Vec<RetrievalResult>,
    pub total_documents: usize,
}

#[derive(Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub question: String,
}

#[derive(Serialize)]
pub struct AskResponse {
    pub question_id: QuestionId,
    pub question: String,
    pub answer: Option<String>,
    pub related_documents: Vec<DocumentSummary>,
    pub answered_at: Option<String>,
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub message: String,
    pub documents_indexed: usize,
}

#[derive(Serialize)]
pub struct RelatedResponse {
    pub question_id: QuestionId,
    pub results: Vec<RetrievalResult>,
}

#[derive(Debug, Error)]
pub enum AskError {
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] docqa_core::Error),
    #[error("Failed to generate answer: {0}")]
    Generation(#[from] AnswerError),
}

impl From<AskError> for ApiError {
    fn from(err: AskError) -> Self {
        match err {
            AskError::Retrieval(e) => internal(e),
            AskError::Generation(e) => {
                tracing::warn!(%e, "answer generation failed");
                (StatusCode::BAD_GATEWAY, AskError::Generation(e).to_string())
            }
        }
    }
}

/// A validated retrieval request: `(question, top_k, min_score)`.
pub fn validate_retrieve(req: RetrieveRequest) -> Result<(String, usize, f32), ApiError> {
    let question = validate_question(&req.question)?;
    let top_k = req.top_k.unwrap_or(DEFAULT_TOP_K as i64);
    if !(1..=MAX_TOP_K).contains(&top_k) {
        return Err(bad_request(format!("top_k: must be between 1 and {MAX_TOP_K}")));
    }
    let min_score = req.min_score.unwrap_or(0.0);
    if !(0.0..=1.0).contains(&min_score) {
        return Err(bad_request("min_score: must be between 0.0 and 1.0"));
    }
    Ok((question, top_k as usize, min_score as f32))
}

fn validate_question(text: &str) -> Result<String, ApiError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(bad_request("question: this field may not be blank"));
    }
    Ok(text.to_string())
}

pub async fn retrieve(State(state): State<AppState>, Json(req): Json<RetrieveRequest>) -> Result<Json<RetrieveResponse>, ApiError> {
    let (question, top_k, min_score) = validate_retrieve(req)?;
    let results = state.retrieval.find_relevant(&question, top_k, min_score).map_err(internal)?;
    Ok(Json(RetrieveResponse { question, results, total_documents: state.retrieval.document_count() }))
}

pub async fn refresh_index(State(state): State<AppState>) -> Result<Json<RefreshResponse>, ApiError> {
    let documents_indexed = state.retrieval.refresh().map_err(internal)?;
    Ok(Json(RefreshResponse { message: "Index refreshed successfully".into(), documents_indexed }))
}

pub async fn ask(State(state): State<AppState>, Json(req): Json<AskRequest>) -> Result<(StatusCode, Json<AskResponse>), ApiError> {
    let text = validate_question(&req.question)?;
    let question = state.store.create_question(&text).map_err(internal)?;
    let question = answer_question(&state, question).await?;
    let view = question_view(&state, question)?;
    Ok((
        StatusCode::CREATED,
        Json(AskResponse {
            question_id: view.id,
            question: view.text,
            answer: view.answer,
            related_documents: view.related_documents,
            answered_at: view.answered_at,
        }),
    ))
}

/// Regenerate the answer of a stored question.
pub async fn answer_existing(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<QuestionId>,
) -> Result<Json<QuestionView>, ApiError> {
    authorize(&state, &headers)?;
    let question = load_question(&state, id)?;
    let question = answer_question(&state, question).await?;
    Ok(Json(question_view(&state, question)?))
}

/// Ranked documents for a stored question's text, without changing it.
pub async fn relevant_for_question(
    State(state): State<AppState>,
    Path(id): Path<QuestionId>,
) -> Result<Json<RelatedResponse>, ApiError> {
    let question = load_question(&state, id)?;
    let results = state.retrieval.find_relevant(&question.text, PRESENTATION_TOP_K, 0.0).map_err(internal)?;
    Ok(Json(RelatedResponse { question_id: id, results }))
}

/// Attach the best matching documents to a stored question without answering it.
/// A question with no matches keeps its current related documents.
pub async fn attach_related(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<QuestionId>,
) -> Result<Json<QuestionView>, ApiError> {
    authorize(&state, &headers)?;
    let mut question = load_question(&state, id)?;
    let documents = state
        .retrieval
        .find_relevant_documents(&question.text, ANSWER_TOP_K, ANSWER_MIN_SCORE)
        .map_err(internal)?;
    if !documents.is_empty() {
        question.related_documents = documents.iter().map(|(d, _)| d.id).collect();
        state.store.save_question(&question).map_err(internal)?;
    }
    Ok(Json(question_view(&state, question)?))
}

/// Retrieve supporting documents, generate an answer and store both on the
/// question. On a generation failure the question is left as it was.
pub async fn answer_question(state: &AppState, mut question: Question) -> Result<Question, AskError> {
    let documents = state
        .retrieval
        .find_relevant_documents(&question.text, ANSWER_TOP_K, ANSWER_MIN_SCORE)?;
    let answer = state.answers.generate(&question.text, &documents).await?;

    question.answer = Some(answer);
    question.answered_at = Some(now_rfc3339());
    question.related_documents = documents.iter().map(|(d, _)| d.id).collect();
    state.store.save_question(&question)?;
    tracing::info!(question_id = question.id, related = documents.len(), "question answered");
    Ok(question)
}
