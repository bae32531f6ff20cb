//! Tag, document and question endpoints.

use crate::{authorize, bad_request, internal, not_found, ApiError, AppState};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use docqa_core::model::DB_REFERENCE;
use docqa_core::{Document, DocumentId, NewDocument, Question, QuestionId, TagId};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct ListResponse<T> {
    pub count: usize,
    pub results: Vec<T>,
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(results: Vec<T>) -> Self {
        Self { count: results.len(), results }
    }
}

#[derive(Serialize)]
pub struct TagView {
    pub id: TagId,
    pub name: String,
    pub document_count: usize,
}

#[derive(Serialize)]
pub struct TagSummary {
    pub id: TagId,
    pub name: String,
}

#[derive(Serialize)]
pub struct DocumentView {
    pub id: DocumentId,
    pub title: String,
    pub content: String,
    pub content_reference: String,
    pub date: String,
    pub tags: Vec<TagSummary>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Serialize)]
pub struct DocumentSummary {
    pub id: DocumentId,
    pub title: String,
    pub date: String,
}

impl From<&Document> for DocumentSummary {
    fn from(d: &Document) -> Self {
        Self { id: d.id, title: d.title.clone(), date: d.date.clone() }
    }
}

#[derive(Serialize)]
pub struct QuestionView {
    pub id: QuestionId,
    pub text: String,
    pub answer: Option<String>,
    pub related_documents: Vec<DocumentSummary>,
    pub created_at: String,
    pub answered_at: Option<String>,
}

#[derive(Deserialize)]
pub struct DocumentPayload {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub date: Option<String>,
    /// Tag names; unknown names are created.
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Deserialize)]
pub struct QuestionPayload {
    #[serde(default)]
    pub text: String,
}

pub async fn list_tags(State(state): State<AppState>) -> Result<Json<ListResponse<TagView>>, ApiError> {
    let mut views = Vec::new();
    for tag in state.store.list_tags().map_err(internal)? {
        let document_count = state.store.tag_document_count(tag.id).map_err(internal)?;
        views.push(TagView { id: tag.id, name: tag.name, document_count });
    }
    Ok(Json(views.into()))
}

pub async fn get_tag(State(state): State<AppState>, Path(id): Path<TagId>) -> Result<Json<TagView>, ApiError> {
    let tag = state.store.get_tag(id).map_err(internal)?.ok_or_else(|| not_found("tag", id))?;
    let document_count = state.store.tag_document_count(id).map_err(internal)?;
    Ok(Json(TagView { id: tag.id, name: tag.name, document_count }))
}

pub async fn list_documents(State(state): State<AppState>) -> Result<Json<ListResponse<DocumentView>>, ApiError> {
    let docs = state.store.list_documents().map_err(internal)?;
    let views = docs.into_iter().map(|d| document_view(&state, d)).collect::<Result<Vec<_>, _>>()?;
    Ok(Json(views.into()))
}

pub async fn get_document(State(state): State<AppState>, Path(id): Path<DocumentId>) -> Result<Json<DocumentView>, ApiError> {
    let doc = state.store.get_document(id).map_err(internal)?.ok_or_else(|| not_found("document", id))?;
    Ok(Json(document_view(&state, doc)?))
}

pub async fn create_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<DocumentPayload>,
) -> Result<(StatusCode, Json<DocumentView>), ApiError> {
    authorize(&state, &headers)?;
    let new = new_document(&state, payload)?;
    let content = new.content.clone();
    let doc = state.store.create_document(new).map_err(internal)?;
    let reference = state.content.save_content(doc.id, &content).map_err(internal)?;
    if reference != DB_REFERENCE {
        state.store.set_content(doc.id, &content, &reference).map_err(internal)?;
    }
    let count = state.retrieval.refresh().map_err(internal)?;
    tracing::info!(doc_id = doc.id, indexed = count, "document created");
    let doc = state.store.get_document(doc.id).map_err(internal)?.ok_or_else(|| not_found("document", doc.id))?;
    Ok((StatusCode::CREATED, Json(document_view(&state, doc)?)))
}

pub async fn update_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<DocumentId>,
    Json(payload): Json<DocumentPayload>,
) -> Result<Json<DocumentView>, ApiError> {
    authorize(&state, &headers)?;
    let existing = state.store.get_document(id).map_err(internal)?.ok_or_else(|| not_found("document", id))?;
    let update = new_document(&state, payload)?;
    let content = update.content.clone();
    state.store.update_document(id, update).map_err(internal)?;
    let reference = state.content.update_content(id, &existing.content_reference, &content).map_err(internal)?;
    if reference != DB_REFERENCE {
        state.store.set_content(id, &content, &reference).map_err(internal)?;
    }
    state.retrieval.refresh().map_err(internal)?;
    let doc = state.store.get_document(id).map_err(internal)?.ok_or_else(|| not_found("document", id))?;
    Ok(Json(document_view(&state, doc)?))
}

pub async fn delete_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<DocumentId>,
) -> Result<StatusCode, ApiError> {
    authorize(&state, &headers)?;
    let doc = state.store.get_document(id).map_err(internal)?.ok_or_else(|| not_found("document", id))?;
    state.content.delete_content(id, &doc.content_reference).map_err(internal)?;
    state.store.delete_document(id).map_err(internal)?;
    let count = state.retrieval.refresh().map_err(internal)?;
    tracing::info!(doc_id = id, indexed = count, "document deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_questions(State(state): State<AppState>) -> Result<Json<ListResponse<QuestionView>>, ApiError> {
    let questions = state.store.list_questions().map_err(internal)?;
    let views = questions.into_iter().map(|q| question_view(&state, q)).collect::<Result<Vec<_>, _>>()?;
    Ok(Json(views.into()))
}

pub async fn get_question(State(state): State<AppState>, Path(id): Path<QuestionId>) -> Result<Json<QuestionView>, ApiError> {
    let question = load_question(&state, id)?;
    Ok(Json(question_view(&state, question)?))
}

pub async fn create_question(
    State(state): State<AppState>,
    Json(payload): Json<QuestionPayload>,
) -> Result<(StatusCode, Json<QuestionView>), ApiError> {
    let text = payload.text.trim();
    if text.is_empty() {
        return Err(bad_request("text: this field may not be blank"));
    }
    let question = state.store.create_question(text).map_err(internal)?;
    Ok((StatusCode::CREATED, Json(question_view(&state, question)?)))
}

pub(crate) fn load_question(state: &AppState, id: QuestionId) -> Result<Question, ApiError> {
    state.store.get_question(id).map_err(internal)?.ok_or_else(|| not_found("question", id))
}

pub(crate) fn question_view(state: &AppState, q: Question) -> Result<QuestionView, ApiError> {
    let related = state.store.get_many_in_order(&q.related_documents).map_err(internal)?;
    Ok(QuestionView {
        id: q.id,
        text: q.text,
        answer: q.answer,
        related_documents: related.iter().map(DocumentSummary::from).collect(),
        created_at: q.created_at,
        answered_at: q.answered_at,
    })
}

fn document_view(state: &AppState, doc: Document) -> Result<DocumentView, ApiError> {
    let content = state
        .content
        .get_content(doc.id, &doc.content_reference)
        .map_err(internal)?
        .unwrap_or(doc.content);
    let mut tags = Vec::with_capacity(doc.tags.len());
    for id in &doc.tags {
        if let Some(tag) = state.store.get_tag(*id).map_err(internal)? {
            tags.push(TagSummary { id: tag.id, name: tag.name });
        }
    }
    Ok(DocumentView {
        id: doc.id,
        title: doc.title,
        content,
        content_reference: doc.content_reference,
        date: doc.date,
        tags,
        created_at: doc.created_at,
        updated_at: doc.updated_at,
    })
}

fn new_document(state: &AppState, payload: DocumentPayload) -> Result<NewDocument, ApiError> {
    let title = payload.title.trim().to_string();
    if title.is_empty() {
        return Err(bad_request("title: this field may not be blank"));
    }
    if payload.content.trim().is_empty() {
        return Err(bad_request("content: this field may not be blank"));
    }
    let mut tags = Vec::with_capacity(payload.tags.len());
    for name in payload.tags.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        let tag = state.store.get_or_create_tag(name).map_err(internal)?;
        if !tags.contains(&tag.id) {
            tags.push(tag.id);
        }
    }
    Ok(NewDocument { title, content: payload.content, date: payload.date, tags })
}
