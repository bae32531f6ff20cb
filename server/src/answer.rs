//! Answer generation from ranked documents.

use crate::config::LlmConfig;
use docqa_core::qa::{build_context, build_prompt, NO_DOCUMENTS_ANSWER};
use docqa_core::Document;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

pub const FAKE_RESPONSE: &str = "Based on the provided documents, I can provide the following answer. \
The information suggests that the topic relates to the content in the retrieved documents. \
Please note this is a simulated response for testing purposes.";

#[derive(Debug, Error)]
pub enum AnswerError {
    #[error("language model request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("language model returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("language model response had no generated text")]
    EmptyResponse,
}

/// Which language model answers questions, fixed at construction.
pub enum AnswerGenerator {
    Fake(FakeModel),
    HuggingFace(HuggingFaceModel),
}

impl AnswerGenerator {
    pub fn from_config(config: &LlmConfig) -> Result<Self, AnswerError> {
        if config.use_fake {
            return Ok(Self::Fake(FakeModel::default()));
        }
        Ok(Self::HuggingFace(HuggingFaceModel::new(config)?))
    }

    /// Answer `question` from `documents`, which must already be ranked and cut
    /// to the retrieval policy. With no documents the model is not called.
    pub async fn generate(&self, question: &str, documents: &[(Document, f32)]) -> Result<String, AnswerError> {
        if documents.is_empty() {
            return Ok(NO_DOCUMENTS_ANSWER.to_string());
        }
        let prompt = build_prompt(question, &build_context(documents));
        match self {
            Self::Fake(model) => Ok(model.invoke(&prompt)),
            Self::HuggingFace(model) => model.invoke(&prompt).await,
        }
    }

    /// Name of the backing model, `fake` for canned responses.
    pub fn model_name(&self) -> &str {
        match self {
            Self::Fake(_) => "fake",
            Self::HuggingFace(model) => &model.model,
        }
    }
}

/// Cycles through canned responses.
pub struct FakeModel {
    responses: Vec<String>,
    next: AtomicUsize,
}

impl Default for FakeModel {
    fn default() -> Self { Self::new(vec![FAKE_RESPONSE.to_string()]) }
}

impl FakeModel {
    pub fn new(responses: Vec<String>) -> Self {
        Self { responses, next: AtomicUsize::new(0) }
    }

    fn invoke(&self, _prompt: &str) -> String {
        if self.responses.is_empty() {
            return String::new();
        }
        let i = self.next.fetch_add(1, Ordering::Relaxed) % self.responses.len();
        self.responses[i].clone()
    }
}

/// Text2text generation through the HuggingFace inference API.
pub struct HuggingFaceModel {
    client: reqwest::Client,
    model: String,
    endpoint: String,
    api_token: Option<String>,
}

#[derive(Serialize)]
struct GenerationRequest<'a> {
    inputs: &'a str,
    parameters: GenerationParameters,
}

#[derive(Serialize)]
struct GenerationParameters {
    max_new_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct Generated {
    generated_text: String,
}

impl HuggingFaceModel {
    pub fn new(config: &LlmConfig) -> Result<Self, AnswerError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, model: config.model.clone(), endpoint: config.endpoint.clone(), api_token: config.api_token.clone() })
    }

    async fn invoke(&self, prompt: &str) -> Result<String, AnswerError> {
        let body = GenerationRequest { inputs: prompt, parameters: GenerationParameters { max_new_tokens: 512, temperature: 0.7 } };
        let mut req = self.client.post(&self.endpoint).json(&body);
        if let Some(token) = &self.api_token {
            req = req.bearer_auth(token);
        }
        tracing::debug!(model = %self.model, prompt_chars = prompt.len(), "requesting generation");
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AnswerError::Status { status: status.as_u16(), body });
        }
        let generated: Vec<Generated> = resp.json().await?;
        generated.into_iter().next().map(|g| g.generated_text).ok_or(AnswerError::EmptyResponse)
    }
}
