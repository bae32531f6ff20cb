use serde::{Deserialize, Serialize};
use std::fmt;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

/// RFC 3339 in UTC with a fixed nine-digit fraction, so string order is time order.
const TIMESTAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:9]Z");

pub type DocumentId = u64;
pub type TagId = u64;
pub type QuestionId = u64;

/// Reference stored on documents whose content lives inline in the record.
pub const DB_REFERENCE: &str = "db";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub created_at: String,
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    /// Full text; this is what the retrieval index is built from.
    pub content: String,
    /// Where the canonical copy of the content is kept, e.g. `db` or `file:///...`.
    pub content_reference: String,
    /// Calendar date, `YYYY-MM-DD`.
    pub date: String,
    pub tags: Vec<TagId>,
    pub created_at: String,
    pub updated_at: String,
}

impl Document {
    pub fn content_preview(&self, length: usize) -> String {
        truncate_with_ellipsis(&self.content, length)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// Fields a caller supplies when creating or replacing a document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewDocument {
    pub title: String,
    pub content: String,
    pub date: Option<String>,
    pub tags: Vec<TagId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    pub answer: Option<String>,
    pub related_documents: Vec<DocumentId>,
    pub created_at: String,
    pub answered_at: Option<String>,
}

impl Question {
    pub fn has_answer(&self) -> bool {
        self.answer.as_deref().is_some_and(|a| !a.is_empty())
    }

    pub fn preview(&self, length: usize) -> String {
        truncate_with_ellipsis(&self.text, length)
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.preview(50))
    }
}

/// One row of the corpus snapshot pulled at index build time.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusEntry {
    pub id: DocumentId,
    pub title: String,
    pub content: String,
}

/// First `length` characters of `text`, with `...` appended when anything was cut.
pub fn truncate_with_ellipsis(text: &str, length: usize) -> String {
    match text.char_indices().nth(length) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

pub fn now_rfc3339() -> String {
    format_timestamp(OffsetDateTime::now_utc())
}

fn format_timestamp(at: OffsetDateTime) -> String {
    match at.format(TIMESTAMP_FORMAT) {
        Ok(s) => s,
        Err(err) => {
            tracing::warn!(%err, "failed to format timestamp");
            String::new()
        }
    }
}

pub fn today() -> String {
    OffsetDateTime::now_utc().date().to_string()
}
