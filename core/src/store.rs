//! Sled-backed record store for documents, tags and questions.
//!
//! Each record kind lives in its own tree, keyed by the big-endian bytes of an
//! id from [`sled::Db::generate_id`], with bincode-encoded values.

use crate::model::{now_rfc3339, today, CorpusEntry, Document, DocumentId, NewDocument, Question, QuestionId, Tag, TagId, DB_REFERENCE};
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

/// What the retrieval index needs from wherever documents are kept.
pub trait RecordStore: Send + Sync {
    /// Every document as `(id, title, content)`, in ascending id order.
    fn list_all(&self) -> Result<Vec<CorpusEntry>>;
    /// Documents for the given ids. Ids with no record are absent from the map.
    fn get_many(&self, ids: &[DocumentId]) -> Result<HashMap<DocumentId, Document>>;
}

pub struct SledStore {
    db: sled::Db,
    documents: sled::Tree,
    tags: sled::Tree,
    questions: sled::Tree,
}

fn key(id: u64) -> [u8; 8] { id.to_be_bytes() }

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(bincode::serialize(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(bincode::deserialize(bytes)?)
}

fn load_all<T: DeserializeOwned>(tree: &sled::Tree) -> Result<Vec<T>> {
    tree.iter().map(|kv| {
        let (_, v) = kv?;
        decode(&v)
    }).collect()
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_db(sled::open(path)?)
    }

    /// A store that is deleted when dropped.
    pub fn temporary() -> Result<Self> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: sled::Db) -> Result<Self> {
        Ok(Self {
            documents: db.open_tree("documents")?,
            tags: db.open_tree("tags")?,
            questions: db.open_tree("questions")?,
            db,
        })
    }

    fn next_id(&self) -> Result<u64> {
        // generate_id starts at 0; records start at 1.
        Ok(self.db.generate_id()? + 1)
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    /// Remove every document, tag and question.
    pub fn clear(&self) -> Result<()> {
        self.questions.clear()?;
        self.documents.clear()?;
        self.tags.clear()?;
        Ok(())
    }

    // --- documents ---

    pub fn create_document(&self, new: NewDocument) -> Result<Document> {
        let now = now_rfc3339();
        let doc = Document {
            id: self.next_id()?,
            title: new.title,
            content: new.content,
            content_reference: DB_REFERENCE.to_string(),
            date: new.date.unwrap_or_else(today),
            tags: new.tags,
            created_at: now.clone(),
            updated_at: now,
        };
        self.put_document(&doc)?;
        Ok(doc)
    }

    fn put_document(&self, doc: &Document) -> Result<()> {
        self.documents.insert(key(doc.id), encode(doc)?)?;
        Ok(())
    }

    pub fn get_document(&self, id: DocumentId) -> Result<Option<Document>> {
        self.documents.get(key(id))?.map(|v| decode(&v)).transpose()
    }

    /// Newest first: by date, then creation time, then id.
    pub fn list_documents(&self) -> Result<Vec<Document>> {
        let mut docs: Vec<Document> = load_all(&self.documents)?;
        docs.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.created_at.cmp(&a.created_at)).then(b.id.cmp(&a.id)));
        Ok(docs)
    }

    /// Documents for `ids` in the given order; missing ids are skipped.
    pub fn get_many_in_order(&self, ids: &[DocumentId]) -> Result<Vec<Document>> {
        ids.iter().filter_map(|&id| self.get_document(id).transpose()).collect()
    }

    pub fn document_count(&self) -> usize { self.documents.len() }

    /// Replace title, content, date and tags of an existing document.
    /// A missing date keeps the stored one.
    pub fn update_document(&self, id: DocumentId, update: NewDocument) -> Result<Document> {
        let mut doc = self.get_document(id)?.ok_or(Error::NotFound { kind: "document", id })?;
        doc.title = update.title;
        doc.content = update.content;
        if let Some(date) = update.date { doc.date = date; }
        doc.tags = update.tags;
        doc.updated_at = now_rfc3339();
        self.put_document(&doc)?;
        Ok(doc)
    }

    /// Overwrite the inline content and its reference. Returns false when the document does not exist.
    pub fn set_content(&self, id: DocumentId, content: &str, reference: &str) -> Result<bool> {
        let Some(mut doc) = self.get_document(id)? else { return Ok(false) };
        doc.content = content.to_string();
        doc.content_reference = reference.to_string();
        doc.updated_at = now_rfc3339();
        self.put_document(&doc)?;
        Ok(true)
    }

    /// Delete a document and detach it from every question. Returns false when it did not exist.
    pub fn delete_document(&self, id: DocumentId) -> Result<bool> {
        if self.documents.remove(key(id))?.is_none() {
            return Ok(false);
        }
        for mut question in self.list_questions()? {
            let before = question.related_documents.len();
            question.related_documents.retain(|d| *d != id);
            if question.related_documents.len() != before {
                self.save_question(&question)?;
            }
        }
        Ok(true)
    }

    // --- tags ---

    pub fn get_tag(&self, id: TagId) -> Result<Option<Tag>> {
        self.tags.get(key(id))?.map(|v| decode(&v)).transpose()
    }

    pub fn tag_by_name(&self, name: &str) -> Result<Option<Tag>> {
        Ok(load_all::<Tag>(&self.tags)?.into_iter().find(|t| t.name == name))
    }

    /// Tag names are unique; an existing tag with `name` is returned as is.
    pub fn get_or_create_tag(&self, name: &str) -> Result<Tag> {
        if let Some(tag) = self.tag_by_name(name)? {
            return Ok(tag);
        }
        let tag = Tag { id: self.next_id()?, name: name.to_string(), created_at: now_rfc3339() };
        self.tags.insert(key(tag.id), encode(&tag)?)?;
        Ok(tag)
    }

    /// Ordered by name.
    pub fn list_tags(&self) -> Result<Vec<Tag>> {
        let mut tags: Vec<Tag> = load_all(&self.tags)?;
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    pub fn tag_document_count(&self, id: TagId) -> Result<usize> {
        Ok(load_all::<Document>(&self.documents)?.iter().filter(|d| d.tags.contains(&id)).count())
    }

    // --- questions ---

    pub fn create_question(&self, text: &str) -> Result<Question> {
        let question = Question {
            id: self.next_id()?,
            text: text.to_string(),
            answer: None,
            related_documents: Vec::new(),
            created_at: now_rfc3339(),
            answered_at: None,
        };
        self.save_question(&question)?;
        Ok(question)
    }

    pub fn get_question(&self, id: QuestionId) -> Result<Option<Question>> {
        self.questions.get(key(id))?.map(|v| decode(&v)).transpose()
    }

    /// Newest first.
    pub fn list_questions(&self) -> Result<Vec<Question>> {
        let mut questions: Vec<Question> = load_all(&self.questions)?;
        questions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(questions)
    }

    pub fn save_question(&self, question: &Question) -> Result<()> {
        self.questions.insert(key(question.id), encode(question)?)?;
        Ok(())
    }
}

impl RecordStore for SledStore {
    fn list_all(&self) -> Result<Vec<CorpusEntry>> {
        Ok(load_all::<Document>(&self.documents)?
            .into_iter()
            .map(|d| CorpusEntry { id: d.id, title: d.title, content: d.content })
            .collect())
    }

    fn get_many(&self, ids: &[DocumentId]) -> Result<HashMap<DocumentId, Document>> {
        let mut found = HashMap::with_capacity(ids.len());
        for &id in ids {
            if let Some(doc) = self.get_document(id)? {
                found.insert(id, doc);
            }
        }
        Ok(found)
    }
}
