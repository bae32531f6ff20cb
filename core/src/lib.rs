pub mod content;
pub mod error;
pub mod index;
pub mod model;
pub mod qa;
pub mod ranker;
pub mod service;
pub mod store;
pub mod tokenizer;
pub mod vectorizer;

pub use error::{Error, Result};
pub use index::{IndexConfig, RetrievalIndex, RetrievalResult};
pub use model::{CorpusEntry, Document, DocumentId, NewDocument, Question, QuestionId, Tag, TagId};
pub use service::RetrievalService;
pub use store::{RecordStore, SledStore};
