use crate::index::{IndexConfig, RetrievalIndex, RetrievalResult};
use crate::model::Document;
use crate::store::RecordStore;
use crate::Result;
use std::sync::{Arc, OnceLock};

/// Application-owned handle on the retrieval index.
///
/// Clones share one index. The index itself is created on first access and
/// lives as long as the last clone; it is built lazily by the first query.
/// Whoever mutates documents in the store must call [`refresh`](Self::refresh)
/// or [`invalidate`](Self::invalidate) afterwards.
#[derive(Clone)]
pub struct RetrievalService {
    store: Arc<dyn RecordStore>,
    config: IndexConfig,
    index: Arc<OnceLock<RetrievalIndex>>,
}

impl RetrievalService {
    pub fn new(store: Arc<dyn RecordStore>, config: IndexConfig) -> Self {
        Self { store, config, index: Arc::new(OnceLock::new()) }
    }

    pub fn index(&self) -> &RetrievalIndex {
        self.index.get_or_init(|| RetrievalIndex::new(self.store.clone(), self.config))
    }

    pub fn find_relevant(&self, question: &str, top_k: usize, min_score: f32) -> Result<Vec<RetrievalResult>> {
        self.index().query(question, top_k, min_score)
    }

    pub fn find_relevant_documents(&self, question: &str, top_k: usize, min_score: f32) -> Result<Vec<(Document, f32)>> {
        let results = self.find_relevant(question, top_k, min_score)?;
        self.index().resolve_to_records(&results)
    }

    /// Rebuild now; returns the number of indexed documents.
    pub fn refresh(&self) -> Result<usize> {
        self.index().build()
    }

    pub fn invalidate(&self) {
        self.index().invalidate()
    }

    pub fn is_indexed(&self) -> bool { self.index().is_indexed() }

    pub fn document_count(&self) -> usize { self.index().document_count() }
}
