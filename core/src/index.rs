//! In-memory retrieval index over the record store's documents.
//!
//! The index is either NotIndexed or holds one immutable [`Generation`] built
//! from a full corpus snapshot. Builds construct the next generation off to the
//! side and swap it in, so concurrent queries see either the old or the new
//! generation, never a mix. An empty corpus leaves the index NotIndexed.

use crate::model::{truncate_with_ellipsis, CorpusEntry, Document, DocumentId};
use crate::ranker::rank;
use crate::store::RecordStore;
use crate::vectorizer::{SparseVector, TfidfVectorizer, Vocabulary, DEFAULT_MAX_FEATURES};
use crate::{Error, Result};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

pub const DEFAULT_TOP_K: usize = 3;
pub const PREVIEW_LENGTH: usize = 200;

#[derive(Debug, Clone, Copy)]
pub struct IndexConfig {
    pub max_features: usize,
    pub preview_length: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { max_features: DEFAULT_MAX_FEATURES, preview_length: PREVIEW_LENGTH }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub document_id: DocumentId,
    pub title: String,
    pub score: f32,
    pub content_preview: String,
}

/// One build of the index. All vectors and parallel arrays share ordinals.
struct Generation {
    vocabulary: Vocabulary,
    vectors: Vec<SparseVector>,
    ids: Vec<DocumentId>,
    titles: Vec<String>,
    previews: Vec<String>,
}

impl Generation {
    fn len(&self) -> usize { self.ids.len() }
}

pub struct RetrievalIndex {
    store: Arc<dyn RecordStore>,
    config: IndexConfig,
    current: RwLock<Option<Arc<Generation>>>,
    build_lock: Mutex<()>,
}

impl RetrievalIndex {
    pub fn new(store: Arc<dyn RecordStore>, config: IndexConfig) -> Self {
        Self { store, config, current: RwLock::new(None), build_lock: Mutex::new(()) }
    }

    pub fn is_indexed(&self) -> bool { self.current.read().is_some() }

    pub fn document_count(&self) -> usize {
        self.current.read().as_ref().map_or(0, |g| g.len())
    }

    /// Rebuild from the store's current contents and return the number of
    /// indexed documents. An empty store leaves the index NotIndexed and returns 0.
    /// If the store cannot be read the previous generation stays in place.
    pub fn build(&self) -> Result<usize> {
        let _guard = self.build_lock.lock();
        self.build_locked()
    }

    fn build_locked(&self) -> Result<usize> {
        let snapshot = self.store.list_all()?;
        let generation = self.fit(snapshot)?;
        let count = generation.as_ref().map_or(0, Generation::len);
        let vocabulary = generation.as_ref().map_or(0, |g| g.vocabulary.len());
        *self.current.write() = generation.map(Arc::new);
        info!(documents = count, vocabulary, "retrieval index built");
        Ok(count)
    }

    fn fit(&self, snapshot: Vec<CorpusEntry>) -> Result<Option<Generation>> {
        let contents: Vec<&str> = snapshot.iter().map(|e| e.content.as_str()).collect();
        let (vocabulary, vectors) = match TfidfVectorizer::new(self.config.max_features).fit_transform(&contents) {
            Ok(fitted) => fitted,
            Err(Error::EmptyCorpus) => return Ok(None),
            Err(e) => return Err(e),
        };
        let mut generation = Generation {
            vocabulary,
            vectors,
            ids: Vec::with_capacity(snapshot.len()),
            titles: Vec::with_capacity(snapshot.len()),
            previews: Vec::with_capacity(snapshot.len()),
        };
        for entry in snapshot {
            generation.ids.push(entry.id);
            generation.previews.push(truncate_with_ellipsis(&entry.content, self.config.preview_length));
            generation.titles.push(entry.title);
        }
        Ok(Some(generation))
    }

    /// Drop the current generation. The next query rebuilds.
    pub fn invalidate(&self) {
        let _guard = self.build_lock.lock();
        *self.current.write() = None;
        debug!("retrieval index invalidated");
    }

    fn generation(&self) -> Option<Arc<Generation>> { self.current.read().clone() }

    /// Current generation, building one first if there is none.
    fn ensure_built(&self) -> Result<Option<Arc<Generation>>> {
        if let Some(g) = self.generation() {
            return Ok(Some(g));
        }
        let _guard = self.build_lock.lock();
        // Another caller may have built while we waited.
        if self.generation().is_none() {
            self.build_locked()?;
        }
        Ok(self.generation())
    }

    /// Documents most similar to `text`, best first: at most `top_k` results,
    /// each scoring at least `min_score`. `min_score` is clamped to `[0, 1]`
    /// and `top_k` to at least 1.
    pub fn query(&self, text: &str, top_k: usize, min_score: f32) -> Result<Vec<RetrievalResult>> {
        let Some(generation) = self.ensure_built()? else {
            return Ok(Vec::new());
        };
        let min_score = if min_score.is_nan() { 0.0 } else { min_score.clamp(0.0, 1.0) };
        let top_k = top_k.max(1);

        let query = generation.vocabulary.transform(text);
        let results: Vec<RetrievalResult> = rank(&query, &generation.vectors)
            .into_iter()
            .filter(|(_, score)| *score >= min_score)
            .take(top_k)
            .map(|(i, score)| RetrievalResult {
                document_id: generation.ids[i],
                title: generation.titles[i].clone(),
                score,
                content_preview: generation.previews[i].clone(),
            })
            .collect();
        debug!(query_terms = query.nnz(), hits = results.len(), "retrieval query");
        Ok(results)
    }

    /// Full records for `results`, in the same order, paired with their
    /// scores. Documents the store no longer has are left out.
    pub fn resolve_to_records(&self, results: &[RetrievalResult]) -> Result<Vec<(Document, f32)>> {
        if results.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<DocumentId> = results.iter().map(|r| r.document_id).collect();
        let mut found = self.store.get_many(&ids)?;
        let resolved: Vec<(Document, f32)> = results
            .iter()
            .filter_map(|r| found.remove(&r.document_id).map(|doc| (doc, r.score)))
            .collect();
        if resolved.len() < results.len() {
            debug!(dropped = results.len() - resolved.len(), "ranked documents no longer in store");
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewDocument;
    use crate::store::SledStore;

    fn index_with(docs: &[(&str, &str)]) -> (Arc<SledStore>, RetrievalIndex) {
        let store = Arc::new(SledStore::temporary().unwrap());
        for (title, content) in docs {
            store.create_document(NewDocument { title: title.to_string(), content: content.to_string(), ..Default::default() }).unwrap();
        }
        let index = RetrievalIndex::new(store.clone(), IndexConfig::default());
        (store, index)
    }

    #[test]
    fn starts_not_indexed() {
        let (_, index) = index_with(&[("A", "alpha")]);
        assert!(!index.is_indexed());
        assert_eq!(index.document_count(), 0);
    }

    #[test]
    fn preview_is_truncated() {
        let long = "word ".repeat(100);
        let (_, index) = index_with(&[("Long", &long)]);
        let results = index.query("word", 1, 0.0).unwrap();
        assert_eq!(results[0].content_preview.chars().count(), PREVIEW_LENGTH + 3);
        assert!(results[0].content_preview.ends_with("..."));
    }

    #[test]
    fn min_score_is_clamped() {
        let (_, index) = index_with(&[("A", "alpha beta"), ("B", "gamma")]);
        assert_eq!(index.query("alpha", 5, -3.0).unwrap().len(), 2);
        assert!(index.query("alpha", 5, 7.0).unwrap().len() <= 1);
        assert_eq!(index.query("alpha", 5, f32::NAN).unwrap().len(), 2);
    }

    #[test]
    fn zero_top_k_returns_one() {
        let (_, index) = index_with(&[("A", "alpha"), ("B", "beta")]);
        assert_eq!(index.query("alpha", 0, 0.0).unwrap().len(), 1);
    }

    #[test]
    fn stopword_only_corpus_still_indexes() {
        let (_, index) = index_with(&[("A", "the and of"), ("B", "it is")]);
        assert_eq!(index.build().unwrap(), 2);
        assert!(index.is_indexed());
        let results = index.query("anything", 5, 0.0).unwrap();
        assert!(results.iter().all(|r| r.score == 0.0));
    }

    #[test]
    fn resolve_keeps_rank_order() {
        let (_, index) = index_with(&[("A", "rust rust rust"), ("B", "rust python"), ("C", "python")]);
        let results = index.query("rust", 3, 0.01).unwrap();
        let resolved = index.resolve_to_records(&results).unwrap();
        let titles: Vec<_> = resolved.iter().map(|(d, _)| d.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B"]);
        assert_eq!(resolved[0].1, results[0].score);
    }
}
