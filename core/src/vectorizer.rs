//! TF-IDF weighting over a bounded unigram + bigram vocabulary.
//!
//! Fitting learns a [`Vocabulary`] (term ids and IDF weights) from a corpus and
//! returns one L2-normalized [`SparseVector`] per document. Queries are mapped
//! into the same space with [`Vocabulary::transform`], which never fails: terms
//! the vocabulary has not seen simply carry no weight.

use crate::tokenizer::extract_terms;
use crate::{Error, Result};
use std::collections::HashMap;

pub type TermId = u32;

pub const DEFAULT_MAX_FEATURES: usize = 10_000;

/// Sparse vector with strictly increasing term ids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    indices: Vec<TermId>,
    values: Vec<f32>,
}

impl SparseVector {
    /// Builds a vector from `(term, weight)` pairs; duplicate terms are summed and zeros dropped.
    pub fn from_pairs(mut pairs: Vec<(TermId, f32)>) -> Self {
        pairs.sort_unstable_by_key(|(t, _)| *t);
        let mut v = Self::default();
        for (term, weight) in pairs {
            if v.indices.last() == Some(&term) {
                if let Some(last) = v.values.last_mut() { *last += weight; }
            } else {
                v.indices.push(term);
                v.values.push(weight);
            }
        }
        let (indices, values): (Vec<_>, Vec<_>) = v
            .indices
            .into_iter()
            .zip(v.values)
            .filter(|(_, w)| *w != 0.0)
            .unzip();
        Self { indices, values }
    }

    pub fn indices(&self) -> &[TermId] { &self.indices }
    pub fn values(&self) -> &[f32] { &self.values }
    pub fn nnz(&self) -> usize { self.indices.len() }
    pub fn is_empty(&self) -> bool { self.indices.is_empty() }

    pub fn get(&self, term: TermId) -> f32 {
        match self.indices.binary_search(&term) {
            Ok(pos) => self.values[pos],
            Err(_) => 0.0,
        }
    }

    pub fn dot(&self, other: &SparseVector) -> f32 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0f32;
        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += self.values[i] * other.values[j];
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }

    pub fn norm(&self) -> f32 {
        self.values.iter().map(|w| w * w).sum::<f32>().sqrt()
    }

    fn normalize(&mut self) {
        let norm = self.norm();
        if norm > 0.0 {
            for w in self.values.iter_mut() { *w /= norm; }
        }
    }
}

/// Retained terms of one fitted corpus with their inverse document frequencies.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    terms: HashMap<String, TermId>,
    idf: Vec<f32>,
}

impl Vocabulary {
    pub fn len(&self) -> usize { self.idf.len() }
    pub fn is_empty(&self) -> bool { self.idf.is_empty() }
    pub fn term_id(&self, term: &str) -> Option<TermId> { self.terms.get(term).copied() }
    pub fn idf(&self, term: TermId) -> Option<f32> { self.idf.get(term as usize).copied() }

    /// Map text into this vocabulary's space. Unknown terms are ignored, so
    /// text sharing nothing with the corpus yields the empty vector.
    pub fn transform(&self, text: &str) -> SparseVector {
        self.weigh(&count_terms(text))
    }

    fn weigh(&self, counts: &HashMap<String, u32>) -> SparseVector {
        let pairs = counts
            .iter()
            .filter_map(|(term, &tf)| {
                let id = self.term_id(term)?;
                Some((id, tf as f32 * self.idf[id as usize]))
            })
            .collect();
        let mut v = SparseVector::from_pairs(pairs);
        v.normalize();
        v
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TfidfVectorizer {
    max_features: usize,
}

impl Default for TfidfVectorizer {
    fn default() -> Self { Self::new(DEFAULT_MAX_FEATURES) }
}

impl TfidfVectorizer {
    pub fn new(max_features: usize) -> Self {
        Self { max_features: max_features.max(1) }
    }

    pub fn max_features(&self) -> usize { self.max_features }

    /// Learn the vocabulary of `corpus` and weigh every document against it.
    ///
    /// When the corpus has more distinct terms than `max_features`, the terms
    /// with the highest total count are kept (ties by term text). Retained
    /// terms are numbered in lexicographic order. IDF is smoothed:
    /// `ln((1 + n) / (1 + df)) + 1`.
    pub fn fit_transform<S: AsRef<str>>(&self, corpus: &[S]) -> Result<(Vocabulary, Vec<SparseVector>)> {
        if corpus.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        let doc_counts: Vec<HashMap<String, u32>> = corpus.iter().map(|d| count_terms(d.as_ref())).collect();

        let mut df: HashMap<&str, u32> = HashMap::new();
        let mut total: HashMap<&str, u64> = HashMap::new();
        for counts in &doc_counts {
            for (term, &tf) in counts {
                *df.entry(term.as_str()).or_insert(0) += 1;
                *total.entry(term.as_str()).or_insert(0) += tf as u64;
            }
        }

        let mut retained: Vec<&str> = if total.len() > self.max_features {
            let mut ranked: Vec<(&str, u64)> = total.into_iter().collect();
            ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
            ranked.truncate(self.max_features);
            ranked.into_iter().map(|(t, _)| t).collect()
        } else {
            total.into_keys().collect()
        };
        retained.sort_unstable();

        let n = corpus.len() as f32;
        let mut vocabulary = Vocabulary { terms: HashMap::with_capacity(retained.len()), idf: Vec::with_capacity(retained.len()) };
        for (id, term) in retained.into_iter().enumerate() {
            let df_t = df.get(term).copied().unwrap_or(0) as f32;
            vocabulary.terms.insert(term.to_string(), id as TermId);
            vocabulary.idf.push(((1.0 + n) / (1.0 + df_t)).ln() + 1.0);
        }

        let vectors = doc_counts.iter().map(|c| vocabulary.weigh(c)).collect();
        Ok((vocabulary, vectors))
    }
}

fn count_terms(text: &str) -> HashMap<String, u32> {
    let mut counts = HashMap::new();
    for term in extract_terms(text) {
        *counts.entry(term).or_insert(0) += 1;
    }
    counts
}
