use crate::vectorizer::SparseVector;

/// Cosine similarity of two non-negative vectors, clamped to `[0, 1]`.
/// A zero vector is orthogonal to everything.
pub fn cosine(a: &SparseVector, b: &SparseVector) -> f32 {
    let denom = a.norm() * b.norm();
    if denom == 0.0 {
        return 0.0;
    }
    (a.dot(b) / denom).clamp(0.0, 1.0)
}

/// Score every document against `query` and return `(ordinal, score)` for all
/// of them, highest score first. Equal scores keep ordinal order.
pub fn rank(query: &SparseVector, documents: &[SparseVector]) -> Vec<(usize, f32)> {
    let mut scored: Vec<(usize, f32)> = documents.iter().enumerate().map(|(i, d)| (i, cosine(query, d))).collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    scored
}
