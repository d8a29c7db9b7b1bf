/// Similarity search over a loaded snapshot.
///
/// A query is a full linear scan: cosine similarity against every stored
/// vector, O(N·D). Fine at single-project scale; deliberately no
/// approximate-NN indexing.
use super::{EmbeddingRecord, StoreError, VectorStore};

/// One scored retrieval result, borrowing its record from the store.
#[derive(Debug)]
pub struct SearchHit<'a> {
    pub record: &'a EmbeddingRecord,
    pub score: f32,
}

/// Cosine similarity of two equal-length vectors.
///
/// Defined as 0.0 when either vector has zero norm. Upstream embeddings are
/// expected to be unit-length already, but the zero case must not divide.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

impl VectorStore {
    /// Return the `top_k` records most similar to `query_vector`, ordered by
    /// descending cosine similarity.
    ///
    /// Ties keep snapshot order (stable sort), so repeated queries against
    /// an unchanged snapshot are deterministic. Returns fewer than `top_k`
    /// hits when the store is smaller.
    pub fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchHit<'_>>, StoreError> {
        if top_k == 0 {
            return Err(StoreError::InvalidTopK);
        }

        if let Some(dims) = self.dimensions() {
            if query_vector.len() != dims {
                return Err(StoreError::Corrupt(format!(
                    "query has {} dims, snapshot has {dims}",
                    query_vector.len()
                )));
            }
        }

        let mut hits: Vec<SearchHit<'_>> = self
            .records()
            .iter()
            .map(|record| SearchHit {
                record,
                score: cosine_similarity(query_vector, &record.embedding),
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(top_k);

        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str, embedding: Vec<f32>) -> EmbeddingRecord {
        EmbeddingRecord {
            repository: "acme/app".to_string(),
            file_path: path.to_string(),
            content: String::new(),
            embedding,
        }
    }

    #[test]
    fn test_cosine_symmetric() {
        let a = vec![0.3, 0.7, 0.1];
        let b = vec![0.9, 0.2, 0.4];
        assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
    }

    #[test]
    fn test_cosine_self_similarity_is_one() {
        let v = vec![0.5, 0.5, 0.5];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal_is_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_vector_is_zero() {
        let zero = vec![0.0, 0.0];
        let v = vec![1.0, 0.0];
        assert_eq!(cosine_similarity(&zero, &v), 0.0);
        assert_eq!(cosine_similarity(&v, &zero), 0.0);
        assert_eq!(cosine_similarity(&zero, &zero), 0.0);
    }

    #[test]
    fn test_cosine_magnitude_independent() {
        let a = vec![1.0, 2.0];
        let b = vec![10.0, 20.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_search_orders_by_descending_similarity() {
        let store = VectorStore::from_records(vec![
            record("x.js", vec![1.0, 0.0]),
            record("y.js", vec![0.0, 1.0]),
            record("z.js", vec![0.9, 0.1]),
        ]);

        let hits = store.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].record.file_path, "x.js");
        assert_eq!(hits[1].record.file_path, "z.js");
        assert!(hits[0].score >= hits[1].score);
    }

    #[test]
    fn test_search_returns_all_when_store_smaller_than_top_k() {
        let store = VectorStore::from_records(vec![record("only.js", vec![1.0, 0.0])]);
        let hits = store.search(&[0.5, 0.5], 10).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_search_non_increasing_scores() {
        let store = VectorStore::from_records(vec![
            record("a.js", vec![0.2, 0.8]),
            record("b.js", vec![0.7, 0.3]),
            record("c.js", vec![0.5, 0.5]),
            record("d.js", vec![1.0, 0.0]),
        ]);
        let hits = store.search(&[0.6, 0.4], 4).unwrap();
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_search_ties_keep_snapshot_order() {
        let store = VectorStore::from_records(vec![
            record("first.js", vec![1.0, 0.0]),
            record("second.js", vec![1.0, 0.0]),
        ]);
        let hits = store.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits[0].record.file_path, "first.js");
        assert_eq!(hits[1].record.file_path, "second.js");
    }

    #[test]
    fn test_search_rejects_zero_top_k() {
        let store = VectorStore::from_records(vec![record("a.js", vec![1.0, 0.0])]);
        let err = store.search(&[1.0, 0.0], 0).unwrap_err();
        assert!(matches!(err, StoreError::InvalidTopK));
    }

    #[test]
    fn test_search_rejects_query_dimension_mismatch() {
        let store = VectorStore::from_records(vec![record("a.js", vec![1.0, 0.0])]);
        let err = store.search(&[1.0, 0.0, 0.0], 1).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }

    #[test]
    fn test_search_empty_store() {
        let store = VectorStore::from_records(vec![]);
        let hits = store.search(&[1.0, 0.0], 3).unwrap();
        assert!(hits.is_empty());
    }
}
