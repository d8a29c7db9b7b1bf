/// Flat-file vector store.
///
/// Persists the full set of [`EmbeddingRecord`]s as a single JSON snapshot.
/// A snapshot is written wholesale by an ingestion run and loaded fully into
/// memory before any query; there are no incremental updates.
pub mod models;
pub mod search;

use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::info;

pub use models::EmbeddingRecord;
pub use search::SearchHit;

/// Errors surfaced by snapshot load/save and search.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt snapshot: {0}")]
    Corrupt(String),

    #[error("top_k must be at least 1")]
    InvalidTopK,
}

/// In-memory view of a persisted snapshot.
#[derive(Debug)]
pub struct VectorStore {
    records: Vec<EmbeddingRecord>,
}

impl VectorStore {
    /// Load a snapshot from disk.
    ///
    /// Legacy embedding encodings are normalized during parsing; records
    /// with missing fields or inconsistent dimensionality fail with
    /// [`StoreError::Corrupt`].
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let data = fs::read_to_string(path)?;
        let records: Vec<EmbeddingRecord> = serde_json::from_str(&data)
            .map_err(|e| StoreError::Corrupt(format!("invalid snapshot JSON: {e}")))?;

        // All vectors must share one dimensionality or scoring is undefined
        if let Some(first) = records.first() {
            let dims = first.embedding.len();
            for rec in &records {
                if rec.embedding.len() != dims {
                    return Err(StoreError::Corrupt(format!(
                        "dimension mismatch: {} has {} dims, expected {dims}",
                        rec.file_path,
                        rec.embedding.len()
                    )));
                }
            }
        }

        info!("Loaded {} records from {}", records.len(), path.display());
        Ok(Self { records })
    }

    /// Persist a full record set, atomically replacing any prior snapshot.
    ///
    /// Writes to a sibling temp file first and renames it over the target,
    /// so a concurrent reader never observes a partial write.
    pub fn save(records: &[EmbeddingRecord], path: &Path) -> Result<(), StoreError> {
        let data = serde_json::to_string_pretty(records)
            .map_err(|e| StoreError::Corrupt(format!("serialization failed: {e}")))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, data)?;
        fs::rename(&tmp, path)?;

        info!("Saved {} records to {}", records.len(), path.display());
        Ok(())
    }

    /// Construct a store directly from records (used by tests and queries
    /// against a just-built set).
    #[must_use]
    pub fn from_records(records: Vec<EmbeddingRecord>) -> Self {
        Self { records }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Dimensionality of the stored vectors, if any records exist.
    #[must_use]
    pub fn dimensions(&self) -> Option<usize> {
        self.records.first().map(|r| r.embedding.len())
    }

    #[must_use]
    pub fn records(&self) -> &[EmbeddingRecord] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(path: &str, embedding: Vec<f32>) -> EmbeddingRecord {
        EmbeddingRecord {
            repository: "acme/app".to_string(),
            file_path: path.to_string(),
            content: format!("content of {path}"),
            embedding,
        }
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("embeddings.json");

        let records = vec![
            record("a.js", vec![1.0, 0.0]),
            record("b.js", vec![0.0, 1.0]),
        ];
        VectorStore::save(&records, &path).unwrap();

        let store = VectorStore::load(&path).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.dimensions(), Some(2));
        assert_eq!(store.records()[0], records[0]);
    }

    #[test]
    fn test_save_overwrites_prior_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("embeddings.json");

        VectorStore::save(&[record("old.js", vec![1.0])], &path).unwrap();
        VectorStore::save(&[record("new.js", vec![0.5])], &path).unwrap();

        let store = VectorStore::load(&path).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.records()[0].file_path, "new.js");
        // No temp file left behind
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_load_accepts_legacy_keyed_encoding() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("embeddings.json");
        std::fs::write(
            &path,
            r#"[
                {"repo": "r", "filePath": "flat.js", "content": "a",
                 "embedding": [0.1, 0.2]},
                {"repo": "r", "filePath": "keyed.js", "content": "b",
                 "embedding": {"0": 0.1, "1": 0.2}}
            ]"#,
        )
        .unwrap();

        let store = VectorStore::load(&path).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.records()[0].embedding, store.records()[1].embedding);
    }

    #[test]
    fn test_load_rejects_dimension_mismatch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("embeddings.json");
        std::fs::write(
            &path,
            r#"[
                {"repo": "r", "filePath": "a.js", "content": "a", "embedding": [0.1, 0.2]},
                {"repo": "r", "filePath": "b.js", "content": "b", "embedding": [0.1]}
            ]"#,
        )
        .unwrap();

        let err = VectorStore::load(&path).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)), "got: {err}");
    }

    #[test]
    fn test_load_rejects_missing_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("embeddings.json");
        std::fs::write(&path, r#"[{"repo": "r", "embedding": [0.1]}]"#).unwrap();

        assert!(matches!(
            VectorStore::load(&path),
            Err(StoreError::Corrupt(_))
        ));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.json");
        assert!(matches!(VectorStore::load(&path), Err(StoreError::Io(_))));
    }

    #[test]
    fn test_empty_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("embeddings.json");
        std::fs::write(&path, "[]").unwrap();

        let store = VectorStore::load(&path).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.dimensions(), None);
    }
}
