/// Snapshot record types and their wire representation.
///
/// The snapshot keeps the JSON field names of the original `embeddings.json`
/// format (`repo`, `filePath`) so snapshots written by earlier versions of
/// the tool load unchanged.
use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// One embedded source file in the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingRecord {
    /// Repository identifier, e.g. `owner/name`.
    #[serde(rename = "repo")]
    pub repository: String,

    /// Path of the file relative to its repository root.
    #[serde(rename = "filePath")]
    pub file_path: String,

    /// Full text content of the file at ingestion time.
    pub content: String,

    /// Normalized embedding vector of `content`.
    ///
    /// Serialized as a flat array; on load, legacy keyed-object encodings
    /// are accepted and normalized (see [`EmbeddingEncoding`]).
    #[serde(deserialize_with = "deserialize_embedding")]
    pub embedding: Vec<f32>,
}

/// Historical encodings of the embedding field.
///
/// Older snapshots serialized the vector as a JSON object keyed by index
/// (`{"0": 0.1, "1": 0.2, ...}`); current snapshots use a flat array. Both
/// are normalized to an ordered `Vec<f32>` immediately at deserialization
/// and the union is never carried further.
///
/// Keys stay `String` here because untagged deserialization sees JSON
/// object keys as strings; they are parsed and sorted numerically below
/// (lexicographic order would put `"10"` before `"2"`).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EmbeddingEncoding {
    Flat(Vec<f32>),
    Keyed(BTreeMap<String, f32>),
}

fn deserialize_embedding<'de, D>(deserializer: D) -> Result<Vec<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    match EmbeddingEncoding::deserialize(deserializer)? {
        EmbeddingEncoding::Flat(v) => Ok(v),
        EmbeddingEncoding::Keyed(m) => {
            let mut entries: Vec<(u32, f32)> = Vec::with_capacity(m.len());
            for (key, value) in m {
                let index: u32 = key.parse().map_err(|_| {
                    serde::de::Error::custom(format!("non-numeric embedding index {key:?}"))
                })?;
                entries.push((index, value));
            }
            entries.sort_by_key(|(index, _)| *index);
            Ok(entries.into_iter().map(|(_, value)| value).collect())
        }
    }
}
