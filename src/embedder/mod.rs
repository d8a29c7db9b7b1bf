/// Embedder trait and shared types for text embedding.
pub mod download;
pub mod mock;
pub mod onnx;

use thiserror::Error;

/// Errors that can occur during embedding operations.
#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("input text is empty")]
    EmptyInput,

    #[error("inference failed: {0}")]
    InferenceFailed(String),

    #[error("model load failed: {0}")]
    ModelLoadFailed(String),

    #[error("tokenizer error: {0}")]
    TokenizerError(String),
}

/// Trait for text embedding implementations.
///
/// Produces a single L2-normalized vector of fixed dimensionality per input,
/// deterministic for identical input and model files. Implementations must be
/// `Send + Sync` to allow sharing behind `Arc`.
pub trait Embedder: Send + Sync {
    /// Embed a single text string into a normalized vector.
    ///
    /// Fails with [`EmbedderError::EmptyInput`] when `text` is empty or
    /// whitespace-only.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError>;

    /// Embed multiple text strings into vectors.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Return the dimensionality of the embedding vectors.
    fn dimensions(&self) -> usize;
}
