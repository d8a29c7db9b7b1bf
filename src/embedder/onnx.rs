/// ONNX Runtime embedder using the `ort` crate.
///
/// Loads an all-MiniLM-L6-v2 ONNX model, runs inference, applies mean
/// pooling with attention mask, and L2-normalizes the result — the same
/// pooling the sentence-transformers checkpoint was trained with.
use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::info;

use super::{Embedder, EmbedderError};

/// Maximum input length in tokens (MiniLM positional limit).
const MAX_SEQ_LEN: usize = 512;

/// ONNX-backed embedder implementing the `Embedder` trait.
///
/// The session is behind a `Mutex` because `ort` inference takes `&mut`;
/// callers share one instance per process and calls serialize on the lock.
pub struct OnnxEmbedder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    dimensions: usize,
}

impl OnnxEmbedder {
    /// Create a new `OnnxEmbedder` by loading a model from the given directory.
    ///
    /// Expects `model.onnx` and `tokenizer.json` in `model_dir`.
    pub fn new(model_dir: &Path, dimensions: usize) -> Result<Self, EmbedderError> {
        if dimensions == 0 {
            return Err(EmbedderError::ModelLoadFailed(
                "dimensions must be positive".to_string(),
            ));
        }

        let model_path = model_dir.join("model.onnx");
        if !model_path.exists() {
            return Err(EmbedderError::ModelLoadFailed(format!(
                "model.onnx not found in {}",
                model_dir.display()
            )));
        }

        info!("Initializing ONNX Runtime...");

        let session = Session::builder()
            .map_err(|e| EmbedderError::ModelLoadFailed(format!("session builder error: {e}")))?
            .with_intra_threads(4)
            .map_err(|e| EmbedderError::ModelLoadFailed(format!("thread config error: {e}")))?
            .commit_from_file(&model_path)
            .map_err(|e| EmbedderError::ModelLoadFailed(format!("model load error: {e}")))?;

        let tokenizer = load_tokenizer(model_dir)?;

        info!(
            "Embedding model loaded (vocab size: {})",
            tokenizer.get_vocab_size(false)
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            dimensions,
        })
    }
}

impl Embedder for OnnxEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        if text.trim().is_empty() {
            return Err(EmbedderError::EmptyInput);
        }

        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| EmbedderError::TokenizerError(format!("encode failed: {e}")))?;

        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();
        let seq_len = input_ids.len();

        // Tensors in (shape, data) tuple form to avoid ndarray version
        // coupling with ort
        let input_ids_val = Tensor::from_array(([1usize, seq_len], input_ids))
            .map_err(|e| EmbedderError::InferenceFailed(format!("input_ids error: {e}")))?;
        let attention_mask_val =
            Tensor::from_array(([1usize, seq_len], attention_mask.clone())).map_err(|e| {
                EmbedderError::InferenceFailed(format!("attention_mask error: {e}"))
            })?;
        let token_type_ids_val = Tensor::from_array(([1usize, seq_len], vec![0i64; seq_len]))
            .map_err(|e| EmbedderError::InferenceFailed(format!("token_type_ids error: {e}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| EmbedderError::InferenceFailed(format!("lock poisoned: {e}")))?;
        let outputs = session
            .run(ort::inputs![
                "input_ids" => input_ids_val,
                "attention_mask" => attention_mask_val,
                "token_type_ids" => token_type_ids_val,
            ])
            .map_err(|e| EmbedderError::InferenceFailed(format!("inference failed: {e}")))?;

        // Output shape is [1, seq_len, hidden_size]; trust the tensor
        // shape, not the configured dimensionality
        let (shape, hidden_data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| EmbedderError::InferenceFailed(format!("output extraction: {e}")))?;

        let hidden_size = shape.last().copied().unwrap_or(0) as usize;
        if hidden_size != self.dimensions {
            return Err(EmbedderError::InferenceFailed(format!(
                "model produced {hidden_size}-dim hidden states, configured dimensions is {}",
                self.dimensions
            )));
        }
        check_hidden_len(hidden_data.len(), seq_len, hidden_size)?;

        let pooled = mean_pooling(hidden_data, &attention_mask, seq_len, hidden_size);
        Ok(l2_normalize(&pooled))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Load and configure the tokenizer from `tokenizer.json`.
fn load_tokenizer(model_dir: &Path) -> Result<Tokenizer, EmbedderError> {
    let tokenizer_path = model_dir.join("tokenizer.json");
    if !tokenizer_path.exists() {
        return Err(EmbedderError::ModelLoadFailed(format!(
            "tokenizer.json not found in {}",
            model_dir.display()
        )));
    }

    let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
        .map_err(|e| EmbedderError::TokenizerError(format!("failed to load tokenizer: {e}")))?;

    // Source files routinely exceed the positional limit; truncate rather
    // than fail
    tokenizer
        .with_truncation(Some(tokenizers::TruncationParams {
            max_length: MAX_SEQ_LEN,
            ..Default::default()
        }))
        .map_err(|e| EmbedderError::TokenizerError(format!("truncation config failed: {e}")))?;

    Ok(tokenizer)
}

/// Check that a hidden-state buffer matches the `[1, seq_len, hidden_size]`
/// layout before pooling indexes into it.
fn check_hidden_len(
    data_len: usize,
    seq_len: usize,
    hidden_size: usize,
) -> Result<(), EmbedderError> {
    if data_len != seq_len * hidden_size {
        return Err(EmbedderError::InferenceFailed(format!(
            "hidden state length {data_len} does not match {seq_len}x{hidden_size}"
        )));
    }
    Ok(())
}

/// Mean pooling over hidden states weighted by attention mask.
///
/// `hidden_data` is a flat array with shape `[1, seq_len, hidden_size]`.
/// Iterates per-token rows rather than computed indices, so a short buffer
/// yields a truncated pool instead of a panic (callers validate the length
/// via [`check_hidden_len`] first).
fn mean_pooling(
    hidden_data: &[f32],
    attention_mask: &[i64],
    seq_len: usize,
    hidden_size: usize,
) -> Vec<f32> {
    let mut result = vec![0.0f32; hidden_size];
    let mut mask_sum: f32 = 0.0;

    for (row, &mask) in hidden_data
        .chunks_exact(hidden_size)
        .zip(attention_mask)
        .take(seq_len)
    {
        let mask = mask as f32;
        mask_sum += mask;

        for (acc, v) in result.iter_mut().zip(row) {
            *acc += v * mask;
        }
    }

    if mask_sum > 0.0 {
        for v in &mut result {
            *v /= mask_sum;
        }
    }

    result
}

/// L2-normalize a vector, returning the normalized copy.
fn l2_normalize(vec: &[f32]) -> Vec<f32> {
    let norm_sq: f32 = vec.iter().map(|v| v * v).sum();
    if norm_sq == 0.0 {
        return vec.to_vec();
    }

    let inv_norm = 1.0 / norm_sq.sqrt();
    vec.iter().map(|v| v * inv_norm).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_normalize() {
        let v = vec![3.0, 4.0];
        let normed = l2_normalize(&v);
        let norm: f32 = normed.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
        assert!((normed[0] - 0.6).abs() < 1e-6);
        assert!((normed[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_l2_normalize_zero() {
        let v = vec![0.0, 0.0, 0.0];
        let normed = l2_normalize(&v);
        assert_eq!(normed, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_mean_pooling_simple() {
        // 1 token, hidden_size=3, attention=1
        let hidden = vec![1.0, 2.0, 3.0];
        let mask = vec![1i64];
        let result = mean_pooling(&hidden, &mask, 1, 3);
        assert_eq!(result, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_mean_pooling_ignores_padding() {
        // 2 tokens, hidden_size=2, second token is padding (mask=0)
        let hidden = vec![1.0, 2.0, 10.0, 20.0];
        let mask = vec![1i64, 0i64];
        let result = mean_pooling(&hidden, &mask, 2, 2);
        assert_eq!(result, vec![1.0, 2.0]);
    }

    #[test]
    fn test_mean_pooling_averages_real_tokens() {
        let hidden = vec![2.0, 4.0, 6.0, 8.0];
        let mask = vec![1i64, 1i64];
        let result = mean_pooling(&hidden, &mask, 2, 2);
        assert_eq!(result, vec![4.0, 6.0]);
    }

    #[test]
    fn test_check_hidden_len_mismatch() {
        // 2 tokens x 3 dims needs 6 values, buffer has 4
        assert!(check_hidden_len(4, 2, 3).is_err());
        assert!(check_hidden_len(6, 2, 3).is_ok());
    }

    #[test]
    fn test_mean_pooling_short_buffer_does_not_panic() {
        // Buffer shorter than seq_len x hidden_size: incomplete rows are
        // dropped instead of read out of bounds
        let hidden = vec![1.0, 2.0, 3.0, 4.0];
        let mask = vec![1i64, 1i64];
        let result = mean_pooling(&hidden, &mask, 2, 3);
        assert_eq!(result, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_new_rejects_zero_dimensions() {
        let result = OnnxEmbedder::new(Path::new("/nonexistent"), 0);
        assert!(matches!(result, Err(EmbedderError::ModelLoadFailed(_))));
    }

    #[test]
    fn test_load_tokenizer_missing_file() {
        let result = load_tokenizer(Path::new("/nonexistent"));
        assert!(matches!(result, Err(EmbedderError::ModelLoadFailed(_))));
    }

    /// Integration test requiring actual model files.
    #[test]
    #[ignore]
    fn test_onnx_embed() {
        let model_dir = Path::new("models/all-MiniLM-L6-v2");
        if !model_dir.join("model.onnx").exists() {
            eprintln!("Skipping: model files not downloaded");
            return;
        }

        let embedder = OnnxEmbedder::new(model_dir, 384).unwrap();
        let vec = embedder.embed("Hello, world!").unwrap();

        assert_eq!(vec.len(), 384);
        let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!(
            (norm - 1.0).abs() < 0.01,
            "expected unit vector, got norm={norm}"
        );
    }

    #[test]
    #[ignore]
    fn test_onnx_embed_empty_input() {
        let model_dir = Path::new("models/all-MiniLM-L6-v2");
        if !model_dir.join("model.onnx").exists() {
            return;
        }

        let embedder = OnnxEmbedder::new(model_dir, 384).unwrap();
        assert!(matches!(embedder.embed(""), Err(EmbedderError::EmptyInput)));
    }
}
