pub mod local;

use crate::config::EmbeddingConfig;
use crate::error::{EngramError, Result};
use std::sync::{Arc, Mutex};

/// Trait for embedding text into vectors.
///
/// Implementations produce L2-normalized vectors of exactly `dimensions()`
/// length, so cosine similarity reduces to a dot product. All methods are
/// synchronous — callers in async contexts should use
/// `tokio::task::spawn_blocking`.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string into a unit vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of text strings. Implementations may override for batched inference.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Number of dimensions this provider produces.
    fn dimensions(&self) -> usize;
}

/// Create an embedding provider from config.
///
/// Currently only `"local"` is supported (ONNX Runtime + bge-small-en-v1.5).
/// Returns `EmbeddingUnavailable` if model files are not found — run
/// `engram model download` first.
pub fn create_provider(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "local" => {
            let provider = local::LocalEmbeddingProvider::new(config)?;
            Ok(Arc::new(provider))
        }
        other => Err(EngramError::EmbeddingUnavailable(format!(
            "unknown embedding provider: {other}. Supported: local"
        ))),
    }
}

// The model is expensive to load, so one handle is shared process-wide.
// Initialization happens under the lock: concurrent first callers block until
// the single in-progress load finishes and then receive the same handle.
static SHARED_PROVIDER: Mutex<Option<Arc<dyn EmbeddingProvider>>> = Mutex::new(None);

/// Get the process-wide embedding provider, lazily initializing it on first call.
///
/// A failed load is not cached; the next caller retries.
pub fn shared_provider(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let mut guard = SHARED_PROVIDER
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(provider) = guard.as_ref() {
        return Ok(Arc::clone(provider));
    }
    let provider = create_provider(config)?;
    *guard = Some(Arc::clone(&provider));
    tracing::info!(model = %config.model, "embedding provider initialized");
    Ok(provider)
}

/// Drop the cached provider so the next call reinitializes. For tests.
pub fn reset_shared_provider() {
    let mut guard = SHARED_PROVIDER
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = None;
}

/// Cosine similarity of two unit vectors (reduces to a dot product).
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Serialize an embedding as little-endian f32 bytes for BLOB storage.
pub fn to_blob(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Deserialize an embedding BLOB. Returns `None` when the blob length does not
/// match the expected dimension count — such rows are treated as having no
/// embedding (e.g. after a model change).
pub fn from_blob(bytes: &[u8], dimensions: usize) -> Option<Vec<f32>> {
    if bytes.len() != dimensions * 4 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect(),
    )
}
