/// Default embedding dimension for the fallback provider.
pub const DEFAULT_DIMENSION: usize = 256;

/// Pluggable source of fixed-dimension, L2-normalized text embeddings.
///
/// Implementations must be deterministic for identical input when no
/// external model backs them, so evaluations replay identically in tests.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text into a normalized vector of `dimension()` length.
    fn embed(&self, text: &str) -> Vec<f32>;

    /// Embed a batch of texts. Default: element-wise `embed`.
    fn embed_batch(&self, texts: &[&str]) -> Vec<Vec<f32>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Output vector length.
    fn dimension(&self) -> usize;

    /// Provider name (for logging and provenance).
    fn name(&self) -> &str;
}

/// Cosine similarity between two vectors.
///
/// Returns 0.0 for mismatched lengths or zero-norm inputs, which reads as
/// "no similarity evidence" to the drift signal rather than an error.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
