use std::collections::HashMap;
use std::sync::Once;

use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::warn;

use crate::provider::{EmbeddingProvider, DEFAULT_DIMENSION};

/// Default bound on cached embeddings.
const DEFAULT_CACHE_CAPACITY: usize = 2048;

static FALLBACK_WARNING: Once = Once::new();

/// Deterministic fallback embedding provider.
///
/// Derives a seed from a blake3 hash of the text, generates a pseudo-random
/// base vector, then perturbs dimensions with word-level hash features so
/// texts sharing vocabulary land closer together than unrelated texts.
/// Identical input always yields the identical vector.
///
/// The cache is purely an optimization: dropping it never changes results.
pub struct HashEmbeddingProvider {
    dimension: usize,
    cache_capacity: usize,
    cache: RwLock<HashMap<[u8; 32], Vec<f32>>>,
}

impl HashEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Number of vectors currently cached.
    pub fn cached_len(&self) -> usize {
        self.cache.read().len()
    }

    fn generate(&self, text: &str) -> Vec<f32> {
        let seed: [u8; 32] = *blake3::hash(text.as_bytes()).as_bytes();
        let mut rng = StdRng::from_seed(seed);
        let mut vector: Vec<f32> = (0..self.dimension)
            .map(|_| rng.gen_range(-1.0f32..1.0f32))
            .collect();

        // Word-level perturbation: shared vocabulary pulls vectors together.
        for word in text.split_whitespace() {
            let h = blake3::hash(word.to_lowercase().as_bytes());
            let bytes = h.as_bytes();
            let idx = u64::from_le_bytes(bytes[..8].try_into().unwrap_or([0u8; 8])) as usize
                % self.dimension;
            let raw = u32::from_le_bytes(bytes[8..12].try_into().unwrap_or([0u8; 4]));
            let bump = (raw as f32 / u32::MAX as f32) * 2.0 - 1.0;
            vector[idx] += bump * 0.5;
        }

        l2_normalize(&mut vector);
        vector
    }
}

impl Default for HashEmbeddingProvider {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

impl EmbeddingProvider for HashEmbeddingProvider {
    fn embed(&self, text: &str) -> Vec<f32> {
        FALLBACK_WARNING.call_once(|| {
            warn!("no semantic embedding model configured, using deterministic fallback vectors");
        });

        let key: [u8; 32] = *blake3::hash(text.as_bytes()).as_bytes();
        if let Some(cached) = self.cache.read().get(&key) {
            return cached.clone();
        }

        let vector = self.generate(text);

        let mut cache = self.cache.write();
        if cache.len() >= self.cache_capacity {
            cache.clear();
        }
        cache.insert(key, vector.clone());
        vector
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "hash-fallback"
    }
}

fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm <= f32::EPSILON {
        // Degenerate input; fix a unit axis so downstream cosine stays defined.
        if let Some(first) = vector.first_mut() {
            *first = 1.0;
        }
        return;
    }
    for v in vector.iter_mut() {
        *v /= norm;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::cosine_similarity;

    #[test]
    fn identical_text_embeds_identically() {
        let provider = HashEmbeddingProvider::new(64);
        let a = provider.embed("transfer funds to vendor account");
        let b = provider.embed("transfer funds to vendor account");
        assert_eq!(a, b);
    }

    #[test]
    fn output_is_normalized() {
        let provider = HashEmbeddingProvider::new(128);
        let v = provider.embed("approve purchase order");
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4, "norm was {norm}");
    }

    #[test]
    fn shared_vocabulary_is_closer_than_unrelated_text() {
        let provider = HashEmbeddingProvider::new(256);
        let base = provider.embed("submit expense report for travel");
        let related = provider.embed("submit expense report for meals");
        let unrelated = provider.embed("rotate production database credentials");
        let sim_related = cosine_similarity(&base, &related);
        let sim_unrelated = cosine_similarity(&base, &unrelated);
        assert!(
            sim_related > sim_unrelated,
            "related {sim_related} should exceed unrelated {sim_unrelated}"
        );
    }

    #[test]
    fn cache_is_bounded() {
        let provider = HashEmbeddingProvider::new(16).with_cache_capacity(8);
        for i in 0..50 {
            provider.embed(&format!("intent number {i}"));
        }
        assert!(provider.cached_len() <= 8);
    }

    #[test]
    fn embed_batch_matches_embed() {
        let provider = HashEmbeddingProvider::new(32);
        let batch = provider.embed_batch(&["alpha", "beta"]);
        assert_eq!(batch[0], provider.embed("alpha"));
        assert_eq!(batch[1], provider.embed("beta"));
    }

    #[test]
    fn dimension_is_respected() {
        let provider = HashEmbeddingProvider::new(77);
        assert_eq!(provider.embed("check dimension").len(), 77);
        assert_eq!(provider.dimension(), 77);
    }
}
