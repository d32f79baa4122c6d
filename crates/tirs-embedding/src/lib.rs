//! TIRS Embedding - fixed-dimension semantic vectors for intent text.
//!
//! Provides:
//! - `EmbeddingProvider` trait for pluggable vector sources
//! - `HashEmbeddingProvider`: deterministic hash-seeded fallback used when
//!   no semantic model is available
//! - cosine similarity over normalized vectors
//!
//! The fallback path is fully deterministic for identical input so risk
//! evaluations are reproducible without a model download.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod hash_provider;
mod provider;

pub use hash_provider::HashEmbeddingProvider;
pub use provider::{cosine_similarity, EmbeddingProvider, DEFAULT_DIMENSION};
