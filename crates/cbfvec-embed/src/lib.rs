//! cbfvec pixel embeddings
//!
//! Reduces a decoded diffraction image of any size to a fixed-length,
//! unit-norm `f32` vector suitable for cosine similarity search. The
//! transform is hand-crafted and has no model dependency: identical input
//! always yields an identical vector.
//!
//! ```
//! use cbfvec_embed::FeatureEmbedder;
//!
//! let embedder = FeatureEmbedder::new(4).unwrap();
//! let vector = embedder.embed(&[0, 10, 20, 30, 40, 50], 3, 2).unwrap();
//! assert_eq!(vector.len(), 16);
//! ```

pub mod embedder;
pub mod error;
pub mod resample;

pub use embedder::{
    embed_pixels, l2_norm, l2_normalize, FeatureEmbedder, DEFAULT_TARGET_SIZE, NORM_EPSILON,
};
pub use error::{EmbedError, EmbedResult};
