//! GeoLens Core: near-duplicate photo grouping and zero-shot location
//! ranking over image embeddings.
//!
//! # Architecture
//!
//! Two independent, synchronous pipelines share the embedding layer:
//!
//! ```text
//! paths → VisionEmbedder → cosine matrix → greedy groups          (grouping)
//! photo → ClipEmbedder ⇄ candidate descriptions → softmax → top-k (ranking)
//! ```
//!
//! Both engines take their embedder by injection through the
//! [`ImageEmbedder`] and [`JointEmbedder`] traits, so they run against stubs
//! in tests and against ONNX models in the CLI.
//!
//! # Usage
//!
//! ```rust,ignore
//! use geolens_core::{Config, SimilarityGrouper, VisionEmbedder};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = Config::load()?;
//! let embedder = VisionEmbedder::new(&config.vision, &config.limits, &config.model_dir());
//! let mut grouper = SimilarityGrouper::new(embedder);
//!
//! let groups = grouper.compute_similarity(
//!     &paths,
//!     config.similarity.threshold,
//!     |current, total| println!("{current}/{total}"),
//!     &CancellationToken::new(),
//! )?;
//! ```

#[cfg(target_os = "macos")]
extern crate blas_src;

pub mod config;
pub mod discovery;
pub mod embedding;
pub mod error;
pub mod grouping;
pub mod locations;
pub mod math;
pub mod metadata;
pub mod output;
pub mod ranking;
pub mod types;

pub use config::Config;
pub use discovery::FileDiscovery;
pub use embedding::{ClipEmbedder, ImageEmbedder, JointEmbedder, VisionEmbedder};
pub use error::{
    ConfigError, EmbeddingError, GeoLensError, GroupingError, RankingError, Result, StoreError,
};
pub use grouping::SimilarityGrouper;
pub use locations::{CandidateSource, LocationCandidateStore};
pub use output::{OutputFormat, OutputWriter};
pub use ranking::LocationRanker;
pub use types::{LocationCandidate, LocationPrediction, SimilarityGroup};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
