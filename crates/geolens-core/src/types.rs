//! Core data types produced by the grouping and ranking engines.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A set of near-duplicate images.
///
/// `images[0]` is the seed: every other member had similarity at or above the
/// threshold to it. Members are not guaranteed to clear the threshold against
/// each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityGroup {
    /// Seed first, then collected members in input order
    pub images: Vec<PathBuf>,

    /// Mean cosine similarity over every unordered pair of members
    pub avg_similarity: f32,
}

impl SimilarityGroup {
    /// The image that seeded this group.
    pub fn seed(&self) -> &PathBuf {
        &self.images[0]
    }

    /// Number of images in the group (always at least 2).
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Groups are never empty; provided for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// A stored candidate location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationCandidate {
    /// Latitude in decimal degrees (-90 to 90)
    pub latitude: f64,

    /// Longitude in decimal degrees (-180 to 180)
    pub longitude: f64,

    /// Natural-language description scored against the image
    pub description: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// A ranked location guess for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationPrediction {
    pub latitude: f64,
    pub longitude: f64,

    /// Softmax probability over the full candidate set (0.0 - 1.0)
    pub confidence: f32,

    /// Description of the matched candidate
    pub description: String,
}
