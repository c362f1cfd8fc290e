//! Distance metrics.
//!
//! Scalar reference kernels for the metrics the index supports. The index
//! only consumes [`DistanceMetric::distance`]; swapping in a SIMD codec is a
//! storage-layer concern and does not touch the graph algorithms.
//!
//! Conventions: every metric is a *distance* (lower is better). Euclidean is
//! squared L2; cosine and dot product are mapped to `1 - similarity`.

use serde::{Deserialize, Serialize};

/// Distance metric used for both construction and search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Squared Euclidean (L2) distance.
    #[default]
    #[serde(rename = "l2")]
    Euclidean,
    /// Cosine distance, `1 - cos(a, b)`.
    Cosine,
    /// Inner-product distance, `1 - <a, b>`.
    #[serde(rename = "ip")]
    DotProduct,
}

impl DistanceMetric {
    /// Computes the distance between two vectors of equal length.
    #[inline]
    #[must_use]
    pub fn distance(self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len());
        match self {
            Self::Euclidean => euclidean_sq(a, b),
            Self::Cosine => cosine_distance(a, b),
            Self::DotProduct => 1.0 - dot(a, b),
        }
    }

    /// Parses the metric from its wire name (`"l2"`, `"cosine"`, `"ip"`).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "l2" => Some(Self::Euclidean),
            "cosine" => Some(Self::Cosine),
            "ip" => Some(Self::DotProduct),
            _ => None,
        }
    }
}

/// Squared Euclidean distance.
#[inline]
#[must_use]
pub fn euclidean_sq(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Dot product.
#[inline]
#[must_use]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Cosine distance, `1 - cos(a, b)`. Zero vectors are treated as orthogonal.
#[inline]
#[must_use]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot_ab = dot(a, b);
    let norm_a = dot(a, a).sqrt();
    let norm_b = dot(b, b).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot_ab / (norm_a * norm_b)
}

/// L2-normalizes a vector in place. Zero vectors are left untouched.
pub fn normalize(v: &mut [f32]) {
    let norm = dot(v, v).sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
