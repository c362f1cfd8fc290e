//! Build and search parameters.
//!
//! Both parameter sets are immutable value types built through named factory
//! functions and validated once, up front. `from_json` helpers cover the
//! boundary with an external JSON parameter resolver; inside the crate only
//! the typed structs circulate.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::prefetch::PrefetchMode;
use crate::distance::DistanceMetric;
use crate::error::{Error, Result};

/// Element type of stored vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DataType {
    /// 32-bit IEEE floats.
    #[default]
    #[serde(rename = "float32")]
    Float32,
}

/// Build-time parameters for an HNSW index.
///
/// Constructed via [`HnswParams::new`] for a static-capable index or
/// [`HnswParams::fresh`] for an index tuned for ongoing insert/remove
/// traffic. Both produce the same value type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HnswParams {
    /// Distance metric for construction and search.
    pub metric: DistanceMetric,
    /// Vector dimensionality.
    pub dim: usize,
    /// Max neighbors per node above layer 0; layer 0 allows `2 * max_degree`.
    pub max_degree: usize,
    /// Candidate frontier width during construction.
    pub ef_construction: usize,
    /// Maintain a conjugate graph fed by query feedback.
    pub use_conjugate_graph: bool,
    /// Freeze the graph after `build`, enabling lock-free reads.
    pub use_static: bool,
    /// L2-normalize vectors on ingest and queries.
    pub normalize: bool,
    /// Maintain a reverse-edge index for eager unlinking on remove.
    pub use_reversed_edges: bool,
    /// Stored element type.
    pub data_type: DataType,
    /// Default prefetch strategy, resolvable per query.
    pub prefetch_mode: PrefetchMode,
}

impl HnswParams {
    /// Standard parameters: static freeze allowed, lazy deletion.
    #[must_use]
    pub fn new(metric: DistanceMetric, dim: usize, max_degree: usize, ef_construction: usize) -> Self {
        Self {
            metric,
            dim,
            max_degree,
            ef_construction,
            use_conjugate_graph: false,
            use_static: false,
            normalize: false,
            use_reversed_edges: false,
            data_type: DataType::Float32,
            prefetch_mode: PrefetchMode::Hardcoded,
        }
    }

    /// Parameters for an index under continuous insert/remove traffic:
    /// never static, reverse edges maintained for eager unlinking.
    #[must_use]
    pub fn fresh(metric: DistanceMetric, dim: usize, max_degree: usize, ef_construction: usize) -> Self {
        Self {
            use_static: false,
            use_reversed_edges: true,
            ..Self::new(metric, dim, max_degree, ef_construction)
        }
    }

    /// Checks structural bounds. Called once by `HnswIndex::new`.
    pub fn validate(&self) -> Result<()> {
        if self.dim == 0 {
            return Err(Error::Config("dim must be > 0".into()));
        }
        if self.max_degree < 2 {
            return Err(Error::Config(format!(
                "max_degree must be >= 2, got {}",
                self.max_degree
            )));
        }
        if self.ef_construction < self.max_degree {
            return Err(Error::Config(format!(
                "ef_construction ({}) must be >= max_degree ({})",
                self.ef_construction, self.max_degree
            )));
        }
        Ok(())
    }

    /// Parses build parameters from the external resolver's JSON shape:
    /// `{"metric_type", "dim", "hnsw": {"max_degree", "ef_construction", ...}}`.
    pub fn from_json(value: &Value) -> Result<Self> {
        let metric = match value.get("metric_type").and_then(Value::as_str) {
            Some(name) => DistanceMetric::from_name(name)
                .ok_or_else(|| Error::Config(format!("unknown metric_type '{name}'")))?,
            None => DistanceMetric::default(),
        };
        let dim = require_usize(value, "dim")?;
        let hnsw = value
            .get("hnsw")
            .ok_or_else(|| Error::Config("missing 'hnsw' parameter block".into()))?;
        let max_degree = require_usize(hnsw, "max_degree")?;
        let ef_construction = require_usize(hnsw, "ef_construction")?;

        let mut params = Self::new(metric, dim, max_degree, ef_construction);
        params.use_conjugate_graph = get_bool(hnsw, "use_conjugate_graph", false);
        params.use_static = get_bool(hnsw, "use_static", false);
        params.normalize = get_bool(hnsw, "normalize", false);
        params.use_reversed_edges = get_bool(hnsw, "use_reversed_edges", false);
        params.prefetch_mode = parse_prefetch(hnsw)?;
        params.validate()?;
        Ok(params)
    }
}

/// Per-query search parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    /// Candidate frontier width at the base layer. Must be >= k.
    pub ef_search: usize,
    /// Expansion-skip threshold in `(0, 1]`; `1.0` disables skipping.
    pub skip_ratio: f32,
    /// Consult the conjugate graph for result enhancement.
    pub use_conjugate_graph_search: bool,
    /// Per-query prefetch strategy. The `Hardcoded` default defers to the
    /// index's build-time mode.
    pub prefetch_mode: PrefetchMode,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self::new(100)
    }
}

impl SearchParams {
    /// Search parameters with the given frontier width and the original
    /// defaults elsewhere (`skip_ratio = 0.9`, hardcoded prefetch).
    #[must_use]
    pub fn new(ef_search: usize) -> Self {
        Self {
            ef_search,
            skip_ratio: 0.9,
            use_conjugate_graph_search: false,
            prefetch_mode: PrefetchMode::Hardcoded,
        }
    }

    /// Replaces the skip ratio.
    #[must_use]
    pub fn with_skip_ratio(mut self, skip_ratio: f32) -> Self {
        self.skip_ratio = skip_ratio;
        self
    }

    /// Replaces the prefetch mode.
    #[must_use]
    pub fn with_prefetch(mut self, mode: PrefetchMode) -> Self {
        self.prefetch_mode = mode;
        self
    }

    /// Checks the parameters against a requested result count.
    pub fn validate(&self, k: usize) -> Result<()> {
        if self.ef_search == 0 {
            return Err(Error::Config("ef_search must be > 0".into()));
        }
        if self.ef_search < k {
            return Err(Error::Config(format!(
                "ef_search ({}) must be >= k ({k})",
                self.ef_search
            )));
        }
        if !(self.skip_ratio > 0.0 && self.skip_ratio <= 1.0) {
            return Err(Error::Config(format!(
                "skip_ratio must be in (0, 1], got {}",
                self.skip_ratio
            )));
        }
        Ok(())
    }

    /// Parses search parameters from `{"hnsw": {"ef_search", ...}}`.
    pub fn from_json(value: &Value) -> Result<Self> {
        let hnsw = value
            .get("hnsw")
            .ok_or_else(|| Error::Config("missing 'hnsw' parameter block".into()))?;
        let mut params = Self::new(require_usize(hnsw, "ef_search")?);
        if let Some(ratio) = hnsw.get("skip_ratio").and_then(Value::as_f64) {
            params.skip_ratio = ratio as f32;
        }
        params.use_conjugate_graph_search = get_bool(hnsw, "use_conjugate_graph_search", false);
        params.prefetch_mode = parse_prefetch(hnsw)?;
        Ok(params)
    }
}

fn require_usize(value: &Value, key: &str) -> Result<usize> {
    value
        .get(key)
        .and_then(Value::as_u64)
        .map(|v| v as usize)
        .ok_or_else(|| Error::Config(format!("missing or non-integer '{key}'")))
}

fn get_bool(value: &Value, key: &str, default: bool) -> bool {
    value.get(key).and_then(Value::as_bool).unwrap_or(default)
}

fn get_u32(value: &Value, key: &str, default: u32) -> u32 {
    value.get(key).and_then(Value::as_u64).map_or(default, |v| v as u32)
}

/// Parses the prefetch mode from its wire form: a `prefetch_mode` string
/// plus the three `prefetch_*` tuning keys when the mode is `custom`.
fn parse_prefetch(hnsw: &Value) -> Result<PrefetchMode> {
    match hnsw.get("prefetch_mode").and_then(Value::as_str) {
        None | Some("hardcoded") => Ok(PrefetchMode::Hardcoded),
        Some("disabled") => Ok(PrefetchMode::Disabled),
        Some("custom") => Ok(PrefetchMode::Custom {
            stride_codes: get_u32(hnsw, "prefetch_stride_codes", 1),
            depth_codes: get_u32(hnsw, "prefetch_depth_codes", 1),
            stride_visit: get_u32(hnsw, "prefetch_stride_visit", 3),
        }),
        Some(other) => Err(Error::Config(format!("unknown prefetch_mode '{other}'"))),
    }
}
