//! Binary snapshots.
//!
//! A snapshot captures everything needed to resume identical search
//! behavior: build parameters, topology, id mappings, tombstones, raw
//! vectors and the conjugate edges. Encoding is bincode behind a version
//! tag so an incompatible or truncated file fails cleanly instead of
//! producing a half-built graph.
//!
//! File writes are atomic: serialize to a sibling `.tmp`, fsync, rename.
//! A failed save leaves any previous snapshot untouched.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use roaring::RoaringBitmap;
use rustc_hash::FxHashMap;

use super::layer::NodeId;
use super::mappings::IdMappings;
use super::params::HnswParams;
use crate::error::{Error, Result};

pub(crate) const SNAPSHOT_VERSION: u32 = 1;

/// Serialized form of a whole index.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Snapshot {
    pub(crate) version: u32,
    pub(crate) params: HnswParams,
    pub(crate) entry_point: Option<NodeId>,
    pub(crate) max_layer: usize,
    /// Layer-major adjacency: `adjacency[layer][node]`.
    pub(crate) adjacency: Vec<Vec<Vec<NodeId>>>,
    pub(crate) mappings: IdMappings,
    pub(crate) tombstones: RoaringBitmap,
    /// Row-major vector arena, one `dim`-sized slot per allocated node.
    pub(crate) vectors: Vec<f32>,
    pub(crate) conjugate: Option<FxHashMap<u64, BTreeSet<u64>>>,
}

impl Snapshot {
    /// Serializes into `writer`.
    pub(crate) fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        bincode::serialize_into(writer, self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserializes from `reader`, rejecting unknown versions.
    pub(crate) fn read_from<R: Read>(reader: R) -> Result<Self> {
        let snapshot: Self = bincode::deserialize_from(reader)
            .map_err(|e| Error::Serialization(format!("invalid snapshot: {e}")))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(Error::Serialization(format!(
                "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
                snapshot.version
            )));
        }
        snapshot.check()?;
        Ok(snapshot)
    }

    /// Atomically writes the snapshot to `path` via a sibling temp file.
    pub(crate) fn write_path(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("tmp");
        {
            let file = File::create(&tmp)?;
            let mut writer = BufWriter::new(file);
            self.write_to(&mut writer)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub(crate) fn read_path(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::read_from(BufReader::new(file))
    }

    /// Structural consistency checks beyond what bincode enforces.
    fn check(&self) -> Result<()> {
        let slots = self.adjacency.first().map_or(0, Vec::len);
        if self.params.dim == 0 || self.vectors.len() != slots * self.params.dim {
            return Err(Error::Serialization(format!(
                "vector arena size {} does not match {slots} slots of dim {}",
                self.vectors.len(),
                self.params.dim
            )));
        }
        if self.mappings.allocated() != slots {
            return Err(Error::Serialization(format!(
                "id mapping covers {} slots, adjacency covers {slots}",
                self.mappings.allocated()
            )));
        }
        if let Some(entry) = self.entry_point {
            if entry >= slots {
                return Err(Error::Serialization(format!(
                    "entry point {entry} out of range for {slots} slots"
                )));
            }
        }
        for (layer, lists) in self.adjacency.iter().enumerate() {
            for (node, neighbors) in lists.iter().enumerate() {
                if let Some(&bad) = neighbors.iter().find(|&&n| n >= slots) {
                    return Err(Error::Serialization(format!(
                        "edge {node} -> {bad} at layer {layer} out of range"
                    )));
                }
            }
        }
        Ok(())
    }
}
