//! Cell and configuration snapshots from build-tool audit output.
//!
//! Both inputs are flat JSON objects (string to string). A snapshot pair is
//! taken per revision; any difference between the base and diff pair means
//! the whole graph is invalidated.

use anyhow::Context;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// The environment a graph snapshot was produced under.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    /// Cell name to root path.
    pub cells: BTreeMap<String, String>,
    /// Flattened configuration key to value.
    pub config: BTreeMap<String, String>,
}

impl EnvSnapshot {
    pub fn new(cells: BTreeMap<String, String>, config: BTreeMap<String, String>) -> Self {
        Self { cells, config }
    }

    /// Load a snapshot from optional cell-map and config files; a missing
    /// file contributes an empty map.
    pub fn from_files(cells: Option<&Path>, config: Option<&Path>) -> anyhow::Result<Self> {
        Ok(Self {
            cells: match cells {
                Some(path) => read_flat_map(path)?,
                None => BTreeMap::new(),
            },
            config: match config {
                Some(path) => read_flat_map(path)?,
                None => BTreeMap::new(),
            },
        })
    }

    /// Whether anything observable changed between the two environments.
    pub fn differs(&self, other: &EnvSnapshot) -> bool {
        self.cells != other.cells || self.config != other.config
    }
}

fn read_flat_map(path: &Path) -> anyhow::Result<BTreeMap<String, String>> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read `{}`", path.display()))?;
    serde_json::from_str(&data)
        .with_context(|| format!("failed to parse `{}` as a flat JSON object", path.display()))
}
