//! Target records, the dump loader, and the derived consumer index.
//!
//! A dump is a sequence of JSON records, one per line, each independently
//! decodable. Loading either succeeds completely or fails with the first
//! offending line; a partial graph is never produced.

use crate::types::{Package, TargetLabel};
use anyhow::Context;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// One target record from a dump. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub label: TargetLabel,
    /// Rule type in short form, e.g. `rust_library`.
    #[serde(rename = "type")]
    pub rule_type: String,
    /// Declared labels; an unordered set, stored and rendered sorted.
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub oncall: Option<String>,
    /// Package-level metadata bindings visible to this target.
    #[serde(default)]
    pub package_values: BTreeMap<String, String>,
    /// Direct dependencies, by label.
    #[serde(default)]
    pub deps: Vec<TargetLabel>,
    /// Root-relative paths of the files this target reads.
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Content-derived hash over the target's inputs.
    #[serde(default)]
    pub input_hash: String,
    /// Definition/identity hash: rule attributes independent of inputs.
    #[serde(default)]
    pub target_hash: String,
}

impl Target {
    pub fn package(&self) -> Package {
        self.label.package()
    }

    /// A minimal record for tests; fields are overridden with struct update.
    pub fn testing(name: &str, package: &str, rule_type: &str) -> Self {
        Self {
            label: TargetLabel::new(format!("{package}:{name}")),
            rule_type: rule_type.to_owned(),
            labels: Vec::new(),
            oncall: None,
            package_values: BTreeMap::new(),
            deps: Vec::new(),
            inputs: Vec::new(),
            input_hash: "0".to_owned(),
            target_hash: "0".to_owned(),
        }
    }
}

/// Fatal dump-corruption errors. No output is produced after either.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Malformed target record at line {line}: {message}")]
    MalformedRecord { line: usize, message: String },
    #[error("Duplicate target `{label}` in dump")]
    DuplicateTarget { label: TargetLabel },
}

/// An immutable snapshot of the build graph, keyed by target label.
#[derive(Debug, Default)]
pub struct TargetGraph {
    targets: BTreeMap<TargetLabel, Target>,
}

impl TargetGraph {
    /// Build a graph from parsed records, rejecting duplicate labels.
    /// Label sets are normalized to sorted order here, so every later
    /// rendering is deterministic.
    pub fn new(targets: Vec<Target>) -> Result<Self, GraphError> {
        let mut map = BTreeMap::new();
        for mut target in targets {
            target.labels.sort();
            target.labels.dedup();
            let label = target.label.clone();
            if map.insert(label.clone(), target).is_some() {
                return Err(GraphError::DuplicateTarget { label });
            }
        }
        Ok(Self { targets: map })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a JSON-lines dump. Blank lines are tolerated; anything else
    /// that fails to decode (including an ill-formed label) is fatal.
    /// Lines are decoded in parallel with input order preserved.
    pub fn from_dump(data: &str) -> Result<Self, GraphError> {
        let lines: Vec<(usize, &str)> = data
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .collect();
        let targets = lines
            .par_iter()
            .map(|&(idx, line)| {
                let target: Target = serde_json::from_str(line).map_err(|err| {
                    GraphError::MalformedRecord {
                        line: idx + 1,
                        message: err.to_string(),
                    }
                })?;
                if !target.label.is_well_formed() {
                    return Err(GraphError::MalformedRecord {
                        line: idx + 1,
                        message: format!("invalid target label `{}`", target.label),
                    });
                }
                Ok(target)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(targets)
    }

    /// Read a dump from disk. A `.zst` suffix is decompressed transparently.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let data = read_maybe_zstd(path)?;
        Ok(Self::from_dump(&data)?)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn get(&self, label: &TargetLabel) -> Option<&Target> {
        self.targets.get(label)
    }

    pub fn contains(&self, label: &TargetLabel) -> bool {
        self.targets.contains_key(label)
    }

    /// Targets in label order.
    pub fn targets(&self) -> impl Iterator<Item = &Target> {
        self.targets.values()
    }

    /// The distinct packages of this graph, in order.
    pub fn packages(&self) -> BTreeSet<Package> {
        self.targets.values().map(Target::package).collect()
    }

    /// A graph from fixtures; panics on duplicates, for tests only.
    pub fn testing(targets: Vec<Target>) -> Self {
        match Self::new(targets) {
            Ok(graph) => graph,
            Err(err) => panic!("bad test graph: {err}"),
        }
    }
}

fn read_maybe_zstd(path: &Path) -> anyhow::Result<String> {
    let file =
        File::open(path).with_context(|| format!("failed to read dump `{}`", path.display()))?;
    let mut data = String::new();
    if path.extension().is_some_and(|ext| ext == "zst") {
        zstd::stream::read::Decoder::new(file)
            .and_then(|mut decoder| decoder.read_to_string(&mut data))
            .with_context(|| format!("failed to decompress dump `{}`", path.display()))?;
    } else {
        let mut file = file;
        file.read_to_string(&mut data)
            .with_context(|| format!("failed to read dump `{}`", path.display()))?;
    }
    Ok(data)
}

/// Reverse-dependency index over the union of base and diff edges.
///
/// Consumers are restricted to targets that survive in the diff graph;
/// removed targets never consume anything. Both graphs stay borrowed and
/// unmodified, so the index is cheap to share between the propagation
/// engine and the dangling checker.
#[derive(Debug)]
pub struct ConsumerIndex<'a> {
    consumers: HashMap<&'a TargetLabel, Vec<&'a Target>>,
}

impl<'a> ConsumerIndex<'a> {
    pub fn build(base: &'a TargetGraph, diff: &'a TargetGraph) -> Self {
        let mut consumers: HashMap<&'a TargetLabel, Vec<&'a Target>> = HashMap::new();
        // Diff edges first, then any base edges the diff no longer carries.
        for target in diff.targets() {
            for dep in &target.deps {
                consumers.entry(dep).or_default().push(target);
            }
        }
        for old in base.targets() {
            if let Some(target) = diff.get(&old.label) {
                for dep in &old.deps {
                    consumers.entry(dep).or_default().push(target);
                }
            }
        }
        for list in consumers.values_mut() {
            list.sort_by(|a, b| a.label.cmp(&b.label));
            list.dedup_by(|a, b| a.label == b.label);
        }
        Self { consumers }
    }

    /// Direct consumers of a target, sorted by label.
    pub fn consumers_of(&self, label: &TargetLabel) -> &[&'a Target] {
        self.consumers.get(label).map_or(&[], Vec::as_slice)
    }
}
