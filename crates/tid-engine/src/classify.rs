//! Root-cause classification between the base and diff graphs.
//!
//! A root cause is a target whose change is not explained by any upstream
//! dependency change. Each target gets at most one reason, chosen by a fixed
//! priority order, so the downstream consumers can branch exhaustively.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tid_core::changes::FileChanges;
use tid_core::env::EnvSnapshot;
use tid_core::graph::{Target, TargetGraph};
use tid_core::types::{TargetLabel, Universe};

/// Why a target is a root cause. Closed set; rendered snake_case on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootCauseReason {
    /// The content of the target's inputs changed.
    Inputs,
    /// The identity hash changed: the target is new, renamed, or redefined.
    Hash,
    /// The label set changed.
    Labels,
    /// The package metadata bindings changed.
    PackageValues,
}

impl RootCauseReason {
    /// Whether a change with this reason is observable to consumers. By the
    /// classification priority order, a `Labels` or `PackageValues` root
    /// cause has unchanged input and identity hashes, so nothing downstream
    /// can see it.
    pub fn propagates(self) -> bool {
        matches!(self, RootCauseReason::Inputs | RootCauseReason::Hash)
    }
}

impl fmt::Display for RootCauseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RootCauseReason::Inputs => "inputs",
            RootCauseReason::Hash => "hash",
            RootCauseReason::Labels => "labels",
            RootCauseReason::PackageValues => "package_values",
        };
        f.write_str(name)
    }
}

/// A depth-0 impact event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootCause {
    pub target: TargetLabel,
    pub reason: RootCauseReason,
    /// For `Labels`: the labels present in diff but not in base, sorted.
    pub added_labels: Vec<String>,
}

/// The classified difference between two graph snapshots.
#[derive(Debug, Default)]
pub struct ChangeSet {
    /// The environment (cells or config) changed: everything is invalidated.
    /// The rerun report collapses to `* everything`; the per-target
    /// computation below still proceeds from graph comparison.
    pub everything: bool,
    /// Root causes, ordered by target label. A target appears at most once.
    pub root_causes: Vec<RootCause>,
}

/// Classify the change between `base` and `diff`.
///
/// Targets outside the universe are excluded entirely. Per-target comparison
/// is independent and runs in parallel; the output order is the diff graph's
/// label order regardless of scheduling.
pub fn classify(
    base: &TargetGraph,
    diff: &TargetGraph,
    changes: &FileChanges,
    env_base: &EnvSnapshot,
    env_diff: &EnvSnapshot,
    universe: &Universe,
) -> ChangeSet {
    let everything = env_base.differs(env_diff);

    let candidates: Vec<&Target> = diff
        .targets()
        .filter(|t| universe.contains_label(&t.label))
        .collect();

    let root_causes = candidates
        .par_iter()
        .copied()
        .filter_map(|target| classify_target(base.get(&target.label), target, changes))
        .collect();

    ChangeSet {
        everything,
        root_causes,
    }
}

/// Pick the single reason for one diff target, or `None` if it is unchanged.
fn classify_target(
    old: Option<&Target>,
    target: &Target,
    changes: &FileChanges,
) -> Option<RootCause> {
    let cause = |reason, added_labels| {
        Some(RootCause {
            target: target.label.clone(),
            reason,
            added_labels,
        })
    };

    let Some(old) = old else {
        // Newly added: its identity hash went from absent to present.
        return cause(RootCauseReason::Hash, Vec::new());
    };

    let changed_inputs = || {
        target.input_hash != old.input_hash
            && target.inputs.iter().any(|path| changes.contains(path))
    };

    if changed_inputs() {
        cause(RootCauseReason::Inputs, Vec::new())
    } else if target.target_hash != old.target_hash {
        cause(RootCauseReason::Hash, Vec::new())
    } else if target.labels != old.labels {
        let added = target
            .labels
            .iter()
            .filter(|l| !old.labels.contains(l))
            .cloned()
            .collect();
        cause(RootCauseReason::Labels, added)
    } else if target.package_values != old.package_values {
        cause(RootCauseReason::PackageValues, Vec::new())
    } else {
        None
    }
}
