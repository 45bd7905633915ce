//! Impact computation engine for the tid build-target determinator.
//!
//! One computation consumes two immutable graph snapshots plus a fixed
//! change description and produces one result. Both invocation modes
//! (pre-supplied diff dump or live target query) go through [`determine`],
//! so their serialized output is identical by construction.

pub mod classify;
pub mod dangling;
pub mod output;
pub mod propagate;
pub mod rerun;

use std::collections::BTreeMap;
use tid_core::changes::FileChanges;
use tid_core::env::EnvSnapshot;
use tid_core::graph::TargetGraph;
use tid_core::types::Universe;
use tracing::info;

use crate::classify::{ChangeSet, RootCauseReason};
use crate::propagate::ImpactedTarget;

/// The result of one impact computation.
#[derive(Debug)]
pub struct Determination<'a> {
    pub change_set: ChangeSet,
    /// Impacted records, deduplicated and sorted by (depth, label).
    pub impacted: Vec<ImpactedTarget<'a>>,
}

/// Run the full classify-then-propagate pipeline.
pub fn determine<'a>(
    base: &'a TargetGraph,
    diff: &'a TargetGraph,
    changes: &FileChanges,
    env_base: &EnvSnapshot,
    env_diff: &EnvSnapshot,
    universe: &Universe,
    depth: Option<u64>,
) -> Determination<'a> {
    info!(
        "classifying changes across {} base / {} diff targets",
        base.len(),
        diff.len()
    );
    let change_set = classify::classify(base, diff, changes, env_base, env_diff, universe);
    if change_set.everything {
        info!("environment changed, everything is invalidated");
    }

    let impacted = propagate::propagate(base, diff, &change_set.root_causes, universe, depth);

    let mut reason_counts: BTreeMap<RootCauseReason, usize> = BTreeMap::new();
    for cause in &change_set.root_causes {
        *reason_counts.entry(cause.reason).or_default() += 1;
    }
    info!(
        "{} root causes ({}), {} impacted targets",
        change_set.root_causes.len(),
        reason_counts
            .iter()
            .map(|(reason, count)| format!("{reason}: {count}"))
            .collect::<Vec<_>>()
            .join(", "),
        impacted.len()
    );

    Determination {
        change_set,
        impacted,
    }
}
