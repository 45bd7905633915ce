//! Package-level rerun report.
//!
//! Compresses the impacted set into the minimal list of packages whose
//! build descriptions must be re-parsed, independent of the per-target
//! report: `+` for a package gaining previously unknown targets, `-` for a
//! package that no longer exists, `* everything` when the environment
//! invalidated the whole graph.

use crate::propagate::ImpactedTarget;
use std::collections::BTreeSet;
use tid_core::graph::TargetGraph;
use tid_core::types::{Package, Universe};

#[derive(Debug, PartialEq, Eq)]
pub enum RerunReport {
    /// A global configuration change; nothing else is reported.
    Everything,
    Delta {
        /// Packages with at least one impacted target absent from base.
        added: Vec<Package>,
        /// Packages present in base with no surviving target in diff.
        removed: Vec<Package>,
    },
}

impl RerunReport {
    pub fn compute(
        base: &TargetGraph,
        diff: &TargetGraph,
        impacted: &[ImpactedTarget],
        everything: bool,
        universe: &Universe,
    ) -> Self {
        if everything {
            return Self::Everything;
        }

        let added: BTreeSet<Package> = impacted
            .iter()
            .filter(|i| !base.contains(&i.target.label))
            .map(|i| i.target.package())
            .filter(|p| universe.contains_package(p))
            .collect();

        let diff_packages = diff.packages();
        let removed: Vec<Package> = base
            .packages()
            .into_iter()
            .filter(|p| !diff_packages.contains(p) && universe.contains_package(p))
            .collect();

        Self::Delta {
            added: added.into_iter().collect(),
            removed,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Everything => false,
            Self::Delta { added, removed } => added.is_empty() && removed.is_empty(),
        }
    }

    /// Render as newline-terminated lines, removals first, sorted by package.
    pub fn render(&self) -> String {
        match self {
            Self::Everything => "* everything\n".to_owned(),
            Self::Delta { added, removed } => {
                let mut out = String::new();
                for package in removed {
                    out.push_str(&format!("- {package}\n"));
                }
                for package in added {
                    out.push_str(&format!("+ {package}\n"));
                }
                out
            }
        }
    }
}
