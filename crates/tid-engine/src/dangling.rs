//! Detection of references to deleted targets.
//!
//! Removing a target that surviving targets still depend on breaks the
//! graph. The check is bounded to the universe: edges pointing outside it
//! cannot be validated by construction. Each deleted target is reported at
//! most once, paired with one referencing target.

use serde::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;
use tid_core::graph::TargetGraph;
use tid_core::types::{TargetLabel, Universe};

/// Graph-integrity errors, serializable as tagged objects for file mode.
#[derive(Debug, Error, Serialize, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Target '{deleted}' was deleted but is referenced by '{referenced_by}'")]
    TargetDeleted {
        deleted: TargetLabel,
        referenced_by: TargetLabel,
    },
}

/// Find every target removed between base and diff that a surviving diff
/// target still references. Deterministic order: referencing targets are
/// walked in label order, their dependency lists in declaration order.
pub fn check_dangling(
    base: &TargetGraph,
    diff: &TargetGraph,
    universe: &Universe,
) -> Vec<ValidationError> {
    let mut deleted: BTreeSet<&TargetLabel> = base
        .targets()
        .filter(|t| !diff.contains(&t.label) && universe.contains_label(&t.label))
        .map(|t| &t.label)
        .collect();

    let mut errors = Vec::new();
    if deleted.is_empty() {
        return errors;
    }

    for target in diff.targets() {
        for dep in &target.deps {
            // remove so each deleted target is reported at most once
            if universe.contains_label(dep) && deleted.remove(dep) {
                errors.push(ValidationError::TargetDeleted {
                    deleted: dep.clone(),
                    referenced_by: target.label.clone(),
                });
            }
        }
        if deleted.is_empty() {
            break;
        }
    }

    errors
}
