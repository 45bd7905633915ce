//! Reverse-dependency propagation: BFS from root causes with depth and
//! terminality tracking.
//!
//! The traversal runs over the consumer index (union of base and diff
//! edges, diff-surviving consumers only), bounded to the universe. Each
//! frontier is expanded in label order, so equal-depth ties resolve the
//! same way in every run and the output is already sorted by
//! (depth, label) when the loop finishes.

use crate::classify::RootCause;
use std::collections::HashSet;
use tid_core::graph::{ConsumerIndex, Target, TargetGraph};
use tid_core::types::{TargetLabel, Universe};

/// One impacted target: the output unit of the engine.
#[derive(Debug, Clone)]
pub struct ImpactedTarget<'a> {
    pub target: &'a Target,
    /// Hop count from the nearest root cause; 0 for the root cause itself.
    pub depth: u64,
    /// The upstream target whose change caused this one; `None` at depth 0.
    pub affected_dep: Option<&'a TargetLabel>,
    /// The originating event, copied forward unchanged along the traversal.
    pub root_cause: RootCause,
    /// True when propagation does not continue past this node: it has no
    /// in-universe consumers, its change is not observable downstream, or
    /// the depth limit cut the traversal here.
    pub is_terminal: bool,
}

/// BFS the reverse-dependency graph from the given root causes.
///
/// Every node is visited at most once; the minimal depth wins. Records come
/// back deduplicated by label and sorted by (depth, label).
pub fn propagate<'a>(
    base: &'a TargetGraph,
    diff: &'a TargetGraph,
    root_causes: &[RootCause],
    universe: &Universe,
    depth_limit: Option<u64>,
) -> Vec<ImpactedTarget<'a>> {
    let index = ConsumerIndex::build(base, diff);

    let mut seen: HashSet<&'a TargetLabel> = HashSet::new();
    let mut frontier: Vec<(&'a Target, RootCause, Option<&'a TargetLabel>)> = Vec::new();
    for cause in root_causes {
        if let Some(target) = diff.get(&cause.target)
            && seen.insert(&target.label)
        {
            frontier.push((target, cause.clone(), None));
        }
    }

    let mut out = Vec::new();
    let mut depth: u64 = 0;
    while !frontier.is_empty() {
        frontier.sort_by(|a, b| a.0.label.cmp(&b.0.label));
        let mut next = Vec::new();

        for (target, cause, affected_dep) in frontier {
            let forwards = depth > 0 || cause.reason.propagates();
            let within_limit = depth_limit.is_none_or(|limit| depth < limit);
            let consumers: Vec<&'a Target> = index
                .consumers_of(&target.label)
                .iter()
                .copied()
                .filter(|c| c.label != target.label && universe.contains_label(&c.label))
                .collect();

            let is_terminal = !forwards || consumers.is_empty() || !within_limit;
            if forwards && within_limit {
                for consumer in &consumers {
                    if seen.insert(&consumer.label) {
                        next.push((*consumer, cause.clone(), Some(&target.label)));
                    }
                }
            }
            out.push(ImpactedTarget {
                target,
                depth,
                affected_dep,
                root_cause: cause,
                is_terminal,
            });
        }

        frontier = next;
        depth += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::RootCauseReason;

    fn label(name: &str) -> TargetLabel {
        TargetLabel::new(format!("foo//bar:{name}"))
    }

    fn target(name: &str, deps: &[&str]) -> Target {
        Target {
            deps: deps.iter().map(|d| label(d)).collect(),
            ..Target::testing(name, "foo//bar", "rust_library")
        }
    }

    fn cause(name: &str, reason: RootCauseReason) -> RootCause {
        RootCause {
            target: label(name),
            reason,
            added_labels: Vec::new(),
        }
    }

    fn run<'a>(graph: &'a TargetGraph, causes: &[RootCause]) -> Vec<ImpactedTarget<'a>> {
        propagate(graph, graph, causes, &Universe::default(), None)
    }

    fn names_by_depth(impacted: &[ImpactedTarget]) -> Vec<(u64, String)> {
        impacted
            .iter()
            .map(|i| (i.depth, i.target.label.name().to_owned()))
            .collect()
    }

    #[test]
    fn test_linear_chain() {
        // c depends on b depends on a
        let graph = TargetGraph::testing(vec![
            target("a", &[]),
            target("b", &["a"]),
            target("c", &["b"]),
        ]);
        let impacted = run(&graph, &[cause("a", RootCauseReason::Inputs)]);
        assert_eq!(
            names_by_depth(&impacted),
            vec![
                (0, "a".to_owned()),
                (1, "b".to_owned()),
                (2, "c".to_owned())
            ]
        );
        assert!(!impacted[0].is_terminal);
        assert!(!impacted[1].is_terminal);
        assert!(impacted[2].is_terminal);
        assert_eq!(impacted[1].affected_dep, Some(&label("a")));
        assert_eq!(impacted[2].affected_dep, Some(&label("b")));
        assert_eq!(impacted[0].affected_dep, None);
    }

    #[test]
    fn test_reason_copied_forward() {
        let graph = TargetGraph::testing(vec![target("a", &[]), target("b", &["a"])]);
        let impacted = run(&graph, &[cause("a", RootCauseReason::Inputs)]);
        assert_eq!(impacted[1].root_cause.target, label("a"));
        assert_eq!(impacted[1].root_cause.reason, RootCauseReason::Inputs);
    }

    #[test]
    fn test_minimal_depth_wins() {
        // d is reachable at depth 1 via a and at depth 2 via b -> c
        let graph = TargetGraph::testing(vec![
            target("a", &[]),
            target("b", &["a"]),
            target("c", &["b"]),
            target("d", &["a", "c"]),
        ]);
        let impacted = run(&graph, &[cause("a", RootCauseReason::Inputs)]);
        let d = impacted
            .iter()
            .find(|i| i.target.label == label("d"))
            .unwrap();
        assert_eq!(d.depth, 1);
        assert_eq!(impacted.len(), 4);
    }

    #[test]
    fn test_cycles_terminate() {
        let graph = TargetGraph::testing(vec![target("a", &["b"]), target("b", &["a"])]);
        let impacted = run(&graph, &[cause("a", RootCauseReason::Inputs)]);
        assert_eq!(impacted.len(), 2);
    }

    #[test]
    fn test_self_loop_is_terminal() {
        let graph = TargetGraph::testing(vec![target("a", &["a"])]);
        let impacted = run(&graph, &[cause("a", RootCauseReason::Inputs)]);
        assert_eq!(impacted.len(), 1);
        assert!(impacted[0].is_terminal);
    }

    #[test]
    fn test_labels_cause_does_not_propagate() {
        let graph = TargetGraph::testing(vec![target("a", &[]), target("b", &["a"])]);
        let impacted = run(&graph, &[cause("a", RootCauseReason::Labels)]);
        assert_eq!(impacted.len(), 1);
        assert!(impacted[0].is_terminal);
    }

    #[test]
    fn test_package_values_cause_does_not_propagate() {
        let graph = TargetGraph::testing(vec![target("a", &[]), target("b", &["a"])]);
        let impacted = run(&graph, &[cause("a", RootCauseReason::PackageValues)]);
        assert_eq!(impacted.len(), 1);
        assert!(impacted[0].is_terminal);
    }

    #[test]
    fn test_depth_limit_marks_terminal() {
        let graph = TargetGraph::testing(vec![
            target("a", &[]),
            target("b", &["a"]),
            target("c", &["b"]),
        ]);
        let impacted = propagate(
            &graph,
            &graph,
            &[cause("a", RootCauseReason::Inputs)],
            &Universe::default(),
            Some(1),
        );
        assert_eq!(
            names_by_depth(&impacted),
            vec![(0, "a".to_owned()), (1, "b".to_owned())]
        );
        assert!(impacted[1].is_terminal);
    }

    #[test]
    fn test_universe_bounds_traversal() {
        let graph = TargetGraph::testing(vec![
            target("a", &[]),
            Target {
                deps: vec![label("a")],
                ..Target::testing("consumer", "outside//pkg", "rule")
            },
        ]);
        let universe = Universe::parse(["foo//...".to_owned()]).unwrap();
        let impacted = propagate(
            &graph,
            &graph,
            &[cause("a", RootCauseReason::Inputs)],
            &universe,
            None,
        );
        assert_eq!(impacted.len(), 1);
        assert!(impacted[0].is_terminal, "only consumer is out of universe");
    }

    #[test]
    fn test_root_cause_missing_from_diff_is_skipped() {
        let graph = TargetGraph::testing(vec![target("a", &[])]);
        let impacted = run(&graph, &[cause("ghost", RootCauseReason::Inputs)]);
        assert!(impacted.is_empty());
    }

    #[test]
    fn test_output_sorted_by_depth_then_label() {
        let graph = TargetGraph::testing(vec![
            target("z_root", &[]),
            target("a_root", &[]),
            target("m_consumer", &["z_root"]),
            target("b_consumer", &["a_root"]),
        ]);
        let impacted = run(
            &graph,
            &[
                cause("z_root", RootCauseReason::Inputs),
                cause("a_root", RootCauseReason::Inputs),
            ],
        );
        assert_eq!(
            names_by_depth(&impacted),
            vec![
                (0, "a_root".to_owned()),
                (0, "z_root".to_owned()),
                (1, "b_consumer".to_owned()),
                (1, "m_consumer".to_owned()),
            ]
        );
    }
}
