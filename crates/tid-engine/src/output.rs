//! Serialization of impacted-target records and collected errors.
//!
//! The reason substructure has two wire encodings: the structured default
//! and a legacy terse form that collapses the root cause to a
//! `[target, reason]` pair. The choice is a single [`SchemaVersion`] value
//! rather than branching scattered through the formatter.

use crate::dangling::ValidationError;
use crate::propagate::ImpactedTarget;
use anyhow::{Context, Result};
use serde::Serialize;
use tid_core::types::TargetLabel;

use crate::classify::RootCauseReason;

/// Which wire encoding the reason substructure uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaVersion {
    /// Legacy: `root_cause` is a terse `[target, reason]` pair.
    V1,
    /// Structured: named `root_cause_target` / `root_cause_reason` fields.
    #[default]
    V2,
}

impl SchemaVersion {
    pub fn from_number(version: u32) -> Option<Self> {
        match version {
            1 => Some(Self::V1),
            2 => Some(Self::V2),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ReasonRepr<'a> {
    Structured {
        /// Empty at the root cause itself.
        affected_dep: &'a str,
        root_cause_target: &'a TargetLabel,
        root_cause_reason: RootCauseReason,
        is_terminal: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        added_labels: Option<&'a [String]>,
    },
    Legacy {
        affected_dep: &'a str,
        is_terminal: bool,
        root_cause: (&'a TargetLabel, RootCauseReason),
    },
}

/// One serialized impacted-target record. Field order is part of the format.
#[derive(Debug, Serialize)]
pub struct ImpactRecord<'a> {
    target: &'a TargetLabel,
    #[serde(rename = "type")]
    rule_type: &'a str,
    oncall: Option<&'a str>,
    depth: u64,
    labels: &'a [String],
    reason: ReasonRepr<'a>,
}

impl<'a> ImpactRecord<'a> {
    pub fn new(impacted: &'a ImpactedTarget<'a>, schema: SchemaVersion) -> Self {
        let affected_dep = impacted.affected_dep.map_or("", TargetLabel::as_str);
        let cause = &impacted.root_cause;
        let reason = match schema {
            SchemaVersion::V2 => ReasonRepr::Structured {
                affected_dep,
                root_cause_target: &cause.target,
                root_cause_reason: cause.reason,
                is_terminal: impacted.is_terminal,
                added_labels: if cause.added_labels.is_empty() {
                    None
                } else {
                    Some(&cause.added_labels)
                },
            },
            SchemaVersion::V1 => ReasonRepr::Legacy {
                affected_dep,
                is_terminal: impacted.is_terminal,
                root_cause: (&cause.target, cause.reason),
            },
        };
        Self {
            target: &impacted.target.label,
            rule_type: &impacted.target.rule_type,
            oncall: impacted.target.oncall.as_deref(),
            depth: impacted.depth,
            labels: &impacted.target.labels,
            reason,
        }
    }
}

/// Render the impacted set as a JSON array with stable field order.
pub fn render_json(impacted: &[ImpactedTarget], schema: SchemaVersion) -> Result<String> {
    let records: Vec<ImpactRecord> = impacted
        .iter()
        .map(|i| ImpactRecord::new(i, schema))
        .collect();
    let mut out =
        serde_json::to_string_pretty(&records).context("failed to serialize impacted targets")?;
    out.push('\n');
    Ok(out)
}

/// Render the impacted set as depth-grouped plain text.
pub fn render_text(impacted: &[ImpactedTarget]) -> String {
    let mut out = String::new();
    let mut current = None;
    for record in impacted {
        if current != Some(record.depth) {
            out.push_str(&format!("Level {}\n", record.depth));
            current = Some(record.depth);
        }
        out.push_str(&format!("  {}\n", record.target.label));
    }
    out
}

/// Render collected graph errors as a JSON array of tagged objects.
pub fn render_errors_json(errors: &[ValidationError]) -> Result<String> {
    let mut out =
        serde_json::to_string_pretty(errors).context("failed to serialize graph errors")?;
    out.push('\n');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::RootCause;
    use serde_json::json;
    use tid_core::graph::Target;

    fn impacted_fixture(target: &Target) -> ImpactedTarget<'_> {
        ImpactedTarget {
            target,
            depth: 3,
            affected_dep: None,
            root_cause: RootCause {
                target: TargetLabel::new("foo//me:test"),
                reason: RootCauseReason::Inputs,
                added_labels: Vec::new(),
            },
            is_terminal: false,
        }
    }

    fn fixture_target() -> Target {
        Target {
            labels: vec!["another_label".to_owned(), "my_label".to_owned()],
            oncall: Some("my_team".to_owned()),
            ..Target::testing("test", "foo//me", "rust_library")
        }
    }

    #[test]
    fn test_structured_record_shape() {
        let target = fixture_target();
        let impacted = impacted_fixture(&target);
        let record = ImpactRecord::new(&impacted, SchemaVersion::V2);
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "target": "foo//me:test",
                "type": "rust_library",
                "oncall": "my_team",
                "depth": 3,
                "labels": ["another_label", "my_label"],
                "reason": {
                    "affected_dep": "",
                    "root_cause_target": "foo//me:test",
                    "root_cause_reason": "inputs",
                    "is_terminal": false,
                }
            })
        );
    }

    #[test]
    fn test_legacy_record_shape() {
        let target = fixture_target();
        let impacted = ImpactedTarget {
            affected_dep: None,
            ..impacted_fixture(&target)
        };
        let record = ImpactRecord::new(&impacted, SchemaVersion::V1);
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "target": "foo//me:test",
                "type": "rust_library",
                "oncall": "my_team",
                "depth": 3,
                "labels": ["another_label", "my_label"],
                "reason": {
                    "affected_dep": "",
                    "is_terminal": false,
                    "root_cause": ["foo//me:test", "inputs"],
                }
            })
        );
    }

    #[test]
    fn test_added_labels_serialized_when_present() {
        let target = fixture_target();
        let mut impacted = impacted_fixture(&target);
        impacted.root_cause.reason = RootCauseReason::Labels;
        impacted.root_cause.added_labels = vec!["fresh".to_owned()];
        let value = serde_json::to_value(ImpactRecord::new(&impacted, SchemaVersion::V2)).unwrap();
        assert_eq!(value["reason"]["added_labels"], json!(["fresh"]));
        assert_eq!(value["reason"]["root_cause_reason"], json!("labels"));
    }

    #[test]
    fn test_missing_oncall_is_null() {
        let target = Target {
            oncall: None,
            ..fixture_target()
        };
        let impacted = impacted_fixture(&target);
        let value = serde_json::to_value(ImpactRecord::new(&impacted, SchemaVersion::V2)).unwrap();
        assert_eq!(value["oncall"], serde_json::Value::Null);
    }

    #[test]
    fn test_render_text_groups_by_depth() {
        let a = Target::testing("a", "foo//bar", "rule");
        let b = Target::testing("b", "foo//bar", "rule");
        let dep = TargetLabel::new("foo//bar:a");
        let records = vec![
            impacted_fixture(&a),
            ImpactedTarget {
                depth: 4,
                affected_dep: Some(&dep),
                ..impacted_fixture(&b)
            },
        ];
        assert_eq!(
            render_text(&records),
            "Level 3\n  foo//bar:a\nLevel 4\n  foo//bar:b\n"
        );
    }

    #[test]
    fn test_render_json_is_array() {
        let target = fixture_target();
        let impacted = vec![impacted_fixture(&target)];
        let out = render_json(&impacted, SchemaVersion::default()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert!(parsed.is_array());
        assert_eq!(parsed.as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_schema_version_from_number() {
        assert_eq!(SchemaVersion::from_number(1), Some(SchemaVersion::V1));
        assert_eq!(SchemaVersion::from_number(2), Some(SchemaVersion::V2));
        assert_eq!(SchemaVersion::from_number(3), None);
    }
}
