//! Live diff-dump production by querying the build tool.
//!
//! Used when no `--diff` file is supplied: the configured tool is asked to
//! dump targets over the universe, and the result goes through the same
//! loader and pipeline as a pre-supplied dump.

use anyhow::{Context, Result};
use std::process::Command;
use tempfile::NamedTempFile;
use tid_core::graph::TargetGraph;
use tid_core::types::Universe;
use tracing::info;

pub fn query_targets(tool: &str, extra_args: &[String], universe: &Universe) -> Result<TargetGraph> {
    let out_file =
        NamedTempFile::new().context("failed to create scratch file for target query")?;
    let mut command = Command::new(tool);
    command
        .arg("targets")
        .args(extra_args)
        .arg("--output")
        .arg(out_file.path());
    for pattern in universe.patterns() {
        command.arg(pattern);
    }

    info!("querying `{tool} targets` over the universe");
    let status = command
        .status()
        .with_context(|| format!("failed to run `{tool}`"))?;
    if !status.success() {
        anyhow::bail!("`{tool} targets` exited with {status}");
    }
    TargetGraph::from_file(out_file.path())
}
