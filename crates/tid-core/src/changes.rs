//! Parsing and indexing of version-control change lists.
//!
//! The input is the status format produced by the VCS: one entry per line,
//! `A <path>`, `M <path>`, or `R <path>`, paths root-relative.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

/// One changed file, root-relative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedPath {
    pub kind: ChangeKind,
    pub path: String,
}

#[derive(Debug, Error)]
#[error("Unrecognized change entry at line {line}: `{text}`")]
pub struct ChangeParseError {
    pub line: usize,
    pub text: String,
}

/// The full change list with constant-time path membership.
#[derive(Debug, Default)]
pub struct FileChanges {
    entries: Vec<ChangedPath>,
    paths: HashSet<String>,
}

impl FileChanges {
    pub fn new(entries: Vec<ChangedPath>) -> Self {
        let paths = entries.iter().map(|e| e.path.clone()).collect();
        Self { entries, paths }
    }

    pub fn parse(data: &str) -> Result<Self, ChangeParseError> {
        let mut entries = Vec::new();
        for (idx, line) in data.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let err = || ChangeParseError {
                line: idx + 1,
                text: line.to_owned(),
            };
            let (tag, path) = line.split_once(' ').ok_or_else(err)?;
            let kind = match tag {
                "A" => ChangeKind::Added,
                "M" => ChangeKind::Modified,
                "R" => ChangeKind::Removed,
                _ => return Err(err()),
            };
            entries.push(ChangedPath {
                kind,
                path: path.to_owned(),
            });
        }
        Ok(Self::new(entries))
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read change list `{}`", path.display()))?;
        Ok(Self::parse(&data)?)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ChangedPath] {
        &self.entries
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.path.as_str())
    }

    /// Whether the given root-relative path changed in any way.
    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }
}
