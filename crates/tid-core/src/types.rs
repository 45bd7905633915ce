//! Label, package, and universe-pattern types for the target graph.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A fully qualified target label: `cell//package:name`.
///
/// Labels are the graph key; ordering is lexicographic on the rendered form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetLabel(String);

impl TargetLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A label is well formed when it has a cell qualifier followed by
    /// exactly one `:` separating the package from the target name.
    pub fn is_well_formed(&self) -> bool {
        match self.0.split_once("//") {
            Some((cell, rest)) => {
                !cell.is_empty() && rest.matches(':').count() == 1 && !rest.ends_with(':')
            }
            None => false,
        }
    }

    /// The package portion, everything before the `:`.
    pub fn package(&self) -> Package {
        match self.0.rsplit_once(':') {
            Some((pkg, _)) => Package::new(pkg),
            None => Package::new(self.0.as_str()),
        }
    }

    /// The target name, everything after the `:`.
    pub fn name(&self) -> &str {
        match self.0.rsplit_once(':') {
            Some((_, name)) => name,
            None => "",
        }
    }
}

impl fmt::Display for TargetLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A package path: `cell//path/to/package`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Package(String);

impl Package {
    pub fn new(package: impl Into<String>) -> Self {
        Self(package.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn cell(&self) -> &str {
        self.0.split_once("//").map_or("", |(cell, _)| cell)
    }

    /// The cell-relative directory path of the package.
    pub fn path(&self) -> &str {
        self.0.split_once("//").map_or(self.0.as_str(), |(_, p)| p)
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors rejecting unusable universe patterns.
#[derive(Debug, Error)]
pub enum UniverseError {
    #[error(
        "Universe should not use explicit targets, only patterns like `foo//bar/...` and `foo//bar:`. Got `{0}`"
    )]
    ExplicitTarget(String),
    #[error(
        "Universe patterns must have a cell qualifier like `foo//...`, but started with `//`. Got `{0}`"
    )]
    MissingQualifier(String),
    #[error("No universe arguments or `--diff` argument, so don't know what to diff against")]
    NoUniverseOrDiff,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PatternKind {
    /// `cell//pkg/...`: the package and everything beneath it.
    Recursive,
    /// `cell//pkg:`: exactly the targets of one package.
    PackageOnly,
}

/// A single universe pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPattern {
    /// For `Recursive` a directory prefix ending in `/` (e.g. `foo//` or
    /// `foo//bar/`); for `PackageOnly` the exact package (e.g. `foo//bar`).
    prefix: String,
    kind: PatternKind,
}

impl TargetPattern {
    pub fn parse(pattern: &str) -> Result<Self, UniverseError> {
        if pattern.starts_with("//") {
            return Err(UniverseError::MissingQualifier(pattern.to_owned()));
        }
        if let Some(prefix) = pattern.strip_suffix("/...") {
            return Ok(Self {
                prefix: format!("{prefix}/"),
                kind: PatternKind::Recursive,
            });
        }
        if let Some(prefix) = pattern.strip_suffix(':') {
            return Ok(Self {
                prefix: prefix.to_owned(),
                kind: PatternKind::PackageOnly,
            });
        }
        Err(UniverseError::ExplicitTarget(pattern.to_owned()))
    }

    pub fn matches_package(&self, package: &Package) -> bool {
        match self.kind {
            PatternKind::PackageOnly => package.as_str() == self.prefix,
            PatternKind::Recursive => {
                package.as_str().starts_with(&self.prefix)
                    || self.prefix.strip_suffix('/') == Some(package.as_str())
            }
        }
    }

    pub fn matches_label(&self, label: &TargetLabel) -> bool {
        self.matches_package(&label.package())
    }
}

/// The set of target patterns bounding a computation. Empty means unrestricted.
#[derive(Debug, Clone, Default)]
pub struct Universe(Vec<TargetPattern>);

impl Universe {
    pub fn new(patterns: Vec<TargetPattern>) -> Self {
        Self(patterns)
    }

    /// Parse and validate user-supplied pattern strings.
    pub fn parse(patterns: impl IntoIterator<Item = String>) -> Result<Self, UniverseError> {
        let patterns = patterns
            .into_iter()
            .map(|p| TargetPattern::parse(&p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(patterns))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains_label(&self, label: &TargetLabel) -> bool {
        self.0.is_empty() || self.0.iter().any(|p| p.matches_label(label))
    }

    pub fn contains_package(&self, package: &Package) -> bool {
        self.0.is_empty() || self.0.iter().any(|p| p.matches_package(package))
    }

    /// Render the patterns back to their command-line form.
    pub fn patterns(&self) -> impl Iterator<Item = String> + '_ {
        self.0.iter().map(|p| match p.kind {
            PatternKind::Recursive => format!("{}...", p.prefix),
            PatternKind::PackageOnly => format!("{}:", p.prefix),
        })
    }
}
