//! Core types and inputs for the tid build-target impact determinator.
//!
//! Provides the target graph model ([`graph::TargetGraph`]), the JSON-lines
//! dump loader, change-list parsing, environment (cells/config) snapshots,
//! and the determinator settings file.

pub mod changes;
pub mod env;
pub mod graph;
pub mod settings;
pub mod types;
