//! `tid` binary: build-target impact determination for CI.
//!
//! Loads two graph snapshots plus the change description, runs the engine,
//! and renders the requested report. Exit status is 0 on success and
//! non-zero with a single-line message on malformed input or a fail-fast
//! dangling error.

mod output_io;
mod query;

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tid_core::changes::FileChanges;
use tid_core::env::EnvSnapshot;
use tid_core::graph::TargetGraph;
use tid_core::settings::TidSettings;
use tid_core::types::{Universe, UniverseError};
use tid_engine::dangling::check_dangling;
use tid_engine::output::{SchemaVersion, render_errors_json, render_json, render_text};
use tid_engine::rerun::RerunReport;
use tracing::info;

#[derive(Parser)]
#[command(name = "tid", about = "Build-target impact determinator")]
struct Args {
    /// File containing the cell map (JSON object) at the diff revision.
    #[arg(long, value_name = "FILE")]
    cells: Option<PathBuf>,

    /// Cell map at the base revision; defaults to `--cells`.
    #[arg(long, value_name = "FILE")]
    base_cells: Option<PathBuf>,

    /// File containing the flattened configuration (JSON object) at the diff revision.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Configuration at the base revision; defaults to `--config`.
    #[arg(long, value_name = "FILE")]
    base_config: Option<PathBuf>,

    /// File containing the change list (`A|M|R <path>` lines, root-relative).
    #[arg(long, value_name = "FILE")]
    changes: PathBuf,

    /// File containing the target dump at the base revision.
    #[arg(long, value_name = "FILE")]
    base: PathBuf,

    /// File containing the target dump at the diff revision.
    /// If missing, the build tool is queried over the universe instead.
    #[arg(long, value_name = "FILE")]
    diff: Option<PathBuf>,

    /// Patterns bounding the targets of interest, e.g. `root//...`.
    #[arg(long, value_name = "TARGET_PATTERN")]
    universe: Vec<String>,

    /// Patterns bounding the targets of interest (positional form).
    #[arg(value_name = "TARGET_PATTERN")]
    universe_args: Vec<String>,

    /// Number of dependency levels to explore (default: no limit).
    #[arg(long, value_name = "INT")]
    depth: Option<u64>,

    /// Print impacted targets as JSON instead of plain text.
    #[arg(long)]
    json: bool,

    /// Print the package-level rerun report instead of impacted targets.
    #[arg(long)]
    print_rerun: bool,

    /// Check for references to deleted targets; fail fast on the first.
    #[arg(long)]
    check_dangling: bool,

    /// Collect all graph errors into this file instead of failing fast.
    #[arg(long, value_name = "FILE")]
    write_errors_to_file: Option<PathBuf>,

    /// Output destination; a `.zst` suffix compresses. Defaults to stdout.
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// The build tool command used to produce the diff dump in live mode.
    #[arg(long, default_value = "buck2")]
    tool: String,

    /// Extra arguments passed through to the build tool.
    #[arg(long, value_name = "ARG")]
    tool_arg: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    run(Args::parse())
}

fn run(args: Args) -> Result<()> {
    let settings = TidSettings::load(Path::new("."))?;

    let t = Instant::now();
    let step = |name: &str| info!("starting {} at {:.3}s", name, t.elapsed().as_secs_f64());

    step("validating universe");
    let universe = Universe::parse(args.universe.into_iter().chain(args.universe_args))?;
    if args.diff.is_none() && universe.is_empty() {
        return Err(UniverseError::NoUniverseOrDiff.into());
    }

    step("reading environment");
    let env_diff = EnvSnapshot::from_files(args.cells.as_deref(), args.config.as_deref())?;
    let env_base = EnvSnapshot::from_files(
        args.base_cells.as_deref().or(args.cells.as_deref()),
        args.base_config.as_deref().or(args.config.as_deref()),
    )?;

    step("reading changes");
    let changes = FileChanges::from_file(&args.changes)?;

    step("reading base");
    let base = TargetGraph::from_file(&args.base)?;

    let diff = match &args.diff {
        Some(path) => {
            step("reading diff");
            TargetGraph::from_file(path)?
        }
        None => {
            step("querying diff targets");
            query::query_targets(&args.tool, &args.tool_arg, &universe)?
        }
    };

    step("computing impact");
    let depth = args.depth.or(settings.engine.depth);
    let result = tid_engine::determine(
        &base, &diff, &changes, &env_base, &env_diff, &universe, depth,
    );

    if let Some(error_file) = &args.write_errors_to_file {
        // Collect-and-report mode: every error goes to the file, the run
        // itself succeeds, disposition is the caller's problem.
        step("collecting graph errors");
        let errors = check_dangling(&base, &diff, &universe);
        output_io::write_to_path(
            error_file,
            &render_errors_json(&errors)?,
            settings.output.zstd_level,
        )?;
    } else if args.check_dangling || settings.engine.check_dangling {
        step("dangling check");
        let errors = check_dangling(&base, &diff, &universe);
        if let Some(first) = errors.first() {
            return Err(anyhow::anyhow!("{first}"));
        }
    }

    step("rendering output");
    let rendered = if args.print_rerun {
        RerunReport::compute(
            &base,
            &diff,
            &result.impacted,
            result.change_set.everything,
            &universe,
        )
        .render()
    } else if args.json {
        let schema =
            SchemaVersion::from_number(settings.output.schema_version).unwrap_or_default();
        render_json(&result.impacted, schema)?
    } else {
        render_text(&result.impacted)
    };
    output_io::write_output(args.output.as_deref(), &rendered, settings.output.zstd_level)?;

    info!(
        "finished with {} impacted targets at {:.3}s",
        result.impacted.len(),
        t.elapsed().as_secs_f64()
    );
    Ok(())
}
