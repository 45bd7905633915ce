//! Output destinations: stdout, plain files, or zstd-compressed files.
//!
//! Compression is selected by a `.zst` suffix on the destination path and
//! is invisible to everything upstream of this module.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write the rendered result to stdout or to a path.
pub fn write_output(dest: Option<&Path>, content: &str, zstd_level: i32) -> Result<()> {
    match dest {
        None => std::io::stdout()
            .lock()
            .write_all(content.as_bytes())
            .context("failed to write to stdout"),
        Some(path) => write_to_path(path, content, zstd_level),
    }
}

pub fn write_to_path(path: &Path, content: &str, zstd_level: i32) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to open `{}` for writing", path.display()))?;
    if path.extension().is_some_and(|ext| ext == "zst") {
        let mut encoder = zstd::stream::write::Encoder::new(file, zstd_level)
            .with_context(|| format!("failed to start compressed write to `{}`", path.display()))?;
        encoder
            .write_all(content.as_bytes())
            .and_then(|()| encoder.finish().map(|_| ()))
            .with_context(|| format!("failed to write compressed `{}`", path.display()))?;
    } else {
        let mut writer = BufWriter::new(file);
        writer
            .write_all(content.as_bytes())
            .and_then(|()| writer.flush())
            .with_context(|| format!("failed to write `{}`", path.display()))?;
    }
    Ok(())
}
