// ============================================================
// Layer 6 — Prediction Output
// ============================================================
// Writes the tab-separated result file. Lines go to a sibling
// temp file first and are moved into place only when complete,
// so a crash mid-write never leaves a truncated result behind.
// A failed write removes its temp file.

use anyhow::{Context, Result};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

/// Write every line followed by '\n'; returns the line count
pub fn write_lines<I>(out_path: &Path, lines: I) -> Result<usize>
where
    I: IntoIterator<Item = String>,
{
    if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create '{}'", parent.display()))?;
    }

    let tmp_path = temp_sibling(out_path);
    let result = write_temp(&tmp_path, lines).and_then(|count| {
        fs::rename(&tmp_path, out_path)
            .with_context(|| format!("Cannot move result into '{}'", out_path.display()))?;
        Ok(count)
    });
    if result.is_err() {
        // best effort, the write error is what gets reported
        let _ = fs::remove_file(&tmp_path);
    }
    let count = result?;

    tracing::info!("Wrote {} lines to '{}'", count, out_path.display());
    Ok(count)
}

fn write_temp<I>(tmp_path: &Path, lines: I) -> Result<usize>
where
    I: IntoIterator<Item = String>,
{
    let file = File::create(tmp_path)
        .with_context(|| format!("Cannot create '{}'", tmp_path.display()))?;
    let mut w = BufWriter::new(file);
    let mut count = 0usize;
    for line in lines {
        writeln!(w, "{line}")
            .with_context(|| format!("Cannot write '{}'", tmp_path.display()))?;
        count += 1;
    }
    w.flush()
        .with_context(|| format!("Cannot write '{}'", tmp_path.display()))?;
    Ok(count)
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
