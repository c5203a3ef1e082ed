// ============================================================
// Layer 4 — Dataset Splits
// ============================================================
// A data root holds one directory per split (train / dev / test)
// with parallel, row-aligned columns:
//
//   <root>/<split>/uni.npy    int32   [N, max_len]  hashed token ids (0 = pad)
//   <root>/<split>/w_uni.npy  float32 [N, max_len]  per-token weights
//   <root>/<split>/cate.npy   int64   [N]           dense class index (labelled splits)
//   <root>/<split>/pid.txt    N lines               product ids      (test / dev)
//
// Every column present must have the same N.

use anyhow::{Context, Result};
use ndarray::{s, Array1, Array2};
#[cfg(test)]
use ndarray::{ArrayView1, ArrayView2};
use ndarray_npy::read_npy;
#[cfg(test)]
use ndarray_npy::write_npy;
use std::{
    fs,
    ops::Range,
    path::{Path, PathBuf},
};
use thiserror::Error;

pub const UNI_FILE:   &str = "uni.npy";
pub const W_UNI_FILE: &str = "w_uni.npy";
pub const CATE_FILE:  &str = "cate.npy";
pub const PID_FILE:   &str = "pid.txt";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DatasetError {
    #[error("column '{column}' has {rows} rows, expected {expected}")]
    RowCount { column: &'static str, rows: usize, expected: usize },

    #[error("uni has width {uni} but w_uni has width {w_uni}")]
    WidthMismatch { uni: usize, w_uni: usize },

    #[error("split '{split}' has no '{column}' column")]
    MissingColumn { split: String, column: &'static str },
}

/// One named split, fully loaded into memory.
#[derive(Debug, Clone)]
pub struct Split {
    name:  String,
    uni:   Array2<i32>,
    w_uni: Array2<f32>,
    cate:  Option<Array1<i64>>,
    pid:   Option<Vec<String>>,
}

impl Split {
    pub fn new(
        name:  impl Into<String>,
        uni:   Array2<i32>,
        w_uni: Array2<f32>,
        cate:  Option<Array1<i64>>,
        pid:   Option<Vec<String>>,
    ) -> Result<Self, DatasetError> {
        let rows = uni.nrows();

        if w_uni.nrows() != rows {
            return Err(DatasetError::RowCount { column: "w_uni", rows: w_uni.nrows(), expected: rows });
        }
        if uni.ncols() != w_uni.ncols() {
            return Err(DatasetError::WidthMismatch { uni: uni.ncols(), w_uni: w_uni.ncols() });
        }
        if let Some(cate) = &cate {
            if cate.len() != rows {
                return Err(DatasetError::RowCount { column: "cate", rows: cate.len(), expected: rows });
            }
        }
        if let Some(pid) = &pid {
            if pid.len() != rows {
                return Err(DatasetError::RowCount { column: "pid", rows: pid.len(), expected: rows });
            }
        }

        Ok(Self { name: name.into(), uni, w_uni, cate, pid })
    }

    /// Load `<root>/<name>/`. `uni` and `w_uni` are required;
    /// `cate` and `pid` are read when their files exist.
    pub fn open(root: impl AsRef<Path>, name: &str) -> Result<Self> {
        let dir = root.as_ref().join(name);
        if !dir.is_dir() {
            anyhow::bail!("Split directory '{}' does not exist", dir.display());
        }

        let uni: Array2<i32> = read_npy(dir.join(UNI_FILE))
            .with_context(|| format!("Cannot read '{}'", dir.join(UNI_FILE).display()))?;
        let w_uni: Array2<f32> = read_npy(dir.join(W_UNI_FILE))
            .with_context(|| format!("Cannot read '{}'", dir.join(W_UNI_FILE).display()))?;

        let cate_path = dir.join(CATE_FILE);
        let cate: Option<Array1<i64>> = if cate_path.exists() {
            Some(read_npy(&cate_path)
                .with_context(|| format!("Cannot read '{}'", cate_path.display()))?)
        } else {
            None
        };

        let pid = if dir.join(PID_FILE).exists() {
            Some(read_pid_file(&dir)?)
        } else {
            None
        };

        let split = Split::new(name, uni, w_uni, cate, pid)
            .with_context(|| format!("Inconsistent split '{}'", dir.display()))?;

        tracing::debug!(
            "Opened split '{}': {} rows, max_len={}, labelled={}, pids={}",
            name, split.rows(), split.max_len(), split.cate.is_some(), split.pid.is_some(),
        );
        Ok(split)
    }

    /// Write this split under `<root>/<name>/` in the on-disk layout
    #[cfg(test)]
    pub fn save(&self, root: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = root.as_ref().join(&self.name);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create '{}'", dir.display()))?;

        write_npy(dir.join(UNI_FILE), &self.uni)
            .with_context(|| format!("Cannot write '{}'", dir.join(UNI_FILE).display()))?;
        write_npy(dir.join(W_UNI_FILE), &self.w_uni)
            .with_context(|| format!("Cannot write '{}'", dir.join(W_UNI_FILE).display()))?;
        if let Some(cate) = &self.cate {
            write_npy(dir.join(CATE_FILE), cate)
                .with_context(|| format!("Cannot write '{}'", dir.join(CATE_FILE).display()))?;
        }
        if let Some(pid) = &self.pid {
            let text: String = pid.iter().map(|p| format!("{p}\n")).collect();
            fs::write(dir.join(PID_FILE), text)
                .with_context(|| format!("Cannot write '{}'", dir.join(PID_FILE).display()))?;
        }
        Ok(dir)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> usize {
        self.uni.nrows()
    }

    pub fn max_len(&self) -> usize {
        self.uni.ncols()
    }

    #[cfg(test)]
    pub fn uni(&self) -> ArrayView2<'_, i32> {
        self.uni.view()
    }

    #[cfg(test)]
    pub fn w_uni(&self) -> ArrayView2<'_, f32> {
        self.w_uni.view()
    }

    #[cfg(test)]
    pub fn cate(&self) -> Option<ArrayView1<'_, i64>> {
        self.cate.as_ref().map(|c| c.view())
    }

    pub fn pid(&self) -> Option<&[String]> {
        self.pid.as_deref()
    }

    pub fn is_labelled(&self) -> bool {
        self.cate.is_some()
    }

    /// The `pid` column, or an error naming the split
    pub fn require_pid(&self) -> Result<&[String], DatasetError> {
        self.pid().ok_or_else(|| DatasetError::MissingColumn {
            split:  self.name.clone(),
            column: "pid",
        })
    }

    /// Copy rows `range` of the feature columns (and labels, if any)
    pub fn slice_rows(
        &self,
        range: Range<usize>,
    ) -> (Array2<i32>, Array2<f32>, Option<Array1<i64>>) {
        let uni   = self.uni.slice(s![range.clone(), ..]).to_owned();
        let w_uni = self.w_uni.slice(s![range.clone(), ..]).to_owned();
        let cate  = self.cate.as_ref().map(|c| c.slice(s![range]).to_owned());
        (uni, w_uni, cate)
    }
}

fn read_pid_file(dir: &Path) -> Result<Vec<String>> {
    let path = dir.join(PID_FILE);
    let text = fs::read_to_string(&path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    // a lone line break is a zero-row column, not one empty pid
    if text.trim_end_matches(['\r', '\n']).is_empty() {
        return Ok(Vec::new());
    }
    Ok(text.lines().map(str::to_string).collect())
}

/// Read only the pid column of `<root>/<split>/`
pub fn load_pid_column(root: impl AsRef<Path>, split: &str) -> Result<Vec<String>> {
    read_pid_file(&root.as_ref().join(split))
}

/// Concatenate the pid column of every shard, in shard order then row order
pub fn load_pid_universe(shards: &[PathBuf], split: &str) -> Result<Vec<String>> {
    let mut universe = Vec::new();
    for shard in shards {
        let pids = load_pid_column(shard, split)?;
        tracing::debug!("Shard '{}': {} product ids", shard.display(), pids.len());
        universe.extend(pids);
    }
    Ok(universe)
}
