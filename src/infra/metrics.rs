// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// The training monitor: appends scalar summaries to CSV files
// under the log directory for external plotting.
//
//   <log_dir>/metrics.csv   one row per epoch
//     epoch,loss,top1_acc,val_loss,val_top1_acc,lr
//     1,0.031204,0.412000,0.029871,0.455000,0.000100
//
//   <log_dir>/steps.csv     one row per optimizer step
//     step,epoch,loss
//
// Purely observational: nothing here feeds back into training.

use anyhow::{Context, Result};
use std::{
    fs::{self, File, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

const EPOCH_HEADER: &str = "epoch,loss,top1_acc,val_loss,val_top1_acc,lr";
const STEP_HEADER:  &str = "step,epoch,loss";

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Mean binary cross-entropy over the epoch's training steps
    pub loss: f64,

    /// Fraction of training rows whose arg-max matched the label
    pub top1_acc: f64,

    pub val_loss: f64,

    pub val_top1_acc: f64,

    /// Learning rate the epoch was trained with
    pub lr: f64,
}

impl EpochMetrics {
    pub fn new(
        epoch:        usize,
        loss:         f64,
        top1_acc:     f64,
        val_loss:     f64,
        val_top1_acc: f64,
        lr:           f64,
    ) -> Self {
        Self { epoch, loss, top1_acc, val_loss, val_top1_acc, lr }
    }
}

/// Running mean of loss and top-1 hits over a sequence of batches.
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    loss_sum: f64,
    batches:  usize,
    hits:     usize,
    rows:     usize,
}

impl Accumulator {
    pub fn add(&mut self, batch_loss: f64, hits: usize, rows: usize) {
        self.loss_sum += batch_loss;
        self.batches  += 1;
        self.hits     += hits;
        self.rows     += rows;
    }

    pub fn mean_loss(&self) -> f64 {
        if self.batches > 0 { self.loss_sum / self.batches as f64 } else { f64::NAN }
    }

    pub fn top1_acc(&self) -> f64 {
        if self.rows > 0 { self.hits as f64 / self.rows as f64 } else { 0.0 }
    }
}

/// Writes epoch and step scalars to CSV files in the log directory.
pub struct MetricsLogger {
    epoch_path: PathBuf,
    steps:      BufWriter<File>,
}

impl MetricsLogger {
    /// Create the log directory and start fresh CSV files with headers
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create log dir '{}'", dir.display()))?;

        let epoch_path = dir.join("metrics.csv");
        fs::write(&epoch_path, format!("{EPOCH_HEADER}\n"))
            .with_context(|| format!("Cannot write '{}'", epoch_path.display()))?;

        let steps_path = dir.join("steps.csv");
        let mut steps  = BufWriter::new(
            File::create(&steps_path)
                .with_context(|| format!("Cannot write '{}'", steps_path.display()))?,
        );
        writeln!(steps, "{STEP_HEADER}")?;

        tracing::debug!("Monitoring to '{}'", dir.display());
        Ok(Self { epoch_path, steps })
    }

    pub fn log_step(&mut self, step: usize, epoch: usize, loss: f64) -> Result<()> {
        writeln!(self.steps, "{step},{epoch},{loss:.6}")?;
        Ok(())
    }

    /// Append one epoch row and flush the step log
    pub fn log_epoch(&mut self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.epoch_path)?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6},{:.6e}",
            m.epoch, m.loss, m.top1_acc, m.val_loss, m.val_top1_acc, m.lr,
        )?;
        self.steps.flush()?;

        tracing::debug!(
            "Logged epoch {} metrics: loss={:.4}, val_loss={:.4}",
            m.epoch, m.loss, m.val_loss,
        );
        Ok(())
    }

    #[cfg(test)]
    pub fn epoch_path(&self) -> &Path {
        &self.epoch_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulator_means() {
        let mut acc = Accumulator::default();
        assert!(acc.mean_loss().is_nan());
        assert_eq!(acc.top1_acc(), 0.0);

        acc.add(0.5, 3, 4);
        acc.add(0.3, 1, 4);
        assert!((acc.mean_loss() - 0.4).abs() < 1e-12);
        assert_eq!(acc.top1_acc(), 0.5);
    }

    #[test]
    fn test_logger_writes_headers_and_rows() {
        let dir        = tempfile::tempdir().unwrap();
        let mut logger = MetricsLogger::new(dir.path().join("logs")).unwrap();

        logger.log_step(1, 1, 0.25).unwrap();
        logger.log_step(2, 1, 0.20).unwrap();
        logger.log_epoch(&EpochMetrics::new(1, 0.225, 0.5, 0.3, 0.4, 1e-4)).unwrap();

        let epochs = fs::read_to_string(logger.epoch_path()).unwrap();
        let lines: Vec<&str> = epochs.lines().collect();
        assert_eq!(lines[0], EPOCH_HEADER);
        assert!(lines[1].starts_with("1,0.225000,0.500000,0.300000,0.400000,"));

        let steps = fs::read_to_string(dir.path().join("logs").join("steps.csv")).unwrap();
        assert_eq!(steps, "step,epoch,loss\n1,1,0.250000\n2,1,0.200000\n");
    }
}
