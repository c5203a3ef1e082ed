// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the training pipeline in order:
//
//   Step 1: Load meta.json            (Layer 3 - domain)
//   Step 2: Open train and dev splits (Layer 4 - data)
//   Step 3: Prepare output directory  (Layer 6 - infra)
//   Step 4: Run training loop         (Layer 5 - ml)

use anyhow::{ensure, Result};
use std::{path::PathBuf, sync::Arc};

use crate::data::dataset::Split;
use crate::domain::meta::Meta;
use crate::infra::{checkpoint::CheckpointManager, config::AppConfig};
use crate::ml::trainer::{run_training, TrainingSummary};

pub const TRAIN_SPLIT: &str = "train";
pub const DEV_SPLIT:   &str = "dev";

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase<'a> {
    config:    &'a AppConfig,
    data_root: PathBuf,
    out_dir:   PathBuf,
}

impl<'a> TrainUseCase<'a> {
    pub fn new(config: &'a AppConfig, data_root: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self { config, data_root: data_root.into(), out_dir: out_dir.into() }
    }

    pub fn execute(&self) -> Result<TrainingSummary> {
        let cfg = self.config;

        // ── Step 1: Class vocabulary ──────────────────────────────────────────
        let meta        = Meta::load(&self.data_root)?;
        let num_classes = meta.num_classes();
        ensure!(num_classes > 0, "meta.json in '{}' has no classes", self.data_root.display());
        tracing::info!("# of classes: {}", num_classes);

        // ── Step 2: Splits ────────────────────────────────────────────────────
        let train = Arc::new(Split::open(&self.data_root, TRAIN_SPLIT)?);
        let dev   = Arc::new(Split::open(&self.data_root, DEV_SPLIT)?);
        tracing::info!("# of train samples: {}", train.rows());
        tracing::info!("# of dev samples: {}", dev.rows());

        check_width(&train, cfg.max_len)?;
        check_width(&dev, cfg.max_len)?;

        // ── Step 3: Output directory ──────────────────────────────────────────
        let ckpt    = CheckpointManager::create(&self.out_dir)?;
        let log_dir = cfg.log_dir_for(&self.out_dir);

        // ── Step 4: Train ─────────────────────────────────────────────────────
        let summary = run_training(cfg, train, dev, num_classes, &ckpt, &log_dir)?;
        tracing::info!(
            "Training finished after {} epoch(s){}{}",
            summary.epochs_run(),
            if summary.stopped_early { " (early stop)" } else { "" },
            if summary.restored_best { ", best weights kept" } else { "" },
        );
        Ok(summary)
    }
}

fn check_width(split: &Split, max_len: usize) -> Result<()> {
    ensure!(
        split.max_len() == max_len,
        "Split '{}' has {} token columns but max_len is {}",
        split.name(), split.max_len(), max_len,
    );
    Ok(())
}
