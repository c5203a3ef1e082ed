// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores TextOnly weights using Burn's CompactRecorder.
//
// Files in the model directory (recorder adds the extension):
//   weights.mpk   best checkpoint written during training
//   model.json    model architecture (TextOnlyConfig)
//   model.mpk     final weights, the best ones when they exist
//
// CompactRecorder stores parameters at half precision.
//
// Loading requires model.json: the model must be rebuilt with the
// exact architecture before the record can be applied to it.

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::ml::model::{TextOnly, TextOnlyConfig};

const WEIGHTS_STEM: &str = "weights";
const MODEL_STEM:   &str = "model";
const CONFIG_FILE:  &str = "model.json";
const RECORD_EXT:   &str = "mpk";

/// Reads and writes the artifacts of one model directory.
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create the manager, making the directory if it is missing
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create model dir '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Open an existing model directory for reading
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        anyhow::ensure!(
            dir.is_dir(),
            "Model dir '{}' does not exist. Have you run 'train' first?",
            dir.display()
        );
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    // ── Best checkpoint ──────────────────────────────────────────────────────

    pub fn save_weights<B: Backend>(&self, model: &TextOnly<B>) -> Result<()> {
        self.record(model, WEIGHTS_STEM)
    }

    pub fn has_weights(&self) -> bool {
        self.record_path(WEIGHTS_STEM).is_file()
    }

    /// Remove a best checkpoint left over from an earlier run
    pub fn discard_weights(&self) -> Result<()> {
        let path = self.record_path(WEIGHTS_STEM);
        if path.is_file() {
            fs::remove_file(&path)
                .with_context(|| format!("Cannot remove stale weights '{}'", path.display()))?;
            tracing::info!("Removed stale weights '{}'", path.display());
        }
        Ok(())
    }

    pub fn load_weights<B: Backend>(&self, model: TextOnly<B>, device: &B::Device) -> Result<TextOnly<B>> {
        self.restore(model, WEIGHTS_STEM, device)
    }

    // ── Final artifacts ──────────────────────────────────────────────────────

    pub fn save_architecture(&self, cfg: &TextOnlyConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        cfg.save(&path)
            .with_context(|| format!("Cannot write architecture to '{}'", path.display()))?;
        tracing::debug!("Saved architecture to '{}'", path.display());
        Ok(())
    }

    pub fn save_model<B: Backend>(&self, model: &TextOnly<B>) -> Result<()> {
        self.record(model, MODEL_STEM)
    }

    pub fn load_config(&self) -> Result<TextOnlyConfig> {
        let path = self.dir.join(CONFIG_FILE);
        TextOnlyConfig::load(&path).map_err(|e| {
            anyhow::anyhow!(
                "Cannot read architecture from '{}': {e}. Have you run 'train' first?",
                path.display()
            )
        })
    }

    /// Rebuild the model from model.json and apply the final weights
    pub fn load_model<B: Backend>(&self, device: &B::Device) -> Result<TextOnly<B>> {
        let cfg   = self.load_config()?;
        let model = cfg.init::<B>(device);
        self.restore(model, MODEL_STEM, device)
    }

    // ── Recorder plumbing ────────────────────────────────────────────────────

    fn record_path(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{stem}.{RECORD_EXT}"))
    }

    fn record<B: Backend>(&self, model: &TextOnly<B>, stem: &str) -> Result<()> {
        let path = self.dir.join(stem);
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save weights to '{}'", path.display()))?;
        tracing::debug!("Saved weights to '{}'", path.display());
        Ok(())
    }

    fn restore<B: Backend>(&self, model: TextOnly<B>, stem: &str, device: &B::Device) -> Result<TextOnly<B>> {
        let path   = self.dir.join(stem);
        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load weights '{}'", path.display()))?;
        Ok(model.load_record(record))
    }
}
