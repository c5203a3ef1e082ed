// ============================================================
// Layer 6 — Application Configuration
// ============================================================
// Every hyperparameter and path the commands need, read once
// in main() and handed to each use case by reference.
//
// The file is JSON; every field is optional and falls back to
// the default below:
//
//   {
//     "batch_size": 1024,
//     "embd_size": 128,
//     "num_epochs": 100,
//     "max_len": 32,
//     "unigram_hash_size": 100000,
//     "lr": 0.0001,
//     "taxonomy_path": "cate1.json",
//     "test_data_list": ["data/test.chunk.01", "data/test.chunk.02"]
//   }

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub batch_size:        usize,
    pub embd_size:         usize,
    pub num_epochs:        usize,
    pub max_len:           usize,
    pub unigram_hash_size: usize,
    pub lr:                f64,
    pub dropout:           f64,

    /// Epochs between best-only checkpoint evaluations
    pub checkpoint_period:       usize,
    /// Stagnant val_top1_acc epochs tolerated before stopping
    pub early_stopping_patience: usize,
    pub lr_decay_factor:         f64,
    pub lr_decay_patience:       usize,
    pub lr_decay_min_delta:      f64,

    /// cate1.json: name → code maps for levels b/m/s/d
    pub taxonomy_path: PathBuf,
    /// Monitoring output; `<out_dir>/logs` when unset
    pub log_dir:       Option<PathBuf>,
    /// Dataset roots whose pid columns form the prediction universe
    pub test_data_list: Vec<PathBuf>,

    pub seed: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            batch_size:        1024,
            embd_size:         128,
            num_epochs:        100,
            max_len:           32,
            unigram_hash_size: 100_000,
            lr:                1e-4,
            dropout:           0.25,

            checkpoint_period:       10,
            early_stopping_patience: 1,
            lr_decay_factor:         0.1,
            lr_decay_patience:       10,
            lr_decay_min_delta:      1e-4,

            taxonomy_path:  PathBuf::from("cate1.json"),
            log_dir:        None,
            test_data_list: Vec::new(),

            seed: 42,
        }
    }
}

impl AppConfig {
    /// Read and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read config '{}'", path.display()))?;
        let cfg: AppConfig = serde_json::from_str(&json)
            .with_context(|| format!("Malformed config '{}'", path.display()))?;
        cfg.validate()
            .with_context(|| format!("Invalid config '{}'", path.display()))?;

        tracing::debug!("Loaded config from '{}': {:?}", path.display(), cfg);
        Ok(cfg)
    }

    /// The file's settings when a path is given, the defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let cfg = Self::default();
                cfg.validate()?;
                Ok(cfg)
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.batch_size > 0, "batch_size must be > 0");
        ensure!(self.num_epochs > 0, "num_epochs must be > 0");
        ensure!(self.embd_size > 0, "embd_size must be > 0");
        ensure!(self.max_len > 0, "max_len must be > 0");
        ensure!(self.lr > 0.0, "lr must be > 0");
        ensure!((0.0..1.0).contains(&self.dropout), "dropout must be in [0, 1)");
        ensure!(
            self.lr_decay_factor > 0.0 && self.lr_decay_factor < 1.0,
            "lr_decay_factor must be in (0, 1)"
        );
        Ok(())
    }

    /// Token id space of the embedding: hash buckets plus the padding id 0
    pub fn vocab_size(&self) -> usize {
        self.unigram_hash_size + 1
    }

    pub fn log_dir_for(&self, out_dir: &Path) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| out_dir.join("logs"))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = AppConfig::load_or_default(None).unwrap();
        assert_eq!(cfg.batch_size, 1024);
        assert_eq!(cfg.vocab_size(), 100_001);
        assert_eq!(cfg.checkpoint_period, 10);
        assert_eq!(cfg.early_stopping_patience, 1);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"batch_size": 64, "test_data_list": ["a", "b"]}"#).unwrap();

        let cfg = AppConfig::load(&path).unwrap();
        assert_eq!(cfg.batch_size, 64);
        assert_eq!(cfg.test_data_list, vec![PathBuf::from("a"), PathBuf::from("b")]);
        assert_eq!(cfg.embd_size, AppConfig::default().embd_size);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"batch_sise": 64}"#).unwrap();
        assert!(AppConfig::load(&path).is_err());
    }

    #[test]
    fn test_zero_batch_size_is_invalid() {
        let cfg = AppConfig { batch_size: 0, ..AppConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_log_dir_defaults_under_out_dir() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.log_dir_for(Path::new("model/train")), PathBuf::from("model/train/logs"));

        let cfg = AppConfig { log_dir: Some(PathBuf::from("/tmp/tb")), ..AppConfig::default() };
        assert_eq!(cfg.log_dir_for(Path::new("model/train")), PathBuf::from("/tmp/tb"));
    }
}
