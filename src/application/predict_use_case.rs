// ============================================================
// Layer 2 — PredictUseCase
// ============================================================
// Scores a split with a trained model and writes one result
// line per product id of the universe:
//
//   Step 1: Label decoder from meta.json + taxonomy  (Layer 3)
//   Step 2: Rebuild model from model.json + weights  (Layer 5)
//   Step 3: Open the split to score                  (Layer 4)
//   Step 4: Product-id universe                      (Layer 4)
//   Step 5: Single pass over the split → class index per row
//   Step 6: Decode, lay out over the universe, write (Layer 3, 6)
//
// Any decode failure aborts before the output file is touched.

use anyhow::{ensure, Context, Result};
use std::{path::PathBuf, sync::Arc};

use crate::data::{
    dataset::{load_pid_universe, Split},
    generator::{PassMode, SampleGenerator, ThreadsafeIter},
};
use crate::domain::{
    label::LabelDecoder,
    meta::Meta,
    prediction::{layout_over_universe, render_predictions, PredictionRow},
    taxonomy::Taxonomy,
    traits::ClassScorer,
};
use crate::infra::{checkpoint::CheckpointManager, config::AppConfig, submission::write_lines};
use crate::ml::inferencer::Inferencer;

pub struct PredictUseCase<'a> {
    config:     &'a AppConfig,
    data_root:  PathBuf,
    model_root: PathBuf,
    test_root:  PathBuf,
    test_div:   String,
    out_path:   PathBuf,
    readable:   bool,
}

impl<'a> PredictUseCase<'a> {
    pub fn new(
        config:     &'a AppConfig,
        data_root:  impl Into<PathBuf>,
        model_root: impl Into<PathBuf>,
        test_root:  impl Into<PathBuf>,
        test_div:   impl Into<String>,
        out_path:   impl Into<PathBuf>,
        readable:   bool,
    ) -> Self {
        Self {
            config,
            data_root:  data_root.into(),
            model_root: model_root.into(),
            test_root:  test_root.into(),
            test_div:   test_div.into(),
            out_path:   out_path.into(),
            readable,
        }
    }

    /// Returns the number of lines written
    pub fn execute(&self) -> Result<usize> {
        let cfg = self.config;

        // ── Step 1: Decoder ───────────────────────────────────────────────────
        let meta     = Meta::load(&self.data_root)?;
        let taxonomy = Taxonomy::load(&cfg.taxonomy_path)?;
        let decoder  = LabelDecoder::new(&meta, &taxonomy)
            .with_context(|| format!("Invalid class vocabulary in '{}'", self.data_root.display()))?;

        // ── Step 2: Model ─────────────────────────────────────────────────────
        let ckpt   = CheckpointManager::open(&self.model_root)?;
        let scorer = Inferencer::from_artifacts(&ckpt)?;
        ensure!(
            scorer.num_classes() == decoder.num_classes(),
            "Model predicts {} classes but meta.json has {}",
            scorer.num_classes(), decoder.num_classes(),
        );

        // ── Step 3: Split ─────────────────────────────────────────────────────
        let split = Arc::new(Split::open(&self.test_root, &self.test_div)?);
        tracing::info!("# of {} samples: {}", self.test_div, split.rows());

        // ── Step 4: Universe ──────────────────────────────────────────────────
        let universe = if cfg.test_data_list.is_empty() {
            split.require_pid()?.to_vec()
        } else {
            load_pid_universe(&cfg.test_data_list, &self.test_div)?
        };
        tracing::info!("# of product ids to answer: {}", universe.len());

        // ── Step 5: Score ─────────────────────────────────────────────────────
        let rows = run_predictions(&scorer, split, cfg.batch_size)?;

        // ── Step 6: Decode and write ──────────────────────────────────────────
        let lines   = render_predictions(&rows, &decoder, self.readable)?;
        let missing = universe.iter().filter(|pid| !lines.contains_key(*pid)).count();
        if missing > 0 {
            tracing::warn!("{} product id(s) have no prediction, writing -1", missing);
        }

        write_lines(&self.out_path, layout_over_universe(&universe, &lines))
    }
}

/// Score every row of `split` once, pairing each arg-max class with its pid
pub fn run_predictions<S>(scorer: &S, split: Arc<Split>, batch_size: usize) -> Result<Vec<PredictionRow>>
where
    S: ClassScorer + ?Sized,
{
    let pids    = split.require_pid()?.to_vec();
    let sampler = ThreadsafeIter::new(SampleGenerator::new(split, batch_size, PassMode::SinglePass)?);

    let mut rows = Vec::with_capacity(pids.len());
    for batch in &sampler {
        let classes = scorer.predict_classes(&batch)?;
        ensure!(
            classes.len() == batch.len(),
            "scorer returned {} classes for rows {:?}",
            classes.len(), batch.rows,
        );
        rows.extend(
            pids[batch.rows.clone()]
                .iter()
                .zip(classes)
                .map(|(pid, class)| PredictionRow::new(pid.clone(), class)),
        );
    }

    tracing::debug!("Scored {} rows", rows.len());
    Ok(rows)
}
