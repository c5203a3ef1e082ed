// ============================================================
// Layer 5 — Inferencer
// ============================================================
use anyhow::{ensure, Result};
use burn::prelude::*;

use crate::data::{batcher::TextBatcher, generator::Batch};
use crate::domain::traits::ClassScorer;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    model::{argmax_rows, to_host, TextOnly},
    InferBackend,
};

pub struct Inferencer {
    model:       TextOnly<InferBackend>,
    batcher:     TextBatcher<InferBackend>,
    num_classes: usize,
}

impl Inferencer {
    /// Rebuild the model from `model.json` and load the final weights
    pub fn from_artifacts(ckpt: &CheckpointManager) -> Result<Self> {
        let device = <InferBackend as Backend>::Device::default();
        let model  = ckpt.load_model::<InferBackend>(&device)?;
        tracing::info!("Model loaded from '{}'", ckpt.dir().display());
        Ok(Self::new(model, device))
    }

    pub fn new(model: TextOnly<InferBackend>, device: <InferBackend as Backend>::Device) -> Self {
        let [_, num_classes] = model.output.weight.dims();
        let [vocab_size, _]  = model.uni_embd.weight.dims();
        Self {
            model,
            batcher: TextBatcher::new(device, num_classes, vocab_size),
            num_classes,
        }
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Per-class probabilities, row-major [batch.len(), num_classes]
    pub fn predict_proba(&self, batch: &Batch) -> Result<Vec<f32>> {
        let (uni, w_uni) = self.batcher.inputs(batch)?;
        to_host(self.model.forward(uni, w_uni))
    }
}

impl ClassScorer for Inferencer {
    fn predict_classes(&self, batch: &Batch) -> Result<Vec<usize>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        let scores  = self.predict_proba(batch)?;
        let classes = argmax_rows(&scores, self.num_classes);
        ensure!(
            classes.len() == batch.len(),
            "model returned {} rows for a batch of {}",
            classes.len(), batch.len(),
        );
        Ok(classes)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::tests::synthetic_split;
    use crate::data::generator::{PassMode, SampleGenerator};
    use crate::ml::model::TextOnlyConfig;
    use std::sync::Arc;

    #[test]
    fn test_one_class_per_row_within_range() {
        let device = Default::default();
        let model  = TextOnlyConfig::new(40, 6, 4, 5).init::<InferBackend>(&device);
        let scorer = Inferencer::new(model, device);

        let split = Arc::new(synthetic_split("test", 7, 6, 5));
        let batch = SampleGenerator::new(split, 7, PassMode::SinglePass).unwrap().next().unwrap();

        let classes = scorer.predict_classes(&batch).unwrap();
        assert_eq!(classes.len(), 7);
        assert!(classes.iter().all(|&c| c < 5));
    }

    #[test]
    fn test_labels_outside_vocab_do_not_matter() {
        // inference never reads the cate column
        let device = Default::default();
        let model  = TextOnlyConfig::new(40, 6, 4, 2).init::<InferBackend>(&device);
        let scorer = Inferencer::new(model, device);

        let split = Arc::new(synthetic_split("test", 6, 6, 6));
        let batch = SampleGenerator::new(split, 6, PassMode::SinglePass).unwrap().next().unwrap();
        assert_eq!(scorer.predict_classes(&batch).unwrap().len(), 6);
    }

    #[test]
    fn test_tokens_beyond_embedding_table_are_an_error() {
        // a split hashed with a larger unigram_hash_size than the model was trained on
        let device = Default::default();
        let model  = TextOnlyConfig::new(41, 6, 4, 3).init::<InferBackend>(&device);
        let scorer = Inferencer::new(model, device);

        let split     = Arc::new(synthetic_split("test", 4, 6, 3));
        let mut batch = SampleGenerator::new(split, 4, PassMode::SinglePass).unwrap().next().unwrap();
        batch.uni.fill(500);

        assert!(scorer.predict_classes(&batch).is_err());
    }
}
