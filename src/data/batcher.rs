// ============================================================
// Layer 4 — Text Batcher
// ============================================================
// Converts a row window produced by the SampleGenerator into
// Burn tensors on the target device.
//
//   Batch (ndarray, host)             TextBatch (Burn, device)
//   ─────────────────────             ─────────────────────────
//   uni    [n, max_len] i32     →     uni     Tensor<B, 2, Int>   ids checked against 0..vocab_size
//   w_uni  [n, max_len] f32     →     w_uni   Tensor<B, 2>
//   cate   [n]          i64     →     targets Tensor<B, 2>  one-hot [n, num_classes]
//                                     classes Vec<usize>    for accuracy on the host
//
// Generic over the backend so the same batcher serves the
// Autodiff training model and the plain validation/inference one.

use anyhow::{bail, Result};
use burn::{prelude::*, tensor::TensorData};

use crate::data::generator::Batch;

/// A batch ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct TextBatch<B: Backend> {
    /// Hashed token ids, shape [batch_size, max_len]
    pub uni: Tensor<B, 2, Int>,

    /// Per-token weights, shape [batch_size, max_len]
    pub w_uni: Tensor<B, 2>,

    /// One-hot targets, shape [batch_size, num_classes]
    pub targets: Option<Tensor<B, 2>>,

    /// Dense class index per row
    pub classes: Option<Vec<usize>>,
}

#[derive(Clone, Debug)]
pub struct TextBatcher<B: Backend> {
    device:      B::Device,
    num_classes: usize,
    vocab_size:  usize,
}

impl<B: Backend> TextBatcher<B> {
    pub fn new(device: B::Device, num_classes: usize, vocab_size: usize) -> Self {
        Self { device, num_classes, vocab_size }
    }

    pub fn batch(&self, batch: &Batch) -> Result<TextBatch<B>> {
        let (uni, w_uni) = self.inputs(batch)?;

        let (targets, classes) = match &batch.cate {
            Some(cate) => {
                let classes = cate
                    .iter()
                    .map(|&c| self.check_class(c))
                    .collect::<Result<Vec<usize>>>()?;
                let targets = self.one_hot(&classes);
                (Some(targets), Some(classes))
            }
            None => (None, None),
        };

        Ok(TextBatch { uni, w_uni, targets, classes })
    }

    /// Model inputs only; any label column is ignored
    pub fn inputs(&self, batch: &Batch) -> Result<(Tensor<B, 2, Int>, Tensor<B, 2>)> {
        let [rows, max_len] = [batch.uni.nrows(), batch.uni.ncols()];
        self.check_tokens(batch)?;

        // iter() walks in logical row-major order whatever the memory layout
        let uni_flat:   Vec<i32> = batch.uni.iter().copied().collect();
        let w_uni_flat: Vec<f32> = batch.w_uni.iter().copied().collect();

        let uni = Tensor::<B, 2, Int>::from_data(
            TensorData::new(uni_flat, [rows, max_len]).convert::<B::IntElem>(),
            &self.device,
        );
        let w_uni = Tensor::<B, 2>::from_data(
            TensorData::new(w_uni_flat, [rows, max_len]).convert::<B::FloatElem>(),
            &self.device,
        );
        Ok((uni, w_uni))
    }

    /// The embedding lookup indexes out of bounds on any id outside the table
    fn check_tokens(&self, batch: &Batch) -> Result<()> {
        for ((r, j), &id) in batch.uni.indexed_iter() {
            if id < 0 || id as usize >= self.vocab_size {
                bail!(
                    "token id {id} at row {}, column {j} is outside 0..{}",
                    batch.rows.start + r, self.vocab_size,
                );
            }
        }
        Ok(())
    }

    fn check_class(&self, class: i64) -> Result<usize> {
        match usize::try_from(class) {
            Ok(c) if c < self.num_classes => Ok(c),
            _ => bail!("class index {class} is outside 0..{}", self.num_classes),
        }
    }

    fn one_hot(&self, classes: &[usize]) -> Tensor<B, 2> {
        let mut flat = vec![0.0f32; classes.len() * self.num_classes];
        for (row, &class) in classes.iter().enumerate() {
            flat[row * self.num_classes + class] = 1.0;
        }
        Tensor::<B, 2>::from_data(
            TensorData::new(flat, [classes.len(), self.num_classes]).convert::<B::FloatElem>(),
            &self.device,
        )
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::tests::synthetic_split;
    use crate::data::generator::{PassMode, SampleGenerator};
    use burn::backend::NdArray;
    use std::sync::Arc;

    type TestBackend = NdArray;

    fn first_batch(rows: usize, batch_size: usize, num_classes: usize) -> Batch {
        let split = Arc::new(synthetic_split("train", rows, 6, num_classes));
        SampleGenerator::new(split, batch_size, PassMode::SinglePass)
            .unwrap()
            .next()
            .unwrap()
    }

    #[test]
    fn test_shapes() {
        let batch   = first_batch(10, 4, 3);
        let batcher = TextBatcher::<TestBackend>::new(Default::default(), 3, 32);
        let out     = batcher.batch(&batch).unwrap();

        assert_eq!(out.uni.dims(), [4, 6]);
        assert_eq!(out.w_uni.dims(), [4, 6]);
        assert_eq!(out.targets.unwrap().dims(), [4, 3]);
        assert_eq!(out.classes.unwrap(), vec![0, 1, 2, 0]);
    }

    #[test]
    fn test_one_hot_targets() {
        let batch   = first_batch(3, 3, 3);
        let batcher = TextBatcher::<TestBackend>::new(Default::default(), 3, 32);
        let targets = batcher.batch(&batch).unwrap().targets.unwrap();

        let flat: Vec<f32> = targets.into_data().convert::<f32>().to_vec().unwrap();
        assert_eq!(flat, vec![
            1.0, 0.0, 0.0,
            0.0, 1.0, 0.0,
            0.0, 0.0, 1.0,
        ]);
    }

    #[test]
    fn test_token_ids_survive_conversion() {
        let batch   = first_batch(5, 5, 2);
        let batcher = TextBatcher::<TestBackend>::new(Default::default(), 2, 32);
        let uni     = batcher.batch(&batch).unwrap().uni;

        let flat: Vec<i64> = uni.into_data().convert::<i64>().to_vec().unwrap();
        let expected: Vec<i64> = batch.uni.iter().map(|&t| t as i64).collect();
        assert_eq!(flat, expected);
    }

    #[test]
    fn test_token_id_outside_table_is_an_error() {
        let mut batch = first_batch(5, 5, 2);
        batch.uni[[3, 1]] = 32;
        let batcher = TextBatcher::<TestBackend>::new(Default::default(), 2, 32);

        let err = batcher.inputs(&batch).unwrap_err().to_string();
        assert!(err.contains("token id 32 at row 3"), "{err}");

        batch.uni[[3, 1]] = -1;
        assert!(batcher.batch(&batch).is_err());

        batch.uni[[3, 1]] = 31;
        assert!(batcher.batch(&batch).is_ok());
    }

    #[test]
    fn test_label_outside_vocab_is_an_error() {
        let batch   = first_batch(4, 4, 4);
        let batcher = TextBatcher::<TestBackend>::new(Default::default(), 2, 32);
        assert!(batcher.batch(&batch).is_err());
    }
}
