// ============================================================
// Layer 4 — Sample Generator
// ============================================================
// Slices contiguous row windows out of a split:
//
//   N = 10, batch_size = 4
//
//   call 1   rows 0..4
//   call 2   rows 4..8
//   call 3   rows 8..10   ← short, reaches N, cursor wraps to 0
//   call 4   rows 0..4    (Cycle)  |  None (SinglePass, and forever after)
//
// Cycle mode feeds the epoch-based training loop, which decides
// itself how many steps make an epoch. SinglePass feeds the
// prediction driver, which must see every row exactly once.
//
// ThreadsafeIter puts any iterator behind a Mutex so several
// threads can drain one generator; each next() is one complete
// cursor transition.

use ndarray::{Array1, Array2};
use std::{
    ops::Range,
    sync::{Arc, Mutex, PoisonError},
};
use thiserror::Error;

use crate::data::dataset::Split;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassMode {
    /// Wrap around forever
    Cycle,
    /// Stop after the batch that reaches the last row
    SinglePass,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("batch_size must be greater than zero")]
    ZeroBatchSize,
}

/// A contiguous window of rows.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Row indices of the split this batch was cut from
    pub rows:  Range<usize>,
    pub uni:   Array2<i32>,
    pub w_uni: Array2<f32>,
    /// Dense class index per row, for labelled splits
    pub cate:  Option<Array1<i64>>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub struct SampleGenerator {
    split:      Arc<Split>,
    batch_size: usize,
    mode:       PassMode,
    left:       usize,
    exhausted:  bool,
}

impl SampleGenerator {
    pub fn new(split: Arc<Split>, batch_size: usize, mode: PassMode) -> Result<Self, GeneratorError> {
        if batch_size == 0 {
            return Err(GeneratorError::ZeroBatchSize);
        }
        Ok(Self { split, batch_size, mode, left: 0, exhausted: false })
    }

    /// Row the next batch starts at
    #[cfg(test)]
    pub fn cursor(&self) -> usize {
        self.left
    }

    /// Batches per full pass: ceil(N / batch_size)
    #[cfg(test)]
    pub fn steps_per_pass(&self) -> usize {
        steps_for(self.split.rows(), self.batch_size)
    }

    #[cfg(test)]
    pub fn split(&self) -> &Split {
        &self.split
    }
}

/// ceil(rows / batch_size), the number of batches one pass takes
pub fn steps_for(rows: usize, batch_size: usize) -> usize {
    rows.div_ceil(batch_size.max(1))
}

impl Iterator for SampleGenerator {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        let limit = self.split.rows();
        if self.exhausted || limit == 0 {
            return None;
        }

        let left  = self.left;
        let right = (left + self.batch_size).min(limit);
        let (uni, w_uni, cate) = self.split.slice_rows(left..right);

        self.left = right;
        if right == limit {
            self.left = 0;
            if self.mode == PassMode::SinglePass {
                self.exhausted = true;
            }
        }

        Some(Batch { rows: left..right, uni, w_uni, cate })
    }
}

impl std::iter::FusedIterator for SampleGenerator {}

/// Serialises `next()` on a shared iterator.
pub struct ThreadsafeIter<I> {
    inner: Mutex<I>,
}

impl<I: Iterator> ThreadsafeIter<I> {
    pub fn new(iter: I) -> Self {
        Self { inner: Mutex::new(iter) }
    }

    pub fn next(&self) -> Option<I::Item> {
        // the wrapped state is only touched inside next(), so a
        // panic in another consumer cannot leave it half-updated
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next()
    }
}

impl<'a, I: Iterator> Iterator for &'a ThreadsafeIter<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<I::Item> {
        ThreadsafeIter::next(*self)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::tests::synthetic_split;
    use std::collections::HashSet;

    fn generator(rows: usize, batch_size: usize, mode: PassMode) -> SampleGenerator {
        let split = Arc::new(synthetic_split("train", rows, 4, 3));
        SampleGenerator::new(split, batch_size, mode).unwrap()
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let split = Arc::new(synthetic_split("train", 5, 4, 3));
        assert_eq!(
            SampleGenerator::new(split, 0, PassMode::Cycle).err(),
            Some(GeneratorError::ZeroBatchSize),
        );
    }

    #[test]
    fn test_single_pass_covers_every_row_once() {
        for (rows, batch_size) in [(10, 4), (12, 4), (1, 7), (7, 1), (100, 33)] {
            let batches: Vec<Batch> = generator(rows, batch_size, PassMode::SinglePass).collect();

            assert_eq!(batches.len(), steps_for(rows, batch_size));
            assert_eq!(batches.iter().map(Batch::len).sum::<usize>(), rows);
            assert!(batches.iter().all(|b| b.len() <= batch_size && !b.is_empty()));

            let mut expected_start = 0;
            for b in &batches {
                assert_eq!(b.rows.start, expected_start);
                expected_start = b.rows.end;
            }
            assert_eq!(expected_start, rows);
        }
    }

    #[test]
    fn test_single_pass_stays_exhausted() {
        let mut sampler = generator(5, 2, PassMode::SinglePass);
        assert_eq!(sampler.by_ref().count(), 3);
        assert!(sampler.next().is_none());
        assert!(sampler.next().is_none());
    }

    #[test]
    fn test_last_batch_may_be_short() {
        let lens: Vec<usize> = generator(10, 4, PassMode::SinglePass).map(|b| b.len()).collect();
        assert_eq!(lens, vec![4, 4, 2]);
    }

    #[test]
    fn test_cycle_wraps_to_row_zero() {
        let mut sampler = generator(10, 4, PassMode::Cycle);
        let steps       = sampler.steps_per_pass();
        assert_eq!(steps, 3);

        for _ in 0..steps {
            sampler.next().unwrap();
        }
        assert_eq!(sampler.cursor(), 0);

        let again = sampler.next().unwrap();
        assert_eq!(again.rows, 0..4);
    }

    #[test]
    fn test_batch_carries_the_right_rows() {
        let mut sampler = generator(10, 4, PassMode::SinglePass);
        let split       = sampler.split().clone();
        let batch       = sampler.nth(1).unwrap();

        assert_eq!(batch.rows, 4..8);
        for (i, row) in batch.rows.clone().enumerate() {
            assert_eq!(batch.uni.row(i), split.uni().row(row));
            assert_eq!(batch.w_uni.row(i), split.w_uni().row(row));
            assert_eq!(batch.cate.as_ref().unwrap()[i], split.cate().unwrap()[row]);
        }
    }

    #[test]
    fn test_empty_split_yields_nothing() {
        assert!(generator(0, 4, PassMode::Cycle).next().is_none());
        assert!(generator(0, 4, PassMode::SinglePass).next().is_none());
    }

    #[test]
    fn test_concurrent_consumers_see_each_row_once() {
        let rows   = 1_003;
        let shared = ThreadsafeIter::new(generator(rows, 10, PassMode::SinglePass));

        let seen: Vec<Vec<Range<usize>>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| (&shared).map(|b| b.rows).collect::<Vec<_>>()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let mut all_rows: Vec<usize> = seen.into_iter().flatten().flatten().collect();
        assert_eq!(all_rows.len(), rows);
        all_rows.sort_unstable();
        assert_eq!(all_rows, (0..rows).collect::<Vec<_>>());

        let distinct: HashSet<usize> = all_rows.into_iter().collect();
        assert_eq!(distinct.len(), rows);
    }
}
