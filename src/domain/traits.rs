// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The prediction driver only needs "give me the arg-max class
// of every row in this batch". Keeping that behind a trait lets
// the driver run against the Burn inferencer in production and
// against a fixed lookup table in tests.

use anyhow::Result;

use crate::data::generator::Batch;

// ─── ClassScorer ──────────────────────────────────────────────────────────────
/// Any component that can assign a class index to each row of a batch.
///
/// Implementations:
///   - Inferencer → runs the trained TextOnly model
pub trait ClassScorer {
    /// Arg-max class index per row, in batch row order.
    /// The returned Vec has exactly `batch.len()` entries.
    fn predict_classes(&self, batch: &Batch) -> Result<Vec<usize>>;
}
