// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between the pre-hashed dataset on disk and the
// tensor batches the model consumes:
//
//   <root>/<split>/*.npy, pid.txt
//       │
//       ▼
//   Split             → row-aligned columns in memory
//       │
//       ▼
//   SampleGenerator   → contiguous row windows (cycle / single pass)
//       │
//       ▼
//   ThreadsafeIter    → serialised access for concurrent consumers
//       │
//       ▼
//   TextBatcher       → Burn tensors on the target device

/// Split directories and the product-id universe
pub mod dataset;

/// Cursor-based batch windows over a split
pub mod generator;

/// Row windows → Burn tensors
pub mod batcher;
