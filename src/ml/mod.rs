// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All model math lives here:
//
//   model.rs      — TextOnly: hashed-unigram embedding, weighted
//                   pooling, sigmoid head, BCE loss
//   callbacks.rs  — epoch-end policies: best checkpoint, early
//                   stopping, learning-rate decay
//   trainer.rs    — the manual Adam training loop
//   inferencer.rs — loads a trained model and scores batches
//
// The CPU NdArray backend is the default. Build with the `wgpu`
// feature to run on the GPU instead.

#[cfg(not(feature = "wgpu"))]
pub type InferBackend = burn::backend::NdArray;
#[cfg(feature = "wgpu")]
pub type InferBackend = burn::backend::Wgpu;

pub type TrainBackend = burn::backend::Autodiff<InferBackend>;

/// Hashed-unigram classifier architecture
pub mod model;

/// Checkpoint, early-stopping and LR-decay policies
pub mod callbacks;

/// Training loop with validation and checkpointing
pub mod trainer;

/// Inference engine: loads the model and predicts classes
pub mod inferencer;
