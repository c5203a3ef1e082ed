// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns shared by the use cases:
//
//   config.rs      — AppConfig, read once from JSON in main()
//   checkpoint.rs  — model directory artifacts (weights, model.json)
//   metrics.rs     — CSV monitor for epoch and step scalars
//   submission.rs  — temp-file-then-rename result writer

/// Hyperparameters and paths
pub mod config;

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;

/// Prediction result file writer
pub mod submission;
