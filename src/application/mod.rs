// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Workflow coordination only: each use case wires the domain,
// data, ml and infra layers together for one command. No model
// math and no printing happen here.

/// `train`: fit the classifier and write the model directory
pub mod train_use_case;

/// `predict`: score a split and write the result file
pub mod predict_use_case;

/// `evaluate`: weighted per-level accuracy of a result file
pub mod evaluate_use_case;
