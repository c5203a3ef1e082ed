// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types and rules of the category classifier:
// the taxonomy, the class vocabulary, label decoding, output
// records and submission scoring.
//
// Rules for this layer:
//   - NO Burn framework types
//   - file I/O limited to loading the small JSON documents
//     (taxonomy, meta) the types are defined by

/// Four-level name → code category tree
pub mod taxonomy;

/// y_vocab: composite label ↔ dense class index
pub mod meta;

/// Class index → validated b>m>s>d category path
pub mod label;

/// Output lines, sentinel rows, universe layout
pub mod prediction;

/// Weighted per-level accuracy of a submission
pub mod evaluation;

/// Abstractions implemented by other layers
pub mod traits;
