// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Three subcommands: `train`, `predict` and `evaluate`.
// Hyperparameters live in the JSON config (--config); the flags
// here only name directories and files.

use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the classifier on a prepared dataset
    Train(TrainArgs),

    /// Predict categories for a split and write the result file
    Predict(PredictArgs),

    /// Score a result file against an answer file
    Evaluate(EvaluateArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Dataset root holding meta.json and the train/dev splits
    #[arg(long, default_value = "data/train")]
    pub data_root: PathBuf,

    /// Directory for weights, model.json and logs
    #[arg(long, default_value = "model/train")]
    pub out_dir: PathBuf,
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Dataset root holding the meta.json used at training time
    #[arg(long, default_value = "data/train")]
    pub data_root: PathBuf,

    /// Directory written by `train`
    #[arg(long, default_value = "model/train")]
    pub model_root: PathBuf,

    /// Dataset root holding the split to score
    #[arg(long, default_value = "data/dev")]
    pub test_root: PathBuf,

    /// Name of the split to score, e.g. "dev" or "test"
    #[arg(long, default_value = "dev")]
    pub test_div: String,

    /// Result file: pid, then four category codes, tab separated
    #[arg(long, default_value = "predict.tsv")]
    pub out_path: PathBuf,

    /// Write category names instead of codes
    #[arg(long)]
    pub readable: bool,
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Result file written by `predict`
    #[arg(long)]
    pub predictions: PathBuf,

    /// Answer file in the same five-column format
    #[arg(long)]
    pub answers: PathBuf,
}
