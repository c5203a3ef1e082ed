// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Scores a prediction file against an answer file in the same
// five-column format. Per level, answers coded -1 are skipped.

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::{
    evaluation::{evaluate, parse_records, EvaluationReport},
    label::CategoryPath,
    taxonomy::Level,
};

pub struct EvaluateUseCase {
    predictions: PathBuf,
    answers:     PathBuf,
}

impl EvaluateUseCase {
    pub fn new(predictions: impl Into<PathBuf>, answers: impl Into<PathBuf>) -> Self {
        Self { predictions: predictions.into(), answers: answers.into() }
    }

    pub fn execute(&self) -> Result<EvaluationReport> {
        let predictions = read_records(&self.predictions)?;
        let answers     = read_records(&self.answers)?;
        tracing::info!("{} predictions, {} answers", predictions.len(), answers.len());

        let report = evaluate(&predictions, &answers);
        for level in Level::ALL {
            let i = level.index();
            tracing::info!(
                "{}-Accuracy: {:.4} ({}/{})",
                level, report.accuracy_of(level), report.correct[i], report.counted[i],
            );
        }
        tracing::info!("score: {:.4}", report.score);
        Ok(report)
    }
}

fn read_records(path: &Path) -> Result<Vec<(String, CategoryPath)>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    parse_records(text.lines())
        .with_context(|| format!("Malformed record in '{}'", path.display()))
}
