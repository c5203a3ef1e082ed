// ============================================================
// Layer 3 — Submission Scoring
// ============================================================
// Scores a prediction file against an answer file, both in the
// output record format `pid\tb\tm\ts\td`.
//
//   acc(level) = correct / counted
//     counted  = answers whose code at that level is not -1
//     correct  = counted answers the prediction matches
//
//   score = (1.0·acc_b + 1.2·acc_m + 1.3·acc_s + 1.4·acc_d) / 4
//
// A pid missing from the predictions is counted as wrong at
// every level it is counted at.

use std::collections::HashMap;
use thiserror::Error;

use crate::domain::label::CategoryPath;
use crate::domain::prediction::NO_ANSWER_CODE;
use crate::domain::taxonomy::Level;

/// Per-level weights of the final score, in path order
pub const LEVEL_WEIGHTS: [f64; 4] = [1.0, 1.2, 1.3, 1.4];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("line {line}: expected 5 tab-separated fields, found {found}")]
    FieldCount { line: usize, found: usize },

    #[error("line {line}: '{value}' is not an integer category code")]
    BadCode { line: usize, value: String },
}

/// Parse output-record lines into pid → path. Blank lines are skipped.
pub fn parse_records<'a>(
    lines: impl IntoIterator<Item = &'a str>,
) -> Result<Vec<(String, CategoryPath)>, RecordError> {
    let mut records = Vec::new();

    for (i, raw) in lines.into_iter().enumerate() {
        let line = i + 1;
        let raw  = raw.trim_end_matches(['\r', '\n']);
        if raw.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = raw.split('\t').collect();
        if fields.len() != 5 {
            return Err(RecordError::FieldCount { line, found: fields.len() });
        }

        let mut codes = [0i64; 4];
        for (slot, value) in codes.iter_mut().zip(&fields[1..]) {
            *slot = value.trim().parse().map_err(|_| RecordError::BadCode {
                line,
                value: value.to_string(),
            })?;
        }
        let [b, m, s, d] = codes;
        records.push((fields[0].to_string(), CategoryPath::new(b, m, s, d)));
    }

    Ok(records)
}

/// Per-level accuracy and the weighted final score.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    pub counted:  [usize; 4],
    pub correct:  [usize; 4],
    pub accuracy: [f64; 4],
    pub score:    f64,
}

impl EvaluationReport {
    pub fn accuracy_of(&self, level: Level) -> f64 {
        self.accuracy[level.index()]
    }
}

pub fn evaluate(
    predictions: &[(String, CategoryPath)],
    answers:     &[(String, CategoryPath)],
) -> EvaluationReport {
    let predicted: HashMap<&str, &CategoryPath> = predictions
        .iter()
        .map(|(pid, path)| (pid.as_str(), path))
        .collect();

    let mut counted = [0usize; 4];
    let mut correct = [0usize; 4];

    for (pid, gold) in answers {
        let guess = predicted.get(pid.as_str());
        for level in Level::ALL {
            let want = gold.code(level);
            if want == NO_ANSWER_CODE {
                continue;
            }
            let i = level.index();
            counted[i] += 1;
            if guess.map(|p| p.code(level)) == Some(want) {
                correct[i] += 1;
            }
        }
    }

    let mut accuracy = [0.0f64; 4];
    for i in 0..4 {
        if counted[i] > 0 {
            accuracy[i] = correct[i] as f64 / counted[i] as f64;
        }
    }

    let score = accuracy
        .iter()
        .zip(LEVEL_WEIGHTS)
        .map(|(acc, w)| acc * w)
        .sum::<f64>()
        / LEVEL_WEIGHTS.len() as f64;

    EvaluationReport { counted, correct, accuracy, score }
}
