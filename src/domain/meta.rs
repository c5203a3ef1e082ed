// ============================================================
// Layer 3 — Class Vocabulary (meta)
// ============================================================
// `y_vocab` maps a composite label ("b>m>s>d") to the dense
// class index the model's output layer is trained on.
//
// The inverse is a plain Vec indexed by class:
//   y_vocab  { "1>10>100>1000": 0, "2>20>200>-1": 1 }
//   inverse  [ "1>10>100>1000", "2>20>200>-1" ]
//
// Indices must cover 0..len exactly once; anything else means
// the preprocessing step produced a broken vocabulary.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::Path};
use thiserror::Error;

/// File name of the meta object inside a data root
pub const META_FILE: &str = "meta.json";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetaError {
    #[error("y_vocab index {index} is outside 0..{len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("y_vocab index {index} is assigned to both '{first}' and '{second}'")]
    DuplicateIndex { index: usize, first: String, second: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Meta {
    pub y_vocab: HashMap<String, usize>,
}

impl Meta {
    pub fn new(y_vocab: HashMap<String, usize>) -> Self {
        Self { y_vocab }
    }

    /// Load `<data_root>/meta.json` and check the vocabulary is dense
    pub fn load(data_root: impl AsRef<Path>) -> Result<Self> {
        let path = data_root.as_ref().join(META_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read meta '{}'", path.display()))?;
        let meta: Meta = serde_json::from_str(&json)
            .with_context(|| format!("Malformed meta '{}'", path.display()))?;
        meta.class_labels()
            .with_context(|| format!("Invalid y_vocab in '{}'", path.display()))?;
        Ok(meta)
    }

    #[cfg(test)]
    pub fn save(&self, data_root: impl AsRef<Path>) -> Result<()> {
        let path = data_root.as_ref().join(META_FILE);
        fs::write(&path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("Cannot write meta '{}'", path.display()))
    }

    pub fn num_classes(&self) -> usize {
        self.y_vocab.len()
    }

    /// Build the class index → composite label table
    pub fn class_labels(&self) -> Result<ClassLabels, MetaError> {
        let len = self.y_vocab.len();
        let mut labels: Vec<Option<&str>> = vec![None; len];

        for (label, &index) in &self.y_vocab {
            let slot = labels
                .get_mut(index)
                .ok_or(MetaError::IndexOutOfRange { index, len })?;
            if let Some(first) = *slot {
                return Err(MetaError::DuplicateIndex {
                    index,
                    first:  first.to_string(),
                    second: label.clone(),
                });
            }
            *slot = Some(label.as_str());
        }

        // len entries, len distinct in-range indices → every slot is filled
        Ok(ClassLabels {
            labels: labels.into_iter().flatten().map(str::to_string).collect(),
        })
    }
}

/// Inverse of `y_vocab`: class index → composite label.
#[derive(Debug, Clone)]
pub struct ClassLabels {
    labels: Vec<String>,
}

impl ClassLabels {
    pub fn get(&self, class: usize) -> Option<&str> {
        self.labels.get(class).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }
}
