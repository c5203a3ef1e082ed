// ============================================================
// Layer 3 — Composite Label Decoding
// ============================================================
// Turns a predicted class index back into a category path:
//
//   class 17
//     │  inverse y_vocab
//     ▼
//   "3>41>512>-1"
//     │  split on '>'
//     ▼
//   (b=3, m=41, s=512, d=-1)
//     │  every code must exist at its taxonomy level
//     ▼
//   CategoryPath
//
// A failure anywhere in this chain means the vocabulary and the
// taxonomy are out of sync. Callers treat DecodeError as fatal.

use std::fmt;
use thiserror::Error;

use crate::domain::meta::{ClassLabels, Meta, MetaError};
use crate::domain::taxonomy::{InvertedTaxonomy, Level, Taxonomy};

/// Separator between level codes in a composite label
pub const LEVEL_SEPARATOR: char = '>';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("class index {class} is outside the vocabulary of {num_classes} labels")]
    UnknownClass { class: usize, num_classes: usize },

    #[error("composite label '{label}' is not of the form b>m>s>d")]
    MalformedLabel { label: String },

    #[error("code {code} of label '{label}' is not in taxonomy level '{level}'")]
    UnknownCode { level: Level, code: i64, label: String },
}

/// The four level codes of one leaf category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CategoryPath {
    pub b: i64,
    pub m: i64,
    pub s: i64,
    pub d: i64,
}

impl CategoryPath {
    pub fn new(b: i64, m: i64, s: i64, d: i64) -> Self {
        Self { b, m, s, d }
    }

    /// Parse `"b>m>s>d"` into its four integer codes
    pub fn parse(label: &str) -> Result<Self, DecodeError> {
        let malformed = || DecodeError::MalformedLabel { label: label.to_string() };

        let codes = label
            .split(LEVEL_SEPARATOR)
            .map(|t| t.trim().parse::<i64>().map_err(|_| malformed()))
            .collect::<Result<Vec<_>, _>>()?;

        match codes.as_slice() {
            &[b, m, s, d] => Ok(Self::new(b, m, s, d)),
            _ => Err(malformed()),
        }
    }

    pub fn code(&self, level: Level) -> i64 {
        match level {
            Level::Broad  => self.b,
            Level::Middle => self.m,
            Level::Sub    => self.s,
            Level::Detail => self.d,
        }
    }
}

impl fmt::Display for CategoryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}{sep}{}",
            self.b, self.m, self.s, self.d,
            sep = LEVEL_SEPARATOR,
        )
    }
}

/// Maps model class indices to validated category paths.
#[derive(Debug, Clone)]
pub struct LabelDecoder {
    labels:   ClassLabels,
    taxonomy: InvertedTaxonomy,
}

impl LabelDecoder {
    pub fn new(meta: &Meta, taxonomy: &Taxonomy) -> Result<Self, MetaError> {
        Ok(Self {
            labels:   meta.class_labels()?,
            taxonomy: taxonomy.inverted(),
        })
    }

    pub fn num_classes(&self) -> usize {
        self.labels.len()
    }

    pub fn taxonomy(&self) -> &InvertedTaxonomy {
        &self.taxonomy
    }

    /// Decode one predicted class index
    pub fn decode(&self, class: usize) -> Result<CategoryPath, DecodeError> {
        let label = self.labels.get(class).ok_or(DecodeError::UnknownClass {
            class,
            num_classes: self.labels.len(),
        })?;

        let path = CategoryPath::parse(label)?;
        for level in Level::ALL {
            let code = path.code(level);
            if !self.taxonomy.contains(level, code) {
                return Err(DecodeError::UnknownCode {
                    level,
                    code,
                    label: label.to_string(),
                });
            }
        }
        Ok(path)
    }
}
