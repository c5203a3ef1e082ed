// ============================================================
// Layer 3 — Category Taxonomy
// ============================================================
// The four-level product category tree, flattened into one
// name → code map per level:
//
//   b — broad   (대분류)
//   m — middle  (중분류)
//   s — sub     (소분류)
//   d — detail  (세분류)
//
// The file on disk is a JSON object with exactly those four keys:
//   { "b": { "가구": 1, ... }, "m": { ... }, "s": { ... }, "d": { ... } }
//
// Loaded once per command and never mutated afterwards.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, fs, path::Path};

/// One of the four taxonomy levels, in path order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Broad,
    Middle,
    Sub,
    Detail,
}

impl Level {
    pub const ALL: [Level; 4] = [Level::Broad, Level::Middle, Level::Sub, Level::Detail];

    /// The single-letter key used in the taxonomy file
    pub fn key(self) -> &'static str {
        match self {
            Level::Broad  => "b",
            Level::Middle => "m",
            Level::Sub    => "s",
            Level::Detail => "d",
        }
    }

    /// Position of this level inside a composite `b>m>s>d` label
    pub fn index(self) -> usize {
        match self {
            Level::Broad  => 0,
            Level::Middle => 1,
            Level::Sub    => 2,
            Level::Detail => 3,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Name → code mappings for all four levels.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Taxonomy {
    pub b: HashMap<String, i64>,
    pub m: HashMap<String, i64>,
    pub s: HashMap<String, i64>,
    pub d: HashMap<String, i64>,
}

impl Taxonomy {
    /// Read a `cate1.json`-style taxonomy file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read taxonomy '{}'", path.display()))?;
        let taxonomy: Taxonomy = serde_json::from_str(&json)
            .with_context(|| format!("Malformed taxonomy '{}'", path.display()))?;

        tracing::debug!(
            "Taxonomy loaded: b={} m={} s={} d={}",
            taxonomy.b.len(), taxonomy.m.len(), taxonomy.s.len(), taxonomy.d.len(),
        );
        Ok(taxonomy)
    }

    #[cfg(test)]
    pub fn level(&self, level: Level) -> &HashMap<String, i64> {
        match level {
            Level::Broad  => &self.b,
            Level::Middle => &self.m,
            Level::Sub    => &self.s,
            Level::Detail => &self.d,
        }
    }

    /// Build the code → name view used for decoding predictions
    pub fn inverted(&self) -> InvertedTaxonomy {
        let invert = |map: &HashMap<String, i64>| -> HashMap<i64, String> {
            map.iter().map(|(name, &code)| (code, name.clone())).collect()
        };
        InvertedTaxonomy {
            levels: [invert(&self.b), invert(&self.m), invert(&self.s), invert(&self.d)],
        }
    }
}

/// Code → name mappings, indexed by [`Level::index`].
#[derive(Debug, Clone)]
pub struct InvertedTaxonomy {
    levels: [HashMap<i64, String>; 4],
}

impl InvertedTaxonomy {
    pub fn contains(&self, level: Level, code: i64) -> bool {
        self.levels[level.index()].contains_key(&code)
    }

    pub fn name(&self, level: Level, code: i64) -> Option<&str> {
        self.levels[level.index()].get(&code).map(String::as_str)
    }
}
