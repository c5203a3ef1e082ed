// ============================================================
// Layer 3 — Prediction Records
// ============================================================
// Formats decoded predictions as output lines and lays them out
// over the full product-id universe:
//
//   universe   [p1, p2, p3, p4]
//   scored     {p1 → "p1\t1\t10\t100\t1000", p3 → ...}
//   output     p1\t1\t10\t100\t1000
//              p2\t-1\t-1\t-1\t-1      ← no answer
//              p3\t...
//              p4\t-1\t-1\t-1\t-1      ← no answer
//
// The output always has exactly one line per universe pid.

use std::collections::HashMap;

use crate::domain::label::{CategoryPath, DecodeError, LabelDecoder};
use crate::domain::taxonomy::Level;

/// Code written in every level of a pid that received no prediction
pub const NO_ANSWER_CODE: i64 = -1;

/// One scored row: the product and its arg-max class index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionRow {
    pub pid:   String,
    pub class: usize,
}

impl PredictionRow {
    pub fn new(pid: impl Into<String>, class: usize) -> Self {
        Self { pid: pid.into(), class }
    }
}

/// `pid\t-1\t-1\t-1\t-1`
pub fn no_answer_line(pid: &str) -> String {
    let c = NO_ANSWER_CODE;
    format!("{pid}\t{c}\t{c}\t{c}\t{c}")
}

/// Render a decoded path either as raw codes or as taxonomy names
pub fn format_line(
    pid:      &str,
    path:     &CategoryPath,
    decoder:  &LabelDecoder,
    readable: bool,
) -> String {
    let fields: Vec<String> = Level::ALL
        .iter()
        .map(|&level| {
            let code = path.code(level);
            if readable {
                // decode() already checked every code exists at its level
                decoder
                    .taxonomy()
                    .name(level, code)
                    .map(str::to_string)
                    .unwrap_or_else(|| code.to_string())
            } else {
                code.to_string()
            }
        })
        .collect();

    format!("{pid}\t{}", fields.join("\t"))
}

/// Decode every scored row into its output line, keyed by pid.
/// A pid scored more than once keeps its last line.
pub fn render_predictions(
    rows:     &[PredictionRow],
    decoder:  &LabelDecoder,
    readable: bool,
) -> Result<HashMap<String, String>, DecodeError> {
    let mut lines = HashMap::with_capacity(rows.len());
    for row in rows {
        let path = decoder.decode(row.class)?;
        lines.insert(row.pid.clone(), format_line(&row.pid, &path, decoder, readable));
    }
    Ok(lines)
}

/// One line per universe pid, in universe order.
pub fn layout_over_universe<'a>(
    universe: &'a [String],
    lines:    &'a HashMap<String, String>,
) -> impl Iterator<Item = String> + 'a {
    universe.iter().map(move |pid| {
        lines.get(pid).cloned().unwrap_or_else(|| no_answer_line(pid))
    })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::label::tests::{meta, taxonomy};

    fn decoder() -> LabelDecoder {
        LabelDecoder::new(&meta(), &taxonomy()).unwrap()
    }

    fn universe(pids: &[&str]) -> Vec<String> {
        pids.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_no_answer_line() {
        assert_eq!(no_answer_line("P001"), "P001\t-1\t-1\t-1\t-1");
    }

    #[test]
    fn test_every_universe_pid_gets_exactly_one_line() {
        let decoder = decoder();
        let rows    = vec![PredictionRow::new("B", 0), PredictionRow::new("D", 1)];
        let lines   = render_predictions(&rows, &decoder, false).unwrap();

        let universe = universe(&["A", "B", "C", "D", "E"]);
        let out: Vec<String> = layout_over_universe(&universe, &lines).collect();

        assert_eq!(out, vec![
            "A\t-1\t-1\t-1\t-1",
            "B\t1\t10\t100\t1000",
            "C\t-1\t-1\t-1\t-1",
            "D\t2\t20\t200\t-1",
            "E\t-1\t-1\t-1\t-1",
        ]);
    }

    #[test]
    fn test_scored_pids_outside_universe_are_dropped() {
        let decoder = decoder();
        let rows    = vec![PredictionRow::new("X", 0)];
        let lines   = render_predictions(&rows, &decoder, false).unwrap();

        let universe = universe(&["A"]);
        let out: Vec<String> = layout_over_universe(&universe, &lines).collect();
        assert_eq!(out, vec!["A\t-1\t-1\t-1\t-1"]);
    }

    #[test]
    fn test_readable_fields_match_code_fields() {
        let decoder = decoder();
        let rows    = vec![PredictionRow::new("P", 0)];

        let codes    = render_predictions(&rows, &decoder, false).unwrap();
        let readable = render_predictions(&rows, &decoder, true).unwrap();

        let code_fields: Vec<&str> = codes["P"].split('\t').collect();
        let name_fields: Vec<&str> = readable["P"].split('\t').collect();
        assert_eq!(name_fields[0], "P");
        assert_eq!(name_fields[1..], ["패션의류", "남성의류", "셔츠", "반팔셔츠"]);

        for (level, (code, name)) in Level::ALL
            .iter()
            .zip(code_fields[1..].iter().zip(&name_fields[1..]))
        {
            let code: i64 = code.parse().unwrap();
            assert_eq!(decoder.taxonomy().name(*level, code), Some(*name));
        }
    }

    #[test]
    fn test_last_duplicate_wins() {
        let decoder = decoder();
        let rows    = vec![PredictionRow::new("P", 0), PredictionRow::new("P", 1)];
        let lines   = render_predictions(&rows, &decoder, false).unwrap();
        assert_eq!(lines["P"], "P\t2\t20\t200\t-1");
    }

    #[test]
    fn test_integrity_failure_stops_rendering() {
        let decoder = decoder();
        let rows    = vec![PredictionRow::new("P", 0), PredictionRow::new("Q", 42)];
        assert!(matches!(
            render_predictions(&rows, &decoder, false),
            Err(DecodeError::UnknownClass { class: 42, .. })
        ));
    }
}
