//! Tabular and JSON export of run output.

use crate::metrics::RunSummary;
use crate::subject::DecisionResult;
use std::borrow::Cow;
use std::io::{self, Write};

pub const RESULTS_CSV_HEADER: &str =
    "subject_id,night_index,chosen_action,resulting_CSI,resulting_CStab,sleep_debt,night_status";

/// Quote a field when it contains a delimiter, a quote or a line break.
fn csv_field(raw: &str) -> Cow<'_, str> {
    if raw.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", raw.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(raw)
    }
}

/// Write one row per result under [`RESULTS_CSV_HEADER`]. A night without
/// an action leaves `chosen_action` empty. Returns the number of rows.
pub fn write_results_csv<W: Write>(writer: &mut W, results: &[DecisionResult]) -> io::Result<usize> {
    writeln!(writer, "{RESULTS_CSV_HEADER}")?;
    for r in results {
        writeln!(
            writer,
            "{},{},{},{},{},{},{}",
            csv_field(&r.subject_id),
            csv_field(&r.night_index),
            csv_field(r.chosen_action.as_deref().unwrap_or("")),
            r.resulting_primary,
            r.resulting_stability,
            r.sleep_debt,
            csv_field(r.night_status.as_str()),
        )?;
    }
    writer.flush()?;
    Ok(results.len())
}

pub fn write_summary_json<W: Write>(writer: W, summary: &RunSummary) -> serde_json::Result<()> {
    serde_json::to_writer_pretty(writer, summary)
}
