//! Output formatting for estimates and augmented calibration data (JSON, CSV, console).

use crate::models::{
    Atom, BatchEntry, CorpusStats, FlatAugmentedRecord, FlatPageLength, LocationEstimate,
};
use serde::Serialize;
use std::borrow::Cow;
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

fn write_pretty_json<T: Serialize + ?Sized, W: Write>(
    value: &T,
    writer: &mut W,
) -> Result<(), OutputError> {
    let json = serde_json::to_string_pretty(value)?;
    writer.write_all(json.as_bytes())?;
    writer.write_all(b"\n")?;
    Ok(())
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Quote a CSV field when it holds a delimiter, quote or line break.
fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

fn atom_cell(atom: Atom) -> String {
    match atom {
        Atom::Absent => String::new(),
        other => other.to_string(),
    }
}

// ============================================================================
// Estimates
// ============================================================================

/// Write batch results as JSON.
pub fn write_estimates_json<W: Write>(
    entries: &[BatchEntry],
    writer: &mut W,
) -> Result<(), OutputError> {
    write_pretty_json(entries, writer)
}

/// Write batch results as JSON to a file.
pub fn write_estimates_json_file(entries: &[BatchEntry], path: &Path) -> Result<(), OutputError> {
    let mut file = std::fs::File::create(path)?;
    write_estimates_json(entries, &mut file)
}

/// Write batch results as CSV.
pub fn write_estimates_csv<W: Write>(
    entries: &[BatchEntry],
    writer: &mut W,
) -> Result<(), OutputError> {
    writeln!(writer, "citation,page,fline_guess,line_guess,column_guess,error")?;

    for entry in entries {
        match &entry.estimate {
            Some(est) => writeln!(
                writer,
                "{},{},{},{},{},",
                csv_field(&entry.citation), est.page, est.fline_guess, est.line_guess, est.column_guess
            )?,
            None => writeln!(
                writer,
                "{},,,,,{}",
                csv_field(&entry.citation),
                csv_field(entry.error.as_deref().unwrap_or_default())
            )?,
        }
    }

    Ok(())
}

/// Write batch results as CSV to a file.
pub fn write_estimates_csv_file(entries: &[BatchEntry], path: &Path) -> Result<(), OutputError> {
    let mut file = std::fs::File::create(path)?;
    write_estimates_csv(entries, &mut file)
}

/// Format a single estimate for display.
pub fn format_estimate(estimate: &LocationEstimate) -> String {
    format!(
        "page {} column {} line {} (flat line {})",
        estimate.page, estimate.column_guess, estimate.line_guess, estimate.fline_guess
    )
}

/// Print batch results in a human-readable format.
pub fn print_estimates(entries: &[BatchEntry], limit: Option<usize>) {
    let to_print = match limit {
        Some(n) => &entries[..n.min(entries.len())],
        None => entries,
    };

    for entry in to_print {
        match (&entry.estimate, &entry.error) {
            (Some(est), _) => println!("{}: {}", entry.citation, format_estimate(est)),
            (None, Some(err)) => println!("{}: error: {}", entry.citation, err),
            (None, None) => println!("{}: no estimate", entry.citation),
        }
    }

    if let Some(n) = limit {
        if entries.len() > n {
            println!("... and {} more citations", entries.len() - n);
        }
    }
}

// ============================================================================
// Augmented records and page lengths
// ============================================================================

/// Write augmented records as JSON.
pub fn write_augmented_json<W: Write>(
    records: &[FlatAugmentedRecord],
    writer: &mut W,
) -> Result<(), OutputError> {
    write_pretty_json(records, writer)
}

/// Write augmented records as CSV.
pub fn write_augmented_csv<W: Write>(
    records: &[FlatAugmentedRecord],
    writer: &mut W,
) -> Result<(), OutputError> {
    writeln!(
        writer,
        "page,startco,startli,stopco,stopli,bkid,startc,startv,startp,stopc,stopv,stopp,note,\
         start_word_count,stop_word_count,startl,stopl"
    )?;

    for r in records {
        let f = &r.record;
        writeln!(
            writer,
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            f.page,
            opt(f.startco),
            opt(f.startli),
            opt(f.stopco),
            opt(f.stopli),
            csv_field(f.bkid.as_deref().unwrap_or_default()),
            opt(f.startc),
            opt(f.startv),
            atom_cell(f.startp),
            opt(f.stopc),
            opt(f.stopv),
            atom_cell(f.stopp),
            csv_field(f.note.as_deref().unwrap_or_default()),
            opt(r.start_word_count),
            opt(r.stop_word_count),
            opt(r.startl),
            opt(r.stopl),
        )?;
    }

    Ok(())
}

/// Write page lengths as JSON.
pub fn write_page_lengths_json<W: Write>(
    lengths: &[FlatPageLength],
    writer: &mut W,
) -> Result<(), OutputError> {
    write_pretty_json(lengths, writer)
}

/// Write page lengths as CSV.
pub fn write_page_lengths_csv<W: Write>(
    lengths: &[FlatPageLength],
    writer: &mut W,
) -> Result<(), OutputError> {
    writeln!(writer, "page,word_count")?;
    for length in lengths {
        writeln!(writer, "{},{}", length.page, opt(length.word_count))?;
    }
    Ok(())
}

/// Print calibration statistics.
pub fn print_stats(stats: &CorpusStats) {
    println!("=== Calibration Statistics ===");
    println!("Breakpoint records: {}", stats.total_records);
    println!("  Biblical: {}", stats.biblical_records);
    println!("  Non-biblical: {}", stats.non_biblical_records);
    println!("  Pinpointed to column/line: {}", stats.pinpointed_records);
    println!("Pages: {}", stats.pages);
    println!("Words on calibrated pages: {}", stats.total_words);
    if stats.pages > 0 {
        println!(
            "Avg words/page: {:.1}",
            stats.total_words as f64 / stats.pages as f64
        );
    }
    println!("Books ({}): {}", stats.books.len(), stats.books.join(", "));
}
