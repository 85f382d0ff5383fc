//! Human-readable formatting for command output.

use vegh_snapshot::{CheckReport, LanguageSummary};
use vegh_transfer::ProgressUpdate;

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Binary-prefixed size with two decimals: `1536` -> `1.50 KB`.
pub(crate) fn human_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}

/// One-line progress: `chunks 3/12 (25%)  30.00 MB  4.20 MB/s`.
pub(crate) fn progress_line(update: &ProgressUpdate) -> String {
    let s = &update.snapshot;
    let percent = if s.total == 0 {
        100
    } else {
        s.completed * 100 / s.total
    };
    format!(
        "chunks {}/{} ({percent}%)  {}  {}/s",
        s.completed,
        s.total,
        human_bytes(s.bytes_done),
        human_bytes(update.bytes_per_second as u64),
    )
}

pub(crate) fn check_report(name: &str, report: &CheckReport) -> String {
    let meta = &report.metadata;
    let mut out = format!(
        "Integrity verified: {name}\n  SHA256:  {}\n  Author:  {}\n  Created: {}\n  Tool:    {}\n",
        report.digest,
        meta.author_display(),
        meta.created_display(),
        meta.tool_display(),
    );
    if let Some(comment) = &meta.comment {
        out.push_str(&format!("  Comment: {comment}\n"));
    }
    out
}

pub(crate) fn loc_table(rows: &[LanguageSummary], total_files: u64, total_lines: u64) -> String {
    let width = rows
        .iter()
        .map(|r| r.language.len())
        .max()
        .unwrap_or(0)
        .max("Language".len());

    let mut out = format!("{:<width$}  {:>7}  {:>10}  {:>6}\n", "Language", "Files", "Lines", "%");
    for r in rows {
        out.push_str(&format!(
            "{:<width$}  {:>7}  {:>10}  {:>5.1}%\n",
            r.language, r.files, r.lines, r.percent
        ));
    }
    out.push_str(&format!(
        "{:<width$}  {:>7}  {:>10}\n",
        "Total", total_files, total_lines
    ));
    out
}
