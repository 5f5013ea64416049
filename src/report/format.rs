//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the loader and spread code stay clean and testable
//! - output changes are localized (important for future snapshot tests)

use chrono::NaiveDate;

use crate::config::DataConfig;
use crate::domain::{YieldFrame, DATE_COLUMN};
use crate::report::CurveSnapshot;

const DATE_WIDTH: usize = 10;
const MIN_VALUE_WIDTH: usize = 7;

/// Header block describing what was loaded.
pub fn format_run_summary(dataset: &str, as_of: NaiveDate, frame: &YieldFrame) -> String {
    let mut out = String::new();

    out.push_str("=== yields - Treasury Daily Yield Curve ===\n");
    out.push_str(&format!("Dataset: {dataset}\n"));
    out.push_str(&format!("As-of: {as_of}\n"));
    match (frame.rows.first(), frame.rows.last()) {
        (Some(first), Some(last)) => out.push_str(&format!(
            "Rows: n={} | {} .. {}\n",
            frame.len(),
            first.date,
            last.date
        )),
        _ => out.push_str("Rows: n=0\n"),
    }
    out.push_str(&format!("Maturities: {}\n", frame.columns.len()));
    out.push('\n');

    out
}

/// Render a frame as a fixed-width table: the date, then one column per label.
pub fn format_frame(frame: &YieldFrame) -> String {
    let widths: Vec<usize> = frame
        .columns
        .iter()
        .map(|c| c.chars().count().max(MIN_VALUE_WIDTH))
        .collect();

    let mut out = String::new();

    let mut line = format!("{:<width$}", DATE_COLUMN, width = DATE_WIDTH);
    for (label, &w) in frame.columns.iter().zip(&widths) {
        line.push_str(&format!(" {label:>w$}"));
    }
    push_line(&mut out, &line);

    let mut line = "-".repeat(DATE_WIDTH);
    for w in &widths {
        line.push(' ');
        line.push_str(&"-".repeat(*w));
    }
    push_line(&mut out, &line);

    for row in &frame.rows {
        let mut line = format!("{:<width$}", row.date.to_string(), width = DATE_WIDTH);
        for (idx, &w) in widths.iter().enumerate() {
            let v = row.values.get(idx).copied().flatten();
            line.push_str(&format!(" {:>w$}", fmt_opt(v)));
        }
        push_line(&mut out, &line);
    }

    out
}

/// Spread table followed by an inversion summary per spread.
///
/// A spread below zero means the longer maturity yields less than the shorter one.
pub fn format_spreads(spreads: &YieldFrame) -> String {
    let mut out = format_frame(spreads);

    out.push_str("\nInversions (spread < 0):\n");
    for (idx, label) in spreads.columns.iter().enumerate() {
        let values: Vec<f64> = spreads
            .rows
            .iter()
            .filter_map(|r| r.values.get(idx).copied().flatten())
            .collect();
        let inverted = values.iter().filter(|v| **v < 0.0).count();
        let latest = spreads
            .rows
            .iter()
            .rev()
            .find_map(|r| r.values.get(idx).copied().flatten());
        let flag = if latest.is_some_and(|v| v < 0.0) { "  INVERTED" } else { "" };
        out.push_str(&format!(
            "  {:<14} {inverted:>4}/{:<4} latest={}{flag}\n",
            display_label(label),
            values.len(),
            fmt_opt(latest),
        ));
    }

    out
}

/// Render curves with maturities as rows and dates (`Mon DD, YYYY`) as columns.
pub fn format_curves(snapshot: &CurveSnapshot) -> String {
    let headers: Vec<String> = snapshot
        .dates
        .iter()
        .map(|d| d.format("%b %d, %Y").to_string())
        .collect();
    let label_width = snapshot
        .maturities
        .iter()
        .map(|m| m.chars().count())
        .max()
        .unwrap_or(0)
        .max("maturity".len());

    let mut out = String::new();

    let mut line = format!("{:<label_width$}", "maturity");
    for h in &headers {
        line.push_str(&format!(" {h:>12}"));
    }
    push_line(&mut out, &line);

    for (m, label) in snapshot.maturities.iter().enumerate() {
        let mut line = format!("{:<label_width$}", display_label(label));
        for v in snapshot.values.get(m).into_iter().flatten() {
            line.push_str(&format!(" {:>12}", fmt_opt(*v)));
        }
        push_line(&mut out, &line);
    }

    out
}

/// List configured datasets with their resolved local path and URL template.
pub fn format_datasets(config: &DataConfig) -> String {
    let mut out = String::new();
    for name in config.names() {
        out.push_str(&format!("{name}\n"));
        if let Ok(path) = config.local_path(name) {
            out.push_str(&format!("  local : {}\n", path.display()));
        }
        if let Ok(d) = config.descriptor(name) {
            out.push_str(&format!("  remote: {}\n", d.link));
            match d.year {
                Some(y) => out.push_str(&format!("  year  : {y}\n")),
                None => out.push_str("  year  : (requested date)\n"),
            }
            out.push_str(&format!("  table : #{}\n", d.table_index));
        }
    }
    out
}

/// `"10_yr"` -> `"10 yr"`.
pub fn display_label(label: &str) -> String {
    label.replace('_', " ")
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line.trim_end());
    out.push('\n');
}

fn fmt_opt(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.2}"),
        _ => "-".to_string(),
    }
}
