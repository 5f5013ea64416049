//! Reporting utilities: spreads, curve snapshots, and formatted terminal output.

pub mod format;

pub use format::*;

use chrono::NaiveDate;

use crate::domain::{SpreadPair, YieldFrame};
use crate::error::AppError;

/// Add one `"{long}_{short}"` column per pair holding `frame[long] - frame[short]`.
///
/// The input frame's columns are kept; a spread whose name already exists
/// replaces that column's values. A row missing either side gets a missing spread.
pub fn compute_spreads(frame: &YieldFrame, pairs: &[SpreadPair]) -> Result<YieldFrame, AppError> {
    let mut resolved = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let long = frame
            .column_index(&pair.long)
            .ok_or_else(|| AppError::unknown_column(&pair.long))?;
        let short = frame
            .column_index(&pair.short)
            .ok_or_else(|| AppError::unknown_column(&pair.short))?;
        resolved.push((pair.name(), long, short));
    }

    let mut out = frame.clone();
    for (name, long, short) in resolved {
        let target = match out.column_index(&name) {
            Some(idx) => idx,
            None => {
                out.columns.push(name);
                out.columns.len() - 1
            }
        };
        for (row, src) in out.rows.iter_mut().zip(&frame.rows) {
            let spread = match (src.values.get(long).copied().flatten(), src.values.get(short).copied().flatten()) {
                (Some(a), Some(b)) => Some(a - b),
                _ => None,
            };
            if row.values.len() <= target {
                row.values.resize(target + 1, None);
            }
            row.values[target] = spread;
        }
    }

    Ok(out)
}

/// Names of the spread columns `compute_spreads` adds for `pairs`.
pub fn spread_columns(pairs: &[SpreadPair]) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(pairs.len());
    for name in pairs.iter().map(SpreadPair::name) {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Yield curves for the last few dates: one row per maturity, one column per date.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveSnapshot {
    pub dates: Vec<NaiveDate>,
    pub maturities: Vec<String>,
    /// `values[m][d]`: yield of maturity `m` on `dates[d]`.
    pub values: Vec<Vec<Option<f64>>>,
}

pub fn curve_snapshot(frame: &YieldFrame, last: usize) -> CurveSnapshot {
    let tail = frame.tail(last);
    let values = (0..tail.columns.len())
        .map(|m| tail.rows.iter().map(|r| r.values.get(m).copied().flatten()).collect())
        .collect();
    CurveSnapshot {
        dates: tail.dates(),
        maturities: tail.columns.clone(),
        values,
    }
}
