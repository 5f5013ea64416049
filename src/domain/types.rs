//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - read from and appended to the local CSV store
//! - built from the remote HTML table
//! - exported to JSON/CSV or printed as text tables

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Name of the column every dataset is keyed on.
pub const DATE_COLUMN: &str = "date";

/// The single date type every accepted date representation normalizes to.
pub type CanonicalDate = NaiveDate;

/// Normalize a raw column header to a maturity label.
///
/// `"10 Yr"` becomes `"10_yr"`. A UTF-8 BOM on the first header is stripped
/// so a store saved by a spreadsheet still exposes its `date` column.
pub fn normalize_label(raw: &str) -> String {
    raw.trim()
        .trim_start_matches('\u{feff}')
        .trim()
        .replace(' ', "_")
        .to_lowercase()
}

/// One observation date and its yields, aligned with the owning frame's columns.
#[derive(Debug, Clone, PartialEq)]
pub struct YieldRow {
    pub date: CanonicalDate,
    /// Yield in percent per column; `None` when the publisher left the cell blank.
    pub values: Vec<Option<f64>>,
}

/// An ordered sequence of rows sharing one column set.
///
/// `columns` holds the maturity labels only; the date lives on each row.
/// Transformations return new frames instead of mutating in place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct YieldFrame {
    pub columns: Vec<String>,
    pub rows: Vec<YieldRow>,
}

impl YieldFrame {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == label)
    }

    pub fn has_column(&self, label: &str) -> bool {
        self.column_index(label).is_some()
    }

    /// All values of one column in row order.
    pub fn column(&self, label: &str) -> Result<Vec<Option<f64>>, AppError> {
        let idx = self
            .column_index(label)
            .ok_or_else(|| AppError::unknown_column(label))?;
        Ok(self
            .rows
            .iter()
            .map(|r| r.values.get(idx).copied().flatten())
            .collect())
    }

    pub fn value(&self, row: usize, label: &str) -> Option<f64> {
        let idx = self.column_index(label)?;
        self.rows.get(row)?.values.get(idx).copied().flatten()
    }

    pub fn dates(&self) -> Vec<CanonicalDate> {
        self.rows.iter().map(|r| r.date).collect()
    }

    pub fn last_date(&self) -> Option<CanonicalDate> {
        self.rows.iter().map(|r| r.date).max()
    }

    /// Keep rows matching `keep`, preserving order.
    pub fn filter<F>(&self, mut keep: F) -> YieldFrame
    where
        F: FnMut(&YieldRow) -> bool,
    {
        YieldFrame {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|&r| keep(r)).cloned().collect(),
        }
    }

    /// The last `n` rows in stored order.
    pub fn tail(&self, n: usize) -> YieldFrame {
        let start = self.rows.len().saturating_sub(n);
        YieldFrame {
            columns: self.columns.clone(),
            rows: self.rows[start..].to_vec(),
        }
    }

    /// Stack frames row-wise, sorted by date.
    ///
    /// Columns are the union of every frame's columns in first-seen order;
    /// a cell a frame does not carry is missing.
    pub fn concat(frames: impl IntoIterator<Item = YieldFrame>) -> YieldFrame {
        let frames: Vec<YieldFrame> = frames.into_iter().collect();

        let mut out = YieldFrame::default();
        for label in frames.iter().flat_map(|f| f.columns.iter()) {
            if !out.has_column(label) {
                out.columns.push(label.clone());
            }
        }

        for frame in frames {
            let sources: Vec<Option<usize>> = out.columns.iter().map(|c| frame.column_index(c)).collect();
            out.rows.extend(frame.rows.into_iter().map(|row| YieldRow {
                date: row.date,
                values: sources
                    .iter()
                    .map(|src| src.and_then(|i| row.values.get(i).copied().flatten()))
                    .collect(),
            }));
        }
        out.rows.sort_by_key(|r| r.date);
        out
    }

    /// Keep the date plus the named columns, in the order given.
    pub fn select(&self, labels: &[String]) -> Result<YieldFrame, AppError> {
        let idxs = labels
            .iter()
            .map(|l| self.column_index(l).ok_or_else(|| AppError::unknown_column(l)))
            .collect::<Result<Vec<_>, _>>()?;

        let rows = self
            .rows
            .iter()
            .map(|r| YieldRow {
                date: r.date,
                values: idxs.iter().map(|&i| r.values.get(i).copied().flatten()).collect(),
            })
            .collect();

        Ok(YieldFrame {
            columns: labels.to_vec(),
            rows,
        })
    }
}

/// A pair of maturities whose difference is reported as a spread column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpreadPair {
    pub long: String,
    pub short: String,
}

impl SpreadPair {
    pub fn new(long: impl Into<String>, short: impl Into<String>) -> Self {
        Self {
            long: long.into(),
            short: short.into(),
        }
    }

    /// Derived column name: `"{long}_{short}"`.
    pub fn name(&self) -> String {
        format!("{}_{}", self.long, self.short)
    }

    /// Pairs plotted by default: 10y-2y, 10y-6m, 5y-2y.
    pub fn defaults() -> Vec<SpreadPair> {
        vec![
            SpreadPair::new("10_yr", "2_yr"),
            SpreadPair::new("10_yr", "6_mo"),
            SpreadPair::new("5_yr", "2_yr"),
        ]
    }
}

impl FromStr for SpreadPair {
    type Err = String;

    /// Parse `A:B` (e.g. `10_yr:2_yr`). Labels are normalized.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (a, b) = s
            .split_once(':')
            .ok_or_else(|| format!("Invalid spread pair '{s}'. Expected LONG:SHORT, e.g. 10_yr:2_yr."))?;
        let (a, b) = (normalize_label(a), normalize_label(b));
        if a.is_empty() || b.is_empty() {
            return Err(format!("Invalid spread pair '{s}': empty maturity label."));
        }
        Ok(SpreadPair::new(a, b))
    }
}

/// Portable JSON representation of an exported frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameFile {
    pub tool: String,
    pub dataset: String,
    pub as_of: NaiveDate,
    pub columns: Vec<String>,
    pub rows: Vec<FrameFileRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameFileRow {
    pub date: NaiveDate,
    pub values: Vec<Option<f64>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2019, 6, day).unwrap()
    }

    fn sample() -> YieldFrame {
        YieldFrame {
            columns: vec!["2_yr".to_string(), "10_yr".to_string()],
            rows: vec![
                YieldRow { date: d(12), values: vec![Some(1.9), Some(2.1)] },
                YieldRow { date: d(13), values: vec![Some(1.8), None] },
                YieldRow { date: d(14), values: vec![Some(1.85), Some(2.09)] },
            ],
        }
    }

    #[test]
    fn labels_are_normalized() {
        assert_eq!(normalize_label("10 Yr"), "10_yr");
        assert_eq!(normalize_label("\u{feff}Date"), "date");
        assert_eq!(normalize_label("  6 MO "), "6_mo");
    }

    #[test]
    fn tail_keeps_stored_order() {
        let t = sample().tail(2);
        assert_eq!(t.dates(), vec![d(13), d(14)]);
        assert_eq!(sample().tail(10).len(), 3);
        assert!(sample().tail(0).is_empty());
    }

    #[test]
    fn select_reorders_and_rejects_unknown() {
        let s = sample().select(&["10_yr".to_string()]).unwrap();
        assert_eq!(s.columns, vec!["10_yr"]);
        assert_eq!(s.column("10_yr").unwrap(), vec![Some(2.1), None, Some(2.09)]);

        let err = sample().select(&["30_yr".to_string()]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::UnknownColumn);
    }

    #[test]
    fn concat_unions_columns_and_sorts_by_date() {
        let later = YieldFrame {
            columns: vec!["2_mo".to_string(), "10_yr".to_string()],
            rows: vec![YieldRow { date: d(11), values: vec![Some(2.2), Some(2.14)] }],
        };
        let all = YieldFrame::concat([sample(), later]);

        assert_eq!(all.columns, vec!["2_yr", "10_yr", "2_mo"]);
        assert_eq!(all.dates(), vec![d(11), d(12), d(13), d(14)]);
        assert_eq!(all.rows[0].values, vec![None, Some(2.14), Some(2.2)]);
        assert_eq!(all.rows[1].values, vec![Some(1.9), Some(2.1), None]);
        assert!(YieldFrame::concat(Vec::<YieldFrame>::new()).is_empty());
    }

    #[test]
    fn spread_pair_parses_and_names() {
        let p: SpreadPair = "10 Yr:2_yr".parse().unwrap();
        assert_eq!(p, SpreadPair::new("10_yr", "2_yr"));
        assert_eq!(p.name(), "10_yr_2_yr");
        assert!("10_yr".parse::<SpreadPair>().is_err());
        assert!(":2_yr".parse::<SpreadPair>().is_err());
    }
}
