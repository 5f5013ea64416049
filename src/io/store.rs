//! Append-only CSV store for one dataset.
//!
//! Layout: a header row (first column `date`, then maturity labels) followed by
//! one row per observation date, oldest first. The store is only ever grown by
//! `append`; existing rows and the header are never rewritten.
//!
//! Single-process, single-writer: no file locking is attempted.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use csv::StringRecord;

use crate::data::dates::{format_stored, parse_date};
use crate::domain::{normalize_label, CanonicalDate, YieldFrame, YieldRow, DATE_COLUMN};
use crate::error::AppError;

/// Resolved header of an existing store.
#[derive(Debug, Clone)]
struct StoreHeader {
    date_idx: usize,
    /// `(record index, label)` for every non-date column, in file order.
    columns: Vec<(usize, String)>,
    width: usize,
}

impl StoreHeader {
    fn from_record(headers: &StringRecord, path: &Path) -> Result<Self, AppError> {
        let labels: Vec<String> = headers.iter().map(normalize_label).collect();
        let date_idx = labels.iter().position(|l| l == DATE_COLUMN).ok_or_else(|| {
            AppError::storage(format!(
                "Store '{}' has no `{DATE_COLUMN}` column in its header.",
                path.display()
            ))
        })?;
        let columns = labels
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != date_idx)
            .map(|(idx, label)| (idx, label.clone()))
            .collect();
        Ok(Self {
            date_idx,
            columns,
            width: labels.len(),
        })
    }

    fn labels(&self) -> Vec<String> {
        self.columns.iter().map(|(_, l)| l.clone()).collect()
    }
}

/// The on-disk copy of one dataset.
#[derive(Debug, Clone)]
pub struct LocalStore {
    path: PathBuf,
}

impl LocalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Maximum date over every stored row.
    pub fn most_recent_date(&self) -> Result<CanonicalDate, AppError> {
        let Some((mut reader, header)) = self.open()? else {
            return Err(self.empty_error());
        };

        let mut latest: Option<CanonicalDate> = None;
        for (idx, result) in reader.records().enumerate() {
            let record = self.record(result, idx)?;
            let date = parse_row_date(&record, &header, idx)?;
            latest = Some(latest.map_or(date, |l| l.max(date)));
        }

        latest.ok_or_else(|| self.empty_error())
    }

    /// Every stored row, in stored order.
    pub fn read_all(&self) -> Result<YieldFrame, AppError> {
        let Some((mut reader, header)) = self.open()? else {
            return Ok(YieldFrame::default());
        };

        let mut frame = YieldFrame::new(header.labels());
        for (idx, result) in reader.records().enumerate() {
            let record = self.record(result, idx)?;
            let date = parse_row_date(&record, &header, idx)?;
            let values = header
                .columns
                .iter()
                .map(|(col, _)| parse_opt_f64(record.get(*col)))
                .collect();
            frame.rows.push(YieldRow { date, values });
        }

        Ok(frame)
    }

    /// The last `lookback` stored rows dated on or before `as_of`.
    pub fn read_through(&self, as_of: CanonicalDate, lookback: usize) -> Result<YieldFrame, AppError> {
        let frame = self.read_all()?;
        let total = frame.len();
        let window = frame.filter(|r| r.date <= as_of).tail(lookback);
        log::debug!(
            "read {} of {total} row(s) through {as_of} from '{}'",
            window.len(),
            self.path.display()
        );
        Ok(window)
    }

    /// Append rows to the end of the store without touching the header.
    ///
    /// Values are matched to the stored header by label: header columns the
    /// frame lacks are written empty, frame columns the header lacks are dropped.
    /// Returns the number of rows written.
    pub fn append(&self, frame: &YieldFrame) -> Result<usize, AppError> {
        if frame.is_empty() {
            return Ok(0);
        }

        let Some((_, header)) = self.open()? else {
            return Err(AppError::storage(format!(
                "Cannot append to '{}': the store has no header.",
                self.path.display()
            )));
        };

        let dropped: Vec<&str> = frame
            .columns
            .iter()
            .filter(|c| !header.columns.iter().any(|(_, l)| l == *c))
            .map(String::as_str)
            .collect();
        if !dropped.is_empty() {
            log::warn!(
                "columns not present in '{}' are dropped on append: {}",
                self.path.display(),
                dropped.join(", ")
            );
        }

        // Map each header position to a frame column (or none).
        let mut sources: Vec<Option<usize>> = vec![None; header.width];
        for (idx, label) in &header.columns {
            sources[*idx] = frame.column_index(label);
        }

        self.ensure_trailing_newline()?;

        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| AppError::storage(format!("Failed to open '{}' for append: {e}", self.path.display())))?;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);

        for row in &frame.rows {
            let record = (0..header.width).map(|pos| {
                if pos == header.date_idx {
                    format_stored(row.date)
                } else {
                    sources[pos]
                        .and_then(|col| row.values.get(col).copied().flatten())
                        .map(format_value)
                        .unwrap_or_default()
                }
            });
            writer
                .write_record(record)
                .map_err(|e| AppError::storage(format!("Failed to append row for {}: {e}", row.date)))?;
        }
        writer
            .flush()
            .map_err(|e| AppError::storage(format!("Failed to flush '{}': {e}", self.path.display())))?;

        log::info!("appended {} row(s) to '{}'", frame.len(), self.path.display());
        Ok(frame.len())
    }

    /// Write a brand-new store (header plus rows). Refuses to overwrite.
    pub fn create(&self, frame: &YieldFrame) -> Result<usize, AppError> {
        if self.path.exists() {
            return Err(AppError::storage(format!(
                "Refusing to overwrite existing store '{}'.",
                self.path.display()
            )));
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::storage(format!("Failed to create '{}': {e}", parent.display())))?;
        }

        let file = File::create(&self.path)
            .map_err(|e| AppError::storage(format!("Failed to create store '{}': {e}", self.path.display())))?;
        let mut writer = csv::Writer::from_writer(file);

        let header = std::iter::once(DATE_COLUMN.to_string()).chain(frame.columns.iter().cloned());
        writer
            .write_record(header)
            .map_err(|e| AppError::storage(format!("Failed to write store header: {e}")))?;

        for row in &frame.rows {
            let record = std::iter::once(format_stored(row.date))
                .chain(row.values.iter().map(|v| v.map(format_value).unwrap_or_default()));
            writer
                .write_record(record)
                .map_err(|e| AppError::storage(format!("Failed to write row for {}: {e}", row.date)))?;
        }
        writer
            .flush()
            .map_err(|e| AppError::storage(format!("Failed to flush '{}': {e}", self.path.display())))?;

        log::info!("created '{}' with {} row(s)", self.path.display(), frame.len());
        Ok(frame.len())
    }

    /// Open the store and resolve its header. `None` means a zero-byte file.
    fn open(&self) -> Result<Option<(csv::Reader<File>, StoreHeader)>, AppError> {
        let file = File::open(&self.path)
            .map_err(|e| AppError::storage(format!("Failed to open store '{}': {e}", self.path.display())))?;

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let headers = reader
            .headers()
            .map_err(|e| AppError::storage(format!("Failed to read header of '{}': {e}", self.path.display())))?
            .clone();

        if headers.iter().all(|h| h.trim().is_empty()) {
            return Ok(None);
        }

        let header = StoreHeader::from_record(&headers, &self.path)?;
        Ok(Some((reader, header)))
    }

    fn record(&self, result: Result<StringRecord, csv::Error>, idx: usize) -> Result<StringRecord, AppError> {
        // +2: records start after the header and lines are 1-based.
        result.map_err(|e| {
            AppError::storage(format!("CSV parse error in '{}' line {}: {e}", self.path.display(), idx + 2))
        })
    }

    fn ensure_trailing_newline(&self) -> Result<(), AppError> {
        let io_err = |e: std::io::Error| AppError::storage(format!("Failed to inspect '{}': {e}", self.path.display()));

        let mut file = OpenOptions::new().read(true).write(true).open(&self.path).map_err(io_err)?;
        let len = file.metadata().map_err(io_err)?.len();
        if len == 0 {
            return Ok(());
        }
        file.seek(SeekFrom::End(-1)).map_err(io_err)?;
        let mut last = [0u8; 1];
        file.read_exact(&mut last).map_err(io_err)?;
        if last[0] != b'\n' {
            file.seek(SeekFrom::End(0)).map_err(io_err)?;
            file.write_all(b"\n").map_err(io_err)?;
        }
        Ok(())
    }

    fn empty_error(&self) -> AppError {
        AppError::empty_dataset(format!("Store '{}' has no rows.", self.path.display()))
    }
}

fn parse_row_date(record: &StringRecord, header: &StoreHeader, idx: usize) -> Result<CanonicalDate, AppError> {
    let raw = record.get(header.date_idx).unwrap_or("");
    parse_date(raw).map_err(|e| AppError::date_format(format!("line {}: {e}", idx + 2)))
}

/// Lenient numeric cell parse: blanks and markers such as `N/A` become missing.
pub(crate) fn parse_opt_f64(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    let v = s.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

fn format_value(v: f64) -> String {
    format!("{v}")
}
