//! Read/write frame JSON files.
//!
//! Frame JSON is the "portable" representation of a loaded window:
//! - dataset name and as-of date
//! - column labels
//! - one entry per row (`date` + values aligned with the columns)
//!
//! The schema is defined by `domain::FrameFile`.

use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;

use crate::domain::{FrameFile, FrameFileRow, YieldFrame, YieldRow};
use crate::error::AppError;

/// Write a frame JSON file.
pub fn write_frame_json(path: &Path, frame: &YieldFrame, dataset: &str, as_of: NaiveDate) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::storage(format!("Failed to create frame JSON '{}': {e}", path.display())))?;

    let doc = FrameFile {
        tool: "yields".to_string(),
        dataset: dataset.to_string(),
        as_of,
        columns: frame.columns.clone(),
        rows: frame
            .rows
            .iter()
            .map(|r| FrameFileRow {
                date: r.date,
                values: r.values.clone(),
            })
            .collect(),
    };

    serde_json::to_writer_pretty(file, &doc)
        .map_err(|e| AppError::storage(format!("Failed to write frame JSON: {e}")))?;

    log::info!("exported {} row(s) to '{}'", frame.len(), path.display());
    Ok(())
}

/// Read a frame JSON file back into a frame.
pub fn read_frame_json(path: &Path) -> Result<(FrameFile, YieldFrame), AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::storage(format!("Failed to open frame JSON '{}': {e}", path.display())))?;
    let doc: FrameFile =
        serde_json::from_reader(file).map_err(|e| AppError::storage(format!("Invalid frame JSON: {e}")))?;

    let width = doc.columns.len();
    if let Some(bad) = doc.rows.iter().find(|r| r.values.len() != width) {
        return Err(AppError::storage(format!(
            "Frame JSON row {} has {} value(s), expected {width}.",
            bad.date,
            bad.values.len()
        )));
    }

    let frame = YieldFrame {
        columns: doc.columns.clone(),
        rows: doc
            .rows
            .iter()
            .map(|r| YieldRow {
                date: r.date,
                values: r.values.clone(),
            })
            .collect(),
    };
    Ok((doc, frame))
}
