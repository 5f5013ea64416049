//! Export a frame to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts.
//! Unlike the store, an export is always written from scratch.

use std::path::Path;

use crate::data::dates::format_stored;
use crate::domain::{YieldFrame, DATE_COLUMN};
use crate::error::AppError;

/// Write a frame to a CSV file (`date` first, blanks for missing values).
pub fn write_frame_csv(path: &Path, frame: &YieldFrame) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::storage(format!("Failed to create export CSV '{}': {e}", path.display())))?;

    let header = std::iter::once(DATE_COLUMN).chain(frame.columns.iter().map(String::as_str));
    writer
        .write_record(header)
        .map_err(|e| AppError::storage(format!("Failed to write export CSV header: {e}")))?;

    for row in &frame.rows {
        let fields = std::iter::once(format_stored(row.date)).chain(
            row.values
                .iter()
                .map(|v| v.map(|x| format!("{x:.4}")).unwrap_or_default()),
        );
        writer
            .write_record(fields)
            .map_err(|e| AppError::storage(format!("Failed to write export CSV row for {}: {e}", row.date)))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::storage(format!("Failed to flush export CSV '{}': {e}", path.display())))?;

    log::info!("exported {} row(s) to '{}'", frame.len(), path.display());
    Ok(())
}
