//! Shared "load window" logic used by every front-end command.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! resolve dataset -> refresh local store if stale -> windowed read -> selection
//!
//! The commands can then focus on presentation (tables, spreads, curves).

use chrono::{Datelike, Local, NaiveDate};

use crate::config::DataConfig;
use crate::data::{DateInput, RemoteSource, TimeData};
use crate::domain::YieldFrame;
use crate::error::AppError;
use crate::io::LocalStore;

/// A loaded, refreshed window of one dataset.
#[derive(Debug, Clone)]
pub struct Window {
    pub dataset: String,
    pub as_of: NaiveDate,
    pub frame: YieldFrame,
}

/// Load the window ending at `date` and optionally restrict it to some maturities.
pub fn load_window<S: RemoteSource>(
    config: &DataConfig,
    source: S,
    date: Option<DateInput>,
    dataset: &str,
    lookback: usize,
    maturities: &[String],
) -> Result<Window, AppError> {
    let date = date.unwrap_or_else(|| DateInput::Date(today()));
    let loader = TimeData::new(date, dataset, lookback, config, source)?;
    let mut frame = loader.frame()?;

    if !maturities.is_empty() {
        frame = frame.select(maturities)?;
    }

    Ok(Window {
        dataset: dataset.to_string(),
        as_of: loader.date(),
        frame,
    })
}

/// Seed a missing local store with the full published table for `year`.
///
/// Returns the number of rows written.
pub fn bootstrap<S: RemoteSource>(
    config: &DataConfig,
    source: S,
    dataset: &str,
    year: Option<i32>,
) -> Result<usize, AppError> {
    let descriptor = config.descriptor(dataset)?;
    let store = LocalStore::new(config.local_path(dataset)?);
    if store.exists() {
        return Err(AppError::storage(format!(
            "Store '{}' already exists; `frame` refreshes it incrementally.",
            store.path().display()
        )));
    }

    let year = year.or(descriptor.year).unwrap_or_else(|| today().year());
    let table = source.fetch_latest_table(descriptor, year)?;
    if table.is_empty() {
        return Err(AppError::empty_dataset(format!(
            "Published table for {dataset} ({year}) has no rows."
        )));
    }
    store.create(&table)
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
