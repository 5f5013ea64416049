//! Incremental-refresh loader.
//!
//! The local store is an append-only cache of a remote series that only grows.
//! Staleness is judged against the *requested* date, never the wall clock:
//!
//! 1. read the cache's most recent date
//! 2. if the requested date is after it, fetch the remote table and append the
//!    rows newer than the cache maximum. Without a configured year every yearly
//!    page from the cache maximum's year through the requested year is fetched,
//!    so a refresh across New Year does not skip the end of the old year.
//! 3. return the last `lookback` cached rows dated on or before the request
//!
//! A request for a date the cache already covers never touches the network.

use std::ops::RangeInclusive;
use std::path::Path;

use chrono::Datelike;

use crate::config::{DataConfig, DatasetDescriptor};
use crate::data::dates::{parse_date, DateInput};
use crate::data::treasury::RemoteSource;
use crate::domain::{CanonicalDate, YieldFrame};
use crate::error::AppError;
use crate::io::store::LocalStore;

pub const DEFAULT_LOOKBACK: usize = 100;

/// A windowed, refreshed view of one dataset ending at a requested date.
pub struct TimeData<S> {
    date: CanonicalDate,
    lookback: usize,
    dataset: String,
    descriptor: DatasetDescriptor,
    year: i32,
    link: String,
    store: LocalStore,
    source: S,
}

impl<S: RemoteSource> TimeData<S> {
    /// Like `new`, with `DEFAULT_LOOKBACK` rows.
    pub fn with_default_lookback(
        date: impl Into<DateInput>,
        dataset: &str,
        config: &DataConfig,
        source: S,
    ) -> Result<Self, AppError> {
        Self::new(date, dataset, DEFAULT_LOOKBACK, config, source)
    }

    /// Resolve the dataset's local path and remote URL up front.
    ///
    /// The remote year is the descriptor's `year` when configured, otherwise
    /// the requested date's year.
    pub fn new(
        date: impl Into<DateInput>,
        dataset: &str,
        lookback: usize,
        config: &DataConfig,
        source: S,
    ) -> Result<Self, AppError> {
        let date = parse_date(date)?;
        let descriptor = config.descriptor(dataset)?.clone();
        let year = descriptor.year.unwrap_or_else(|| date.year());
        let link = descriptor.link_for(year);
        let store = LocalStore::new(config.local_path(dataset)?);

        Ok(Self {
            date,
            lookback,
            dataset: dataset.to_string(),
            descriptor,
            year,
            link,
            store,
            source,
        })
    }

    pub fn date(&self) -> CanonicalDate {
        self.date
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn link(&self) -> &str {
        &self.link
    }

    pub fn path(&self) -> &Path {
        self.store.path()
    }

    /// Most recent date in the local cache.
    pub fn last_date(&self) -> Result<CanonicalDate, AppError> {
        self.store.most_recent_date()
    }

    /// Remote rows strictly newer than the cache's most recent date.
    pub fn pull_new_data(&self) -> Result<YieldFrame, AppError> {
        let last = self.last_date()?;
        self.pull_after(last)
    }

    /// Bring the cache up to date if the requested date is past its end.
    /// Returns the number of rows appended.
    pub fn refresh_local(&self) -> Result<usize, AppError> {
        let last = self.last_date()?;
        if self.date <= last {
            log::debug!(
                "{}: cache covers {} (latest {last}), skipping remote fetch",
                self.dataset,
                self.date
            );
            return Ok(0);
        }

        log::info!(
            "{}: requested {} is after cached {last}, refreshing from {}",
            self.dataset,
            self.date,
            self.link
        );
        let fresh = self.pull_after(last)?;
        if fresh.is_empty() {
            log::info!("{}: no rows newer than {last} published yet", self.dataset);
        }
        self.store.append(&fresh)
    }

    /// Refresh if stale, then return the last `lookback` rows up to the requested date.
    pub fn frame(&self) -> Result<YieldFrame, AppError> {
        self.refresh_local()?;
        self.store.read_through(self.date, self.lookback)
    }

    /// Yearly pages that can hold rows newer than `last`.
    fn years_after(&self, last: CanonicalDate) -> RangeInclusive<i32> {
        match self.descriptor.year {
            Some(year) => year..=year,
            None => last.year().min(self.year)..=self.year,
        }
    }

    fn pull_after(&self, last: CanonicalDate) -> Result<YieldFrame, AppError> {
        let pages = self
            .years_after(last)
            .map(|year| -> Result<YieldFrame, AppError> {
                let page = self.source.fetch_latest_table(&self.descriptor, year)?;
                Ok(page.filter(|r| r.date > last))
            })
            .collect::<Result<Vec<_>, AppError>>()?;
        Ok(YieldFrame::concat(pages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::YieldRow;
    use crate::error::ErrorKind;
    use chrono::NaiveDate;
    use std::cell::{Cell, RefCell};
    use std::fs;

    const SEED: &str = "date,2_yr,10_yr\n\
                        06/10/19,1.89,2.15\n\
                        06/11/19,1.91,2.14\n\
                        06/12/19,1.88,2.12\n";

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2019, 6, day).unwrap()
    }

    fn setup(year: Option<i32>) -> (tempfile::TempDir, DataConfig) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("treasuryyields.csv"), SEED).unwrap();
        let descriptor = DatasetDescriptor {
            localpath: vec!["treasuryyields.csv".to_string()],
            link: "https://example.test/yields?year={}".to_string(),
            year,
            table_index: 1,
        };
        let cfg = DataConfig::from_descriptors(dir.path(), [("treasuryyields".to_string(), descriptor)]).unwrap();
        (dir, cfg)
    }

    /// Fails the test if the orchestrator goes to the network.
    struct NoNetwork;

    impl RemoteSource for NoNetwork {
        fn fetch_latest_table(&self, _: &DatasetDescriptor, _: i32) -> Result<YieldFrame, AppError> {
            panic!("remote fetch must not happen when the cache covers the request");
        }
    }

    struct Recorded {
        table: YieldFrame,
        calls: Cell<usize>,
        years: RefCell<Vec<i32>>,
    }

    impl Recorded {
        fn new(table: YieldFrame) -> Self {
            Self {
                table,
                calls: Cell::new(0),
                years: RefCell::new(Vec::new()),
            }
        }
    }

    impl RemoteSource for Recorded {
        fn fetch_latest_table(&self, _: &DatasetDescriptor, year: i32) -> Result<YieldFrame, AppError> {
            self.calls.set(self.calls.get() + 1);
            self.years.borrow_mut().push(year);
            Ok(self.table.clone())
        }
    }

    struct Offline;

    impl RemoteSource for Offline {
        fn fetch_latest_table(&self, _: &DatasetDescriptor, _: i32) -> Result<YieldFrame, AppError> {
            Err(AppError::remote("connection refused"))
        }
    }

    fn remote_table() -> YieldFrame {
        YieldFrame {
            columns: vec!["2_yr".to_string(), "10_yr".to_string()],
            rows: (10..=17)
                .map(|day| YieldRow {
                    date: d(day),
                    values: vec![Some(1.8), Some(2.0 + day as f64 / 100.0)],
                })
                .collect(),
        }
    }

    #[test]
    fn covered_request_is_a_pure_local_read() {
        let (_dir, cfg) = setup(None);
        for date in [d(12), d(11), d(1)] {
            let td = TimeData::new(date, "treasuryyields", 2, &cfg, NoNetwork).unwrap();
            let frame = td.frame().unwrap();
            assert!(frame.len() <= 2);
            assert!(frame.dates().iter().all(|x| *x <= date));
        }
        let td = TimeData::new("2019-06-12", "treasuryyields", 2, &cfg, NoNetwork).unwrap();
        assert_eq!(td.frame().unwrap().dates(), vec![d(11), d(12)]);
    }

    #[test]
    fn stale_request_appends_only_newer_rows() {
        let (dir, cfg) = setup(None);
        let path = dir.path().join("treasuryyields.csv");
        let before_max = LocalStore::new(&path).most_recent_date().unwrap();

        let source = Recorded::new(remote_table());
        let td = TimeData::new(20190614_i64, "treasuryyields", 3, &cfg, &source).unwrap();
        let frame = td.frame().unwrap();

        assert_eq!(source.calls.get(), 1);
        assert_eq!(frame.dates(), vec![d(12), d(13), d(14)]);
        assert!((frame.value(2, "10_yr").unwrap() - 2.14).abs() < 1e-12);

        // Existing rows are untouched; everything newer than 06/12 was appended.
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(SEED));
        let store = LocalStore::new(&path);
        let after_max = store.most_recent_date().unwrap();
        assert!(after_max >= before_max);
        assert_eq!(after_max, d(17));
        assert_eq!(store.read_all().unwrap().len(), 3 + 5);

        // A second request for the same date is now served locally.
        let again = TimeData::new(20190614_i64, "treasuryyields", 3, &cfg, NoNetwork).unwrap();
        assert_eq!(again.frame().unwrap(), frame);
    }

    #[test]
    fn remote_year_defaults_to_requested_year() {
        let (_dir, cfg) = setup(None);
        let source = Recorded::new(YieldFrame::new(vec!["10_yr".to_string()]));
        let td = TimeData::new("Jan 03, 2020", "treasuryyields", 5, &cfg, &source).unwrap();
        assert_eq!(td.year(), 2020);
        assert_eq!(td.link(), "https://example.test/yields?year=2020");
        assert_eq!(td.refresh_local().unwrap(), 0);
        // The cache ends in 2019, so the 2019 page is read before the 2020 one.
        assert_eq!(*source.years.borrow(), vec![2019, 2020]);
    }

    /// Serves one page per year, like the publisher.
    struct Yearly {
        pages: Vec<(i32, YieldFrame)>,
        years: RefCell<Vec<i32>>,
    }

    impl RemoteSource for Yearly {
        fn fetch_latest_table(&self, _: &DatasetDescriptor, year: i32) -> Result<YieldFrame, AppError> {
            self.years.borrow_mut().push(year);
            Ok(self
                .pages
                .iter()
                .find(|(y, _)| *y == year)
                .map(|(_, page)| page.clone())
                .unwrap_or_default())
        }
    }

    fn page(columns: &[&str], dates: &[NaiveDate]) -> YieldFrame {
        YieldFrame {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: dates
                .iter()
                .map(|&date| YieldRow {
                    date,
                    values: vec![Some(1.6); columns.len()],
                })
                .collect(),
        }
    }

    #[test]
    fn refresh_across_new_year_keeps_the_old_year_tail() {
        let (dir, cfg) = setup(None);
        let path = dir.path().join("treasuryyields.csv");
        fs::write(&path, "date,2_yr,10_yr\n2019-12-20,1.6,1.9\n").unwrap();

        let dec = |day| NaiveDate::from_ymd_opt(2019, 12, day).unwrap();
        let jan = |day| NaiveDate::from_ymd_opt(2020, 1, day).unwrap();
        let source = Yearly {
            pages: vec![
                (2019, page(&["2_yr", "10_yr"], &[20, 23, 24, 26, 27, 30, 31].map(dec))),
                (2020, page(&["2_mo", "2_yr", "10_yr"], &[2, 3].map(jan))),
            ],
            years: RefCell::new(Vec::new()),
        };

        let td = TimeData::new("2020-01-03", "treasuryyields", 10, &cfg, &source).unwrap();
        assert_eq!(td.refresh_local().unwrap(), 8);
        assert_eq!(*source.years.borrow(), vec![2019, 2020]);

        let stored = LocalStore::new(&path).read_all().unwrap();
        assert_eq!(stored.columns, vec!["2_yr", "10_yr"]);
        assert_eq!(
            stored.dates(),
            vec![dec(20), dec(23), dec(24), dec(26), dec(27), dec(30), dec(31), jan(2), jan(3)]
        );

        let december = TimeData::new(dec(31), "treasuryyields", 10, &cfg, NoNetwork).unwrap();
        assert_eq!(december.frame().unwrap().len(), 7);
    }

    #[test]
    fn default_lookback_bounds_the_window() {
        let (dir, cfg) = setup(None);
        let path = dir.path().join("treasuryyields.csv");
        let mut text = String::from("date,2_yr,10_yr\n");
        let start = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
        for offset in 0..150 {
            let date = start + chrono::Duration::days(offset);
            text.push_str(&format!("{},1.9,2.1\n", date.format("%Y-%m-%d")));
        }
        fs::write(&path, text).unwrap();

        let as_of = start + chrono::Duration::days(149);
        let td = TimeData::with_default_lookback(as_of, "treasuryyields", &cfg, NoNetwork).unwrap();
        assert_eq!(td.lookback(), DEFAULT_LOOKBACK);
        let frame = td.frame().unwrap();
        assert_eq!(frame.len(), 100);
        assert_eq!(frame.dates().last(), Some(&as_of));
    }

    #[test]
    fn configured_year_is_fixed_at_construction() {
        let (_dir, cfg) = setup(Some(2019));
        let source = Recorded::new(remote_table());
        let td = TimeData::new("2020-01-03", "treasuryyields", 5, &cfg, &source).unwrap();
        assert_eq!(td.link(), "https://example.test/yields?year=2019");
        assert_eq!(td.refresh_local().unwrap(), 5);
        assert_eq!(*source.years.borrow(), vec![2019]);
    }

    #[test]
    fn pull_new_data_filters_strictly_newer() {
        let (_dir, cfg) = setup(None);
        let td = TimeData::new(20190620_i64, "treasuryyields", 5, &cfg, Recorded::new(remote_table())).unwrap();
        let fresh = td.pull_new_data().unwrap();
        assert_eq!(fresh.dates().first(), Some(&d(13)));
        assert_eq!(fresh.len(), 5);
    }

    #[test]
    fn remote_failure_propagates_and_leaves_store_alone() {
        let (dir, cfg) = setup(None);
        let td = TimeData::new(20190614_i64, "treasuryyields", 5, &cfg, Offline).unwrap();
        assert_eq!(td.frame().unwrap_err().kind(), ErrorKind::RemoteFetch);
        assert_eq!(fs::read_to_string(dir.path().join("treasuryyields.csv")).unwrap(), SEED);
    }

    #[test]
    fn construction_errors_surface() {
        let (_dir, cfg) = setup(None);
        let unknown = TimeData::new(20190614_i64, "bills", 5, &cfg, NoNetwork).err().unwrap();
        assert_eq!(unknown.kind(), ErrorKind::Configuration);

        let bad_date = TimeData::new("14/45/2019", "treasuryyields", 5, &cfg, NoNetwork).err().unwrap();
        assert_eq!(bad_date.kind(), ErrorKind::DateFormat);
    }

    #[test]
    fn empty_cache_cannot_be_refreshed() {
        let (dir, cfg) = setup(None);
        fs::write(dir.path().join("treasuryyields.csv"), "date,2_yr,10_yr\n").unwrap();
        let td = TimeData::new(20190614_i64, "treasuryyields", 5, &cfg, NoNetwork).unwrap();
        assert_eq!(td.frame().unwrap_err().kind(), ErrorKind::EmptyDataset);
    }
}
