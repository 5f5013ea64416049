//! U.S. Treasury daily yield-curve page integration.
//!
//! The publisher exposes the data as an HTML page, not an API. The table we
//! want is located by position (`DatasetDescriptor::table_index`, the second
//! table by default), which ties this module to the page layout. Everything
//! layout-specific stays behind `RemoteSource` so the orchestrator can be
//! driven by a stub in tests.

use std::time::Duration;

use reqwest::blocking::Client;
use scraper::{ElementRef, Html, Selector};

use crate::config::DatasetDescriptor;
use crate::data::dates::parse_date;
use crate::domain::{normalize_label, YieldFrame, YieldRow, DATE_COLUMN};
use crate::error::AppError;
use crate::io::store::parse_opt_f64;

const USER_AGENT: &str = concat!("treasury-yields/", env!("CARGO_PKG_VERSION"));

/// Anything that can produce the latest published table for a dataset.
pub trait RemoteSource {
    fn fetch_latest_table(&self, dataset: &DatasetDescriptor, year: i32) -> Result<YieldFrame, AppError>;
}

impl<T: RemoteSource + ?Sized> RemoteSource for &T {
    fn fetch_latest_table(&self, dataset: &DatasetDescriptor, year: i32) -> Result<YieldFrame, AppError> {
        (**self).fetch_latest_table(dataset, year)
    }
}

/// Blocking HTTP client for the Treasury's published yield tables.
pub struct TreasuryClient {
    client: Client,
}

impl TreasuryClient {
    pub fn new(timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::remote(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    fn fetch_page(&self, url: &str) -> Result<String, AppError> {
        log::info!("fetching {url}");
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| AppError::remote(format!("Treasury request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::remote(format!(
                "Treasury request failed with status {}.",
                resp.status()
            )));
        }

        resp.text()
            .map_err(|e| AppError::remote(format!("Failed to read Treasury response: {e}")))
    }
}

impl RemoteSource for TreasuryClient {
    fn fetch_latest_table(&self, dataset: &DatasetDescriptor, year: i32) -> Result<YieldFrame, AppError> {
        let url = dataset.link_for(year);
        let html = self.fetch_page(&url)?;
        let frame = parse_yield_table(&html, dataset.table_index)?;
        log::debug!("parsed {} row(s) x {} column(s) from {url}", frame.len(), frame.columns.len());
        Ok(frame)
    }
}

/// Extract the `table_index`-th table of a page as a frame.
///
/// Header labels are normalized (`"10 Yr"` -> `"10_yr"`), the `date` column is
/// parsed with `parse_date`, blank or `N/A` cells become missing values.
/// Rows come back sorted by date; a date repeated on the page keeps its last row.
pub fn parse_yield_table(html: &str, table_index: usize) -> Result<YieldFrame, AppError> {
    let table_sel = selector("table")?;
    let row_sel = selector("tr")?;
    let cell_sel = selector("th, td")?;
    let th_sel = selector("th")?;
    let td_sel = selector("td")?;

    let document = Html::parse_document(html);
    let tables: Vec<ElementRef> = document.select(&table_sel).collect();
    let table = tables.get(table_index).ok_or_else(|| {
        AppError::remote(format!(
            "Expected at least {} table(s) on the page, found {}.",
            table_index + 1,
            tables.len()
        ))
    })?;

    let rows: Vec<ElementRef> = table.select(&row_sel).collect();
    let header_pos = rows
        .iter()
        .position(|r| r.select(&th_sel).next().is_some())
        .unwrap_or(0);
    let header_row = rows
        .get(header_pos)
        .ok_or_else(|| AppError::remote("Yield table has no rows."))?;

    let labels: Vec<String> = header_row
        .select(&cell_sel)
        .map(|c| normalize_label(&cell_text(c)))
        .collect();
    let date_idx = labels
        .iter()
        .position(|l| l == DATE_COLUMN)
        .ok_or_else(|| AppError::remote(format!("Yield table has no `{DATE_COLUMN}` column (headers: {labels:?}).")))?;

    let value_cols: Vec<(usize, String)> = labels
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != date_idx)
        .map(|(idx, l)| (idx, l.clone()))
        .collect();

    let mut frame = YieldFrame::new(value_cols.iter().map(|(_, l)| l.clone()).collect());
    for row in rows.iter().skip(header_pos + 1) {
        if row.select(&td_sel).next().is_none() {
            continue;
        }
        let cells: Vec<String> = row.select(&cell_sel).map(cell_text).collect();
        let date = parse_date(cells.get(date_idx).map(String::as_str).unwrap_or(""))?;
        let values = value_cols
            .iter()
            .map(|(idx, _)| parse_opt_f64(cells.get(*idx).map(String::as_str)))
            .collect();
        frame.rows.push(YieldRow { date, values });
    }

    frame.rows.sort_by_key(|r| r.date);
    frame.rows.dedup_by(|later, earlier| {
        if later.date == earlier.date {
            std::mem::swap(later, earlier);
            true
        } else {
            false
        }
    });

    Ok(frame)
}

fn selector(css: &str) -> Result<Selector, AppError> {
    Selector::parse(css).map_err(|e| AppError::remote(format!("Invalid selector '{css}': {e:?}")))
}

fn cell_text(cell: ElementRef) -> String {
    cell.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use chrono::NaiveDate;

    const PAGE: &str = r#"
<html><body>
  <table><tr><td>Navigation</td></tr></table>
  <table class="t-chart">
    <tr>
      <th>Date</th><th>1 Mo</th><th>2 Mo</th><th>2 Yr</th><th>10 Yr</th>
    </tr>
    <tr><td>06/13/19</td><td>2.22</td><td>N/A</td><td>1.86</td><td>2.10</td></tr>
    <tr><td>06/12/19</td><td>2.23</td><td>2.22</td><td>1.88</td><td>2.12</td></tr>
    <tr><td>06/14/19</td><td>2.20</td><td>2.21</td><td>1.84</td></tr>
  </table>
</body></html>
"#;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2019, 6, day).unwrap()
    }

    #[test]
    fn second_table_is_parsed_with_normalized_headers() {
        let frame = parse_yield_table(PAGE, 1).unwrap();
        assert_eq!(frame.columns, vec!["1_mo", "2_mo", "2_yr", "10_yr"]);
        assert_eq!(frame.dates(), vec![d(12), d(13), d(14)]);
        assert_eq!(frame.value(1, "2_mo"), None);
        assert_eq!(frame.value(1, "10_yr"), Some(2.10));
        // Short rows are padded with missing values.
        assert_eq!(frame.value(2, "10_yr"), None);
        assert_eq!(frame.value(2, "2_yr"), Some(1.84));
    }

    #[test]
    fn missing_table_is_a_remote_error() {
        let err = parse_yield_table(PAGE, 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RemoteFetch);
    }

    #[test]
    fn table_without_date_column_is_a_remote_error() {
        let err = parse_yield_table(PAGE, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RemoteFetch);
    }

    #[test]
    fn unparsable_date_cell_fails_the_fetch() {
        let page = "<table></table><table><tr><th>Date</th><th>10 Yr</th></tr>\
                    <tr><td>14/45/2019</td><td>2.0</td></tr></table>";
        let err = parse_yield_table(page, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DateFormat);
    }

    #[test]
    fn duplicate_dates_keep_the_last_row() {
        let page = "<table></table><table><tr><th>Date</th><th>10 Yr</th></tr>\
                    <tr><td>06/14/19</td><td>2.0</td></tr>\
                    <tr><td>06/14/19</td><td>2.1</td></tr></table>";
        let frame = parse_yield_table(page, 1).unwrap();
        assert_eq!(frame.len(), 1);
        assert_eq!(frame.value(0, "10_yr"), Some(2.1));
    }
}
