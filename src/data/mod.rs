pub mod dates;
pub mod timedata;
pub mod treasury;

pub use dates::{parse_date, DateFormat, DateInput};
pub use timedata::{TimeData, DEFAULT_LOOKBACK};
pub use treasury::{parse_yield_table, RemoteSource, TreasuryClient};
