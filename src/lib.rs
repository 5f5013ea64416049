//! `treasury-yields` library crate.
//!
//! The binary (`yields`) is a thin wrapper around this library so that:
//!
//! - the loader and its cache are testable without spawning processes
//! - `TimeData::frame` and `report::compute_spreads` can be driven directly by
//!   other front-ends (dashboards, notebooks, etc.)
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod report;
