//! Domain types used throughout the loader.
//!
//! This module defines:
//!
//! - the frame model (`YieldFrame`, `YieldRow`)
//! - spread pairs (`SpreadPair`)
//! - the JSON export schema (`FrameFile`)

pub mod types;

pub use types::*;
