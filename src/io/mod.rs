//! Input/output helpers.
//!
//! - the append-only dataset store (`store`)
//! - frame exports to CSV (`export`)
//! - frame JSON read/write (`frame_file`)

pub mod export;
pub mod frame_file;
pub mod store;

pub use export::*;
pub use frame_file::*;
pub use store::LocalStore;
