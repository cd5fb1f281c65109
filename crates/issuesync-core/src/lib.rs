pub mod config;
pub mod decision;
pub mod error;
pub mod index;
pub mod roster;
pub mod tag;
pub mod types;

pub use error::{Result, SyncError};
