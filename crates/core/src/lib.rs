//! Core value types for the commit-log consumer client.

pub mod config;
pub mod error;
pub mod fetch;
pub mod offset;

pub use config::*;
pub use error::{Error, Result};
pub use fetch::*;
pub use offset::*;
