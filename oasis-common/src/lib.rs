//! # Oasis Common Library
//!
//! Shared code for the Oasis audio crates:
//! - Result codes and their stable descriptions
//! - Configuration file resolution and loading
//! - Log level resolution

pub mod config;
pub mod error;
pub mod logging;
pub mod result_code;

pub use error::{Error, Result};
pub use result_code::ResultCode;
