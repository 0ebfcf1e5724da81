//! # RFMT Common Library
//!
//! Shared code for the RFMT service:
//! - Error types
//! - Configuration loading and root folder resolution
//! - Database initialization and schema

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
