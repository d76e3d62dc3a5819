//! # Lineup Common Library
//!
//! Shared code for the lineup services including:
//! - Database initialization and schema
//! - Configuration loading
//! - Common error types
//! - Group display-code helpers

pub mod config;
pub mod db;
pub mod error;
pub mod group_code;

pub use error::{Error, Result};
