//! # EcoWatch Common Library
//!
//! Shared code for the EcoWatch services:
//! - Error type used by persistence and configuration
//! - Bootstrap configuration loading (TOML + environment + defaults)
//! - Report, verification and score models exchanged with the AI service

pub mod config;
pub mod error;
pub mod models;

pub use error::{Error, Result};
