//! Timeline Core - Shared reader types
//!
//! This crate provides:
//! - Query identity, entity filters and field selection for timeline readers
//! - The flow run entity returned to callers
//! - Error taxonomy separating bad requests from store failures
//! - Reader configuration

pub mod config;
pub mod domain;
pub mod error;

pub use config::ReaderConfig;
pub use domain::*;
pub use error::{Result, TimelineError};
