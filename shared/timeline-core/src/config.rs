//! Configuration for timeline readers

use crate::error::{Result, TimelineError};
use serde::Deserialize;
use std::env;

pub const DEFAULT_FLOW_RUN_TABLE: &str = "timelineservice.flowrun";

/// Row cap applied to range reads when the caller supplies none.
pub const DEFAULT_LIMIT: u64 = 100;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ReaderConfig {
    pub flow_run_table: String,
    pub default_limit: u64,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            flow_run_table: DEFAULT_FLOW_RUN_TABLE.to_string(),
            default_limit: DEFAULT_LIMIT,
        }
    }
}

impl ReaderConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let default_limit = match lookup("TIMELINE_DEFAULT_LIMIT") {
            Some(raw) => raw
                .parse()
                .map_err(|e| TimelineError::Config(format!("Invalid TIMELINE_DEFAULT_LIMIT: {}", e)))?,
            None => DEFAULT_LIMIT,
        };
        if default_limit == 0 {
            return Err(TimelineError::Config(
                "TIMELINE_DEFAULT_LIMIT must be positive".to_string(),
            ));
        }

        Ok(Self {
            flow_run_table: lookup("TIMELINE_FLOWRUN_TABLE")
                .unwrap_or_else(|| DEFAULT_FLOW_RUN_TABLE.to_string()),
            default_limit,
        })
    }

    /// Caller limit, or the default when absent or zero.
    pub fn effective_limit(&self, requested: Option<u64>) -> u64 {
        match requested {
            Some(limit) if limit > 0 => limit,
            _ => self.default_limit,
        }
    }
}
