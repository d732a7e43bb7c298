use std::env;
use std::str::FromStr;

use crate::error::ConfigError;

#[derive(Clone, Debug)]
pub struct ReviewConfig {
    /// Base URL of the analysis service
    pub base_url: String,

    /// Engine depth for single-position evaluations
    pub eval_depth: u32,

    /// Engine depth for move explanations
    pub explain_depth: u32,

    /// Engine depth for the whole-game summary
    pub summary_depth: u32,

    /// Engine depth for alternate lines and their explanation
    pub alternate_depth: u32,

    /// Longest alternate continuation to request
    pub alternate_max_plies: u32,

    /// Per-request HTTP timeout
    pub request_timeout_secs: u64,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            eval_depth: 14,
            explain_depth: 14,
            summary_depth: 12,
            alternate_depth: 14,
            alternate_max_plies: 12,
            request_timeout_secs: 120,
        }
    }
}

impl ReviewConfig {
    /// Load configuration from environment variables, falling back to the
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            base_url: env::var("ANALYSIS_BASE_URL").unwrap_or(defaults.base_url),
            eval_depth: number("EVAL_DEPTH", defaults.eval_depth)?,
            explain_depth: number("EXPLAIN_DEPTH", defaults.explain_depth)?,
            summary_depth: number("SUMMARY_DEPTH", defaults.summary_depth)?,
            alternate_depth: number("ALTERNATE_DEPTH", defaults.alternate_depth)?,
            alternate_max_plies: number("ALTERNATE_MAX_PLIES", defaults.alternate_max_plies)?,
            request_timeout_secs: number("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs)?,
        })
    }
}

fn number<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => parse_number(name, &value),
        Err(_) => Ok(default),
    }
}

fn parse_number<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber {
            name,
            value: value.to_string(),
        })
}
