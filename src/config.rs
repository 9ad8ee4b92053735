//! Process configuration, loaded once at startup from the environment.
//!
//! Mirrors `submitter/config.py`'s `Config` class: a required `WORKSPACE`
//! env var selects the profile, everything else has a sane default, and
//! `WORKSPACE=test` short-circuits to a literal struct instead of re-deriving
//! test values from env vars.

use std::env;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("env variable 'WORKSPACE' is required, please set it and try again")]
    MissingWorkspace,
    #[error("env variable 'DSPACE_TIMEOUT' must be a number: {0}")]
    InvalidTimeout(String),
}

/// Immutable, process-wide configuration. Constructed once at startup and
/// passed by reference; never mutated or re-read afterward.
#[derive(Debug, Clone)]
pub struct Config {
    pub workspace: String,
    pub dspace_api_url: String,
    pub dspace_user: String,
    pub dspace_password: String,
    pub dspace_timeout: f64,
    pub input_queue: String,
    pub output_queues: Vec<String>,
    pub log_level: String,
    pub log_filter: bool,
    pub skip_processing: bool,
    pub sqs_endpoint_url: Option<String>,
}

impl Config {
    /// Load configuration from the environment. `WORKSPACE=test` returns the
    /// literal test profile below rather than reading the other variables.
    pub fn load() -> Result<Self, ConfigError> {
        let workspace = env::var("WORKSPACE").map_err(|_| ConfigError::MissingWorkspace)?;

        if workspace == "test" {
            return Ok(Self::test_profile());
        }

        let dspace_timeout = match env::var("DSPACE_TIMEOUT") {
            Ok(raw) => raw
                .parse::<f64>()
                .map_err(|_| ConfigError::InvalidTimeout(raw))?,
            Err(_) => 120.0,
        };

        Ok(Config {
            workspace,
            dspace_api_url: env::var("DSPACE_API_URL").unwrap_or_default(),
            dspace_user: env::var("DSPACE_USER").unwrap_or_default(),
            dspace_password: env::var("DSPACE_PASSWORD").unwrap_or_default(),
            dspace_timeout,
            input_queue: env::var("INPUT_QUEUE").unwrap_or_default(),
            output_queues: env::var("OUTPUT_QUEUES")
                .unwrap_or_else(|_| "output".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string()),
            log_filter: env::var("LOG_FILTER")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(true),
            skip_processing: env::var("SKIP_PROCESSING")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            sqs_endpoint_url: env::var("SQS_ENDPOINT_URL").ok(),
        })
    }

    /// The `test` workspace profile, as a literal struct rather than a
    /// branch inside the constructor.
    pub fn test_profile() -> Self {
        Config {
            workspace: "test".to_string(),
            dspace_api_url: "mock://dspace.edu/rest/".to_string(),
            dspace_user: "test".to_string(),
            dspace_password: "test".to_string(),
            dspace_timeout: 3.0,
            input_queue: "test_queue_with_messages".to_string(),
            output_queues: vec!["empty_result_queue".to_string()],
            log_level: "INFO".to_string(),
            log_filter: true,
            skip_processing: false,
            sqs_endpoint_url: Some("https://sqs.us-east-1.amazonaws.com/".to_string()),
        }
    }

    /// Whether `queue` is on the configured result-queue allow-list.
    pub fn allows_output_queue(&self, queue: &str) -> bool {
        self.output_queues.iter().any(|q| q == queue)
    }
}
