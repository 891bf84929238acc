pub mod fetch;
pub mod run;
pub mod status;

use std::time::Duration;

use clap::Args;
use guchaos_core::http::{DEFAULT_HOST, DEFAULT_PORT};
use guchaos_core::{BATCH_LEN, DEFAULT_KEY, FetchConfig, Key};

/// Pool reached capacity, or a read-only command succeeded.
pub const EXIT_OK: u8 = 0;
/// Any fatal error.
pub const EXIT_FAILURE: u8 = 1;

/// Where and how to fetch integers.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Host serving the integer generator
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// TCP port (plain HTTP)
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Connect/read timeout in seconds (0 = wait forever)
    #[arg(long, default_value_t = 30)]
    pub timeout_sec: u64,

    /// Abort if the response grows beyond this many bytes
    #[arg(long, default_value_t = guchaos_core::http::DEFAULT_MAX_RESPONSE_BYTES)]
    pub max_response_bytes: usize,

    /// Extra attempts when the connection fails (quota errors are never retried)
    #[arg(long, default_value_t = 0)]
    pub connect_retries: u32,

    /// Delay before the first connect retry in milliseconds; doubles each time
    #[arg(long, default_value_t = 1000)]
    pub retry_backoff_ms: u64,
}

impl SourceArgs {
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            host: self.host.clone(),
            port: self.port,
            batch_len: BATCH_LEN,
            timeout: (self.timeout_sec > 0).then(|| Duration::from_secs(self.timeout_sec)),
            max_response_bytes: self.max_response_bytes,
            connect_retries: self.connect_retries,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }
}

/// Substitution key selection.
#[derive(Args, Debug, Clone)]
pub struct KeyArgs {
    /// Digits used by the polynumeric substitution (defaults to the built-in key)
    #[arg(long, env = "GUCHAOS_KEY", hide_env_values = true, default_value = DEFAULT_KEY, hide_default_value = true)]
    pub key: String,

    /// Stop substituting at the first zero sample, as very old releases did
    #[arg(long)]
    pub legacy_zero_terminator: bool,
}

impl KeyArgs {
    pub fn mode(&self) -> guchaos_core::TransformMode {
        if self.legacy_zero_terminator {
            guchaos_core::TransformMode::ZeroTerminated
        } else {
            guchaos_core::TransformMode::FixedLength
        }
    }
}

/// Validate the configured key, reporting a diagnostic on failure.
pub fn parse_key(text: &str) -> Option<Key> {
    match Key::parse(text) {
        Ok(key) => Some(key),
        Err(e) => {
            eprintln!("[-] Invalid key: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_args(timeout_sec: u64) -> SourceArgs {
        SourceArgs {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            timeout_sec,
            max_response_bytes: 2048,
            connect_retries: 2,
            retry_backoff_ms: 250,
        }
    }

    #[test]
    fn test_zero_timeout_disables_it() {
        assert_eq!(source_args(0).fetch_config().timeout, None);
        assert_eq!(
            source_args(7).fetch_config().timeout,
            Some(Duration::from_secs(7))
        );
    }

    #[test]
    fn test_fetch_config_carries_limits() {
        let config = source_args(1).fetch_config();
        assert_eq!(config.batch_len, BATCH_LEN);
        assert_eq!(config.max_response_bytes, 2048);
        assert_eq!(config.connect_retries, 2);
        assert_eq!(config.retry_backoff, Duration::from_millis(250));
    }

    #[test]
    fn test_parse_key() {
        assert!(parse_key("0123").is_some());
        assert!(parse_key("").is_none());
        assert!(parse_key("12-3").is_none());
    }
}
