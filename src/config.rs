//! Runtime settings read from the environment, and tracing setup.
//!
//! - `DQ_LOG`: log filter used when `RUST_LOG` is unset (default `info`)
//! - `DQ_FETCH_TIMEOUT_MS`: timeout for one field-values fetch, `0` disables it (default `0`)

use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub log_filter: String,
    pub fetch_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self { Settings { log_filter: "info".into(), fetch_timeout_ms: 0 } }
}

impl Settings {
    pub fn from_env() -> Self { Self::from_lookup(|k| std::env::var(k).ok()) }

    /// Build from any key lookup; unparsable numbers fall back to defaults.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        let d = Settings::default();
        let log_filter = lookup("DQ_LOG").filter(|s| !s.trim().is_empty()).unwrap_or(d.log_filter);
        let fetch_timeout_ms = lookup("DQ_FETCH_TIMEOUT_MS").and_then(|s| s.trim().parse::<u64>().ok()).unwrap_or(d.fetch_timeout_ms);
        Settings { log_filter, fetch_timeout_ms }
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        if self.fetch_timeout_ms == 0 { None } else { Some(Duration::from_millis(self.fetch_timeout_ms)) }
    }
}

/// Install the global fmt subscriber. `RUST_LOG` wins over `DQ_LOG`. Safe to call twice.
pub fn init_logging(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
