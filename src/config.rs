//! Runtime configuration for the page fetcher.
//!
//! Values come from the environment (a `.env` file is loaded at startup)
//! and can be overridden from the command line.

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

const DEFAULT_CACHE_DIR: &str = ".cache/cagematch";
const DEFAULT_MAX_RETRIES: u32 = 4;
const DEFAULT_BACKOFF_SECS: f64 = 1.0;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Statuses worth retrying; the site rate-limits with 403 as well as 429.
pub const RETRY_STATUSES: [u16; 4] = [403, 429, 500, 502];

/// Fetch behaviour: identification, retry policy and page cache location.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub max_retries: u32,
    /// Base of the exponential backoff, in seconds.
    pub backoff_factor: f64,
    pub timeout: Duration,
    pub retry_statuses: Vec<u16>,
    /// Directory for the on-disk page cache; `None` keeps pages in memory only.
    pub cache_dir: Option<PathBuf>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_factor: DEFAULT_BACKOFF_SECS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry_statuses: RETRY_STATUSES.to_vec(),
            cache_dir: Some(PathBuf::from(DEFAULT_CACHE_DIR)),
        }
    }
}

impl FetchConfig {
    /// Read `TABLEMATCH_*` variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            user_agent: std::env::var("TABLEMATCH_USER_AGENT").unwrap_or(defaults.user_agent),
            max_retries: env_parse("TABLEMATCH_MAX_RETRIES", defaults.max_retries),
            backoff_factor: env_parse("TABLEMATCH_BACKOFF_SECS", defaults.backoff_factor),
            timeout: Duration::from_secs(env_parse(
                "TABLEMATCH_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
            )),
            retry_statuses: defaults.retry_statuses,
            cache_dir: std::env::var("TABLEMATCH_CACHE_DIR")
                .map(PathBuf::from)
                .ok()
                .or(defaults.cache_dir),
        }
    }

    /// Apply command line overrides.
    pub fn with_cache(mut self, cache_dir: Option<PathBuf>, no_cache: bool) -> Self {
        if no_cache {
            self.cache_dir = None;
        } else if let Some(dir) = cache_dir {
            self.cache_dir = Some(dir);
        }
        self
    }

    /// Delay before retry number `attempt` (1-based). The first retry is
    /// immediate, later ones double each time.
    pub fn backoff(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let secs = self.backoff_factor * 2f64.powi(attempt as i32 - 1);
        Duration::from_secs_f64(secs.max(0.0))
    }

    pub fn is_retryable(&self, status: u16) -> bool {
        self.retry_statuses.contains(&status)
    }
}

fn default_user_agent() -> String {
    format!("tablematch/{}", env!("CARGO_PKG_VERSION"))
}

fn env_parse<T: std::str::FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{}={} is not valid, using {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
