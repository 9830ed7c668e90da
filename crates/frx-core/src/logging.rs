#![forbid(unsafe_code)]

//! Logging configuration.
//!
//! The crate emits `tracing` events (`trace` for subscription lifecycle,
//! `debug` for concat transitions, `warn` for teardown failures that cannot
//! be returned). Installing a subscriber is left to the application; with
//! the `log-init` feature, [`LogConfig::try_init`] installs a `fmt`
//! subscriber configured from the environment.
//!
//! | Variable         | Meaning                                  | Default  |
//! |------------------|------------------------------------------|----------|
//! | `FRX_LOG`        | `EnvFilter` directive, e.g. `frx_core=debug` | `warn` |
//! | `FRX_LOG_FORMAT` | `pretty`, `compact`, or `json`           | `pretty` |

use std::fmt;

/// Environment variable holding the filter directive.
pub const FILTER_ENV: &str = "FRX_LOG";
/// Environment variable selecting the output format.
pub const FORMAT_ENV: &str = "FRX_LOG_FORMAT";

const DEFAULT_FILTER: &str = "warn";

/// Output format for the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Multi-line, human oriented.
    #[default]
    Pretty,
    /// One line per event.
    Compact,
    /// Newline-delimited JSON.
    Json,
}

impl LogFormat {
    /// Parse a format name, case-insensitively. Unknown names yield `None`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" => Some(Self::Pretty),
            "compact" => Some(Self::Compact),
            "json" | "ndjson" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` directive.
    pub filter: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            format: LogFormat::default(),
        }
    }
}

impl LogConfig {
    /// Read `FRX_LOG` / `FRX_LOG_FORMAT` from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Build from a custom environment lookup. Blank values and unknown
    /// formats fall back to the defaults.
    #[must_use]
    pub fn from_env_with<F>(get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(filter) = get_env(FILTER_ENV) {
            let filter = filter.trim();
            if !filter.is_empty() {
                config.filter = filter.to_string();
            }
        }
        if let Some(format) = get_env(FORMAT_ENV).as_deref().and_then(LogFormat::parse) {
            config.format = format;
        }
        config
    }

    /// Set the filter directive.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Set the output format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Install a global `fmt` subscriber for this configuration.
    #[cfg(feature = "log-init")]
    pub fn try_init(&self) -> Result<(), LogInitError> {
        use tracing_subscriber::EnvFilter;

        let filter = EnvFilter::try_new(&self.filter)
            .map_err(|err| LogInitError::InvalidFilter(err.to_string()))?;
        let builder = tracing_subscriber::fmt().with_env_filter(filter);
        let installed = match self.format {
            LogFormat::Pretty => builder.pretty().try_init(),
            LogFormat::Compact => builder.compact().try_init(),
            LogFormat::Json => builder.json().try_init(),
        };
        installed.map_err(|err| LogInitError::AlreadyInitialized(err.to_string()))
    }
}

/// Errors from installing the global subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogInitError {
    /// The filter directive did not parse.
    InvalidFilter(String),
    /// A global subscriber was already set.
    AlreadyInitialized(String),
}

impl fmt::Display for LogInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFilter(msg) => write!(f, "invalid log filter: {msg}"),
            Self::AlreadyInitialized(msg) => write!(f, "logging already initialized: {msg}"),
        }
    }
}

impl std::error::Error for LogInitError {}
