//! Logging setup.
//!
//! Logs always go to stderr; stdout belongs to the chat transcript.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter when nothing else is asked for.
const QUIET_DIRECTIVES: &str = "warn";

/// Filter for `--verbose`.
const VERBOSE_DIRECTIVES: &str =
    "warn,lexchat=debug,lexchat_core=debug,lexchat_store=debug,lexchat_backend=debug,lexchat_workflow=debug";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl LogFormat {
    /// Reads a `LOG_JSON` value; "1" or "true" selects JSON.
    pub fn from_flag(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "1" || v == "true" => Self::Json,
            _ => Self::Compact,
        }
    }
}

/// Resolved logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub directives: String,
    pub format: LogFormat,
}

impl LogSettings {
    /// `RUST_LOG` wins when set; otherwise quiet, or debug for lexchat
    /// crates when `verbose`.
    pub fn resolve(rust_log: Option<String>, log_json: Option<&str>, verbose: bool) -> Self {
        let directives = rust_log
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| {
                if verbose {
                    VERBOSE_DIRECTIVES.to_string()
                } else {
                    QUIET_DIRECTIVES.to_string()
                }
            });

        Self {
            directives,
            format: LogFormat::from_flag(log_json),
        }
    }
}

/// Installs the global subscriber. Returns false if one was already set.
pub fn init_tracing(settings: &LogSettings) -> bool {
    let filter = EnvFilter::try_new(&settings.directives).unwrap_or_else(|e| {
        eprintln!("Ignoring invalid log filter '{}': {}", settings.directives, e);
        EnvFilter::new(QUIET_DIRECTIVES)
    });

    let installed = match settings.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init(),
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .try_init(),
    };

    if installed.is_ok() {
        tracing::debug!(filter = %settings.directives, "Tracing initialized");
    }
    installed.is_ok()
}

/// Initialize tracing from `RUST_LOG` and `LOG_JSON`.
pub fn init_tracing_from_env(verbose: bool) {
    let log_json = std::env::var("LOG_JSON").ok();
    let settings = LogSettings::resolve(std::env::var("RUST_LOG").ok(), log_json.as_deref(), verbose);
    init_tracing(&settings);
}
