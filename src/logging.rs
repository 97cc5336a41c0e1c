/*!
 * Logging and tracing initialization
 */

use std::fs::File;
use std::path::Path;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::PodConfig;
use crate::error::{PodstoreError, Result};

/// Crates whose events the default filter lets through
const LOG_TARGETS: [&str; 3] = ["podstore", "podstore_connect", "podstore_interface"];

/// Filter directive enabling `level` for every podstore crate
pub fn default_directive(level: Level) -> String {
    LOG_TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize structured logging based on configuration
pub fn init_logging(config: &PodConfig) -> Result<()> {
    let log_level = if config.verbose {
        Level::DEBUG
    } else {
        config.log_level.to_tracing_level()
    };

    let env_filter = build_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok(), log_level)?;

    if let Some(ref log_path) = config.log_file {
        init_file_logging(log_path, env_filter)?;
    } else {
        init_stdout_logging(env_filter);
    }

    Ok(())
}

/// Filter from an explicit directive (normally `RUST_LOG`), else the
/// configured level for the podstore crates
fn build_filter(directive: Option<String>, level: Level) -> Result<EnvFilter> {
    let directive = directive
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| default_directive(level));
    EnvFilter::try_new(&directive).map_err(|e| {
        PodstoreError::Config(format!("Failed to create log filter '{}': {}", directive, e))
    })
}

fn init_stdout_logging(env_filter: EnvFilter) {
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn init_file_logging(log_path: &Path, env_filter: EnvFilter) -> Result<()> {
    let file = File::create(log_path)
        .map_err(|e| PodstoreError::Config(format!("Failed to create log file: {}", e)))?;

    let fmt_layer = fmt::layer()
        .with_writer(file)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(false)
        .json();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}

/// Initialize logging with custom format for testing
pub fn init_test_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive(Level::DEBUG)));

        let fmt_layer = fmt::layer().with_test_writer().with_target(false).compact();

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .ok(); // Ignore error if already initialized
    });
}
