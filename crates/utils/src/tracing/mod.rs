use keylens_core::KEYLENS_LOG_VAR;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod progress;

// Re-export tracing macros for convenience
pub use progress::{format_duration, ProgressTracker};
pub use tracing::{debug, error, info, instrument, span, trace, warn, Level, Span};

/// Initialize the tracing system
///
/// The filter comes from `KEYLENS_LOG`, then `RUST_LOG`, then `default_level`.
/// Output always goes to stderr so report tables on stdout stay clean.
pub fn init(default_level: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let filter = build_filter(default_level)?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(is_tty())
        .compact()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

fn build_filter(default_level: &str) -> Result<EnvFilter, tracing_subscriber::filter::ParseError> {
    if let Ok(directives) = std::env::var(KEYLENS_LOG_VAR) {
        return EnvFilter::try_new(directives);
    }
    EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))
}

/// Map a `-v` count onto a default level
pub fn level_for_verbosity(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Check if we're running in a TTY environment
fn is_tty() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stderr())
}

/// Span covering one ingest run
pub fn ingest_span(source: &str, workers: usize) -> Span {
    span!(Level::INFO, "ingest", source = %source, workers = %workers)
}

/// Span covering one report run
pub fn report_span(name: &str, variant: &str) -> Span {
    span!(Level::INFO, "report", name = %name, variant = %variant)
}

/// Emit a structured event for a record that was skipped
pub fn record_skipped(reason: &str, detail: &str) {
    warn!(reason = %reason, detail = %detail, "record_skipped");
}
