//! Logging and observability infrastructure for coursegen.
//!
//! Structured logging via `tracing`, initialized once at CLI startup.
//! Engine internals emit spans and events with plan/phase fields; the
//! subscriber here decides formatting.

use std::io::IsTerminal;
use tracing_subscriber::{
    EnvFilter,
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Check if colored output should be used.
///
/// Returns true only if:
/// - stdout is a terminal (TTY)
/// - `NO_COLOR` environment variable is not set
fn use_color() -> bool {
    std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// Initialize the tracing subscriber.
///
/// Sets up tracing with either compact (default) or verbose format. The
/// verbose format includes targets and structured fields (`plan`, `phase`).
/// `RUST_LOG` overrides the built-in filter.
///
/// # Errors
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("coursegen=debug,info")
            } else {
                EnvFilter::try_new("coursegen=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if verbose {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_ansi(use_color())
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_ansi(use_color())
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    }

    Ok(())
}
