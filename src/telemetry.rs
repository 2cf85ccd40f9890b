//! Logging setup of the `dkmeans` binary.
//!
//! The library only emits `tracing` events; installing a subscriber is up to the
//! application. `RUST_LOG` takes precedence over the level chosen here.

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

/// Installs a global fmt subscriber that logs at `info` (or `debug` with **debug**) to stderr,
/// including thread ids and source locations. Calling it twice is a no-op.
pub fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with_span_events(FmtSpan::NONE)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .try_init();
}
