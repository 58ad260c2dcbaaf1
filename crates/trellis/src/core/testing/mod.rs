//! Helpers for exercising the engine in tests: tree fixtures, a recording
//! transaction journal and log capture.

pub mod fixtures;
pub mod transactions;

use tracing_subscriber::fmt;

/// Install a compact fmt subscriber that writes through the test harness.
/// Safe to call from every test; only the first call installs.
pub fn init_tracing() {
    let format = fmt::format()
        .with_level(true)
        .with_line_number(true)
        .with_ansi(false)
        .without_time()
        .compact();
    let installed = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .event_format(format)
        .try_init();
    if installed.is_err() {
        tracing::trace!("subscriber already installed");
    }
}
