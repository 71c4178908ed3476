//! Logging setup for the driver binary
//!
//! With the `profiling` feature, `profiling::scope!` blocks in the engine become
//! tracing spans and show up in the same output.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Install the global subscriber, defaulting `RUST_LOG` when it is unset
pub fn setup_logging() {
    if std::env::var("RUST_LOG").is_err() {
        // Safety: single-threaded at startup
        unsafe {
            if cfg!(debug_assertions) {
                std::env::set_var("RUST_LOG", "debug,point_map_lib::culler=info");
            } else {
                std::env::set_var("RUST_LOG", "info");
            }
        }
    }

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(fmt_layer).init();

    if cfg!(feature = "profiling") {
        tracing::info!("Logging initialized (profiling scopes emitted as spans)");
    } else {
        tracing::debug!("Logging initialized");
    }
}
