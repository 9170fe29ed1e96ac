//! Tracing subscriber setup for binaries and tests embedding tether.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::core::constants::LOG_ENV;

/// Install a global subscriber.
///
/// `TETHER_LOG` wins when set; otherwise `verbose` picks between debug and
/// warn for this crate. Calling it again is a no-op.
pub fn init(verbose: bool, json: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("tether=debug")
        } else {
            EnvFilter::new("tether=warn")
        }
    });

    let registry = tracing_subscriber::registry().with(filter);
    // A subscriber is already installed when this fails.
    let _ = if json {
        registry.with(fmt::layer().json().with_target(false)).try_init()
    } else {
        registry.with(fmt::layer().with_target(false)).try_init()
    };
}
