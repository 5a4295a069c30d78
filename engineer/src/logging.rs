//! Diagnostic tracing to stderr.
//!
//! Transcripts and token usage are product output and live in the `logs`
//! namespace of the project store; this module only covers developer-facing
//! diagnostics, which never reach the store.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set. Otherwise the level is `info`, or `debug` with
/// `--verbose`. Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=engineer::pipeline=debug engineer run ./my-app
/// ```
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}
