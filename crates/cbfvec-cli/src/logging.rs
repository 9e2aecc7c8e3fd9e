//! Log output setup.

use tracing_subscriber::{fmt, EnvFilter};

/// Filter directive for a `-v` count when `RUST_LOG` is not consulted.
pub fn level_for(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber, writing to stderr so stdout stays clean
/// for `--json` output.
///
/// `-v` flags take precedence over `RUST_LOG`; without them `RUST_LOG`
/// applies, defaulting to `info`.
pub fn init(verbose: u8) {
    let filter = if verbose > 0 {
        EnvFilter::new(level_for(verbose))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_for(0)))
    };

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
