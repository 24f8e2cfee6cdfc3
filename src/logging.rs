//! Tracing setup for the binary.
//!
//! `RUST_LOG` wins when set; otherwise `--verbose` selects `debug` and the
//! default is `warn` so log lines stay out of the way of the session board.

use tracing_subscriber::EnvFilter;

pub fn default_directive(verbose: bool) -> &'static str {
    if verbose { "rollcall=debug" } else { "rollcall=warn" }
}

pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));
    // A second init (e.g. from tests) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
