// Logging setup. Output goes to stderr so it never mixes with command
// output; `RUST_LOG` overrides the default filter.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. `verbose` turns on debug output for this
/// crate (request URLs, statuses, cache hits).
pub fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "habits=debug,reqwest=warn"
    } else {
        "habits=warn,reqwest=error"
    };
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
