use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset. Verbose mode shows this crate at
/// debug and keeps the HTTP stack to warnings.
fn default_directives(verbose: bool) -> &'static str {
    if verbose { "warn,coinfolio=debug" } else { "off" }
}

/// Installs the global subscriber, writing to stderr.
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));
    let layer = fmt::layer()
        .pretty()
        .without_time()
        .with_target(verbose)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry().with(layer).with(filter).init();
}
