use tracing_subscriber::{prelude::*, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info";

/// Installs the global subscriber.
///
/// Logs go to stderr: stdout carries the JSON printed by `status` and
/// `errors`. `RUST_LOG` overrides the default `info` filter.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::Registry::default()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .compact()
                .with_filter(filter),
        )
        .init();
}
