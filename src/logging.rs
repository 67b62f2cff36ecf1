use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing for a helper binary
///
/// Log lines go to stderr so stdout only carries what callers capture
/// (e.g. `eval $(assume-role ...)`). Defaults to `warn` unless `RUST_LOG` is set.
pub fn init() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
