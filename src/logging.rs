use tracing_subscriber::EnvFilter;

/// Filter used when RUST_LOG is not set
fn default_filter(level: &str) -> String {
    format!("focusbell={},warn", level)
}

/// Install the global stderr subscriber. `RUST_LOG` overrides `level`.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(level)));

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
