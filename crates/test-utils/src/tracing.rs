use tracing_subscriber::EnvFilter;

/// Installs a test-friendly subscriber once; later calls are no-ops. Control
/// verbosity with `RUST_LOG` as usual.
pub fn init_tracing_for_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
