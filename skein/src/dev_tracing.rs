//! Opt-in log output for tests and benches.

/// Development helper: initialize tracing subscriber when `RUST_LOG` is set.
///
/// Benches and tests can call `skein::dev_tracing::init_tracing()` to see the
/// hub's peering and routing events. This is a no-op when `RUST_LOG` is not
/// set or when a global subscriber is already installed.
pub fn init_tracing() {
    use std::env;

    if env::var("RUST_LOG").is_ok() {
        let installed = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_thread_names(true)
            .try_init()
            .is_ok();
        if installed {
            tracing::debug!("[TRACING] Subscriber installed from RUST_LOG");
        }
    }
}
