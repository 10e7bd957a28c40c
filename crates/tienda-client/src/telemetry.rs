//! Logging setup for embedding applications.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,tienda_client=debug";

/// Installs a formatting subscriber honoring `RUST_LOG`.
///
/// Returns `false` when a global subscriber was already installed, so it
/// is safe to call from every test and from the embedding shell.
pub fn init_tracing() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}
