//! Logging setup built on the `log` facade

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system
///
/// Call once at startup, before any engine objects are created. Respects the
/// `RUST_LOG` environment variable for level filtering.
pub fn init() {
    env_logger::init();
}

/// Initialize the logging system, ignoring repeated calls
///
/// Useful in tests where multiple entry points may try to set up logging.
pub fn try_init() {
    let _ = env_logger::try_init();
}

/// Initialize the logging system with a fallback filter
///
/// The fallback applies only when `RUST_LOG` is unset, so applications get
/// readable output by default without losing environment control.
pub fn init_with_default(filter: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();
}
