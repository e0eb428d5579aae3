//! Log output for applications built on Ripple.
//!
//! The engine only emits `tracing` events. Call [`init`] once at startup to
//! print them; the filter is read from `RUST_LOG` and defaults to `info`.
//!
//! ```ignore
//! ripple::log::init();
//! ```

use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_FILTER: &str = "info";

static TRACING_INSTALLED: Once = Once::new();

/// Installs a formatted subscriber writing to `stderr` (idempotent).
///
/// Does nothing if another global subscriber was installed first.
pub fn init() {
    TRACING_INSTALLED.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let result = tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_filter(filter))
            .try_init();
        if let Err(error) = result {
            eprintln!("ripple: tracing subscriber already installed: {error}");
        }
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_is_idempotent() {
        super::init();
        super::init();
        tracing::info!("logging initialised");
    }
}
