/*!
Logging initialisation for journal binaries and tests.

- `setup_logging()` installs the global `tracing` subscriber (fmt layer +
  `EnvFilter`) and panics if one is already installed, like `init()` does.
- `try_setup_logging()` is the non-panicking variant used by tests, where
  several test functions may race to initialise logging in one process.

If `RUST_LOG` is not set a sensible default is installed first.
*/

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Filter used when `RUST_LOG` is not set
pub fn default_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "debug,tokio=info"
    } else {
        // Release builds default to INFO to avoid excessive logs.
        "info"
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter()))
}

/// Initialize logging with sensible defaults.
pub fn setup_logging() {
    let fmt_layer = fmt::layer().with_filter(env_filter());
    tracing_subscriber::registry().with(fmt_layer).init();

    tracing::info!("Logging initialized");
}

/// Initialize logging unless a global subscriber already exists.
///
/// Returns `true` when this call installed the subscriber.
pub fn try_setup_logging() -> bool {
    let fmt_layer = fmt::layer().with_test_writer().with_filter(env_filter());
    tracing_subscriber::registry()
        .with(fmt_layer)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_setup_logging_is_idempotent() {
        // Whichever call wins, the second one must not panic
        let _ = try_setup_logging();
        assert!(!try_setup_logging());
    }

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(default_filter()).is_ok());
    }
}
