//! Process entry points for the road trip journal
//!
//! This crate owns everything a binary needs before the data layer can run:
//! the tokio runtime, the tracing subscriber, CLI/env parsing, and a few
//! cooperative async helpers shared by the client stores and the query cache.
//!
//! # Usage
//!
//! In your `main.rs`:
//!
//! ```ignore
//! fn main() -> std::process::ExitCode {
//!     journal_entrypoints::run_native("Road Trip Journal", |_| async {
//!         // ... application logic ...
//!         std::process::ExitCode::SUCCESS
//!     })
//! }
//! ```

pub mod async_runtime;
pub mod cli;
pub mod logging;

// Re-export commonly used helpers
pub use cli::{get_env, parse_args};
pub use logging::{setup_logging, try_setup_logging};

mod metadata;
pub use metadata::{log_version_info, short_version_info};

/// Run an async application on a fresh multi-threaded tokio runtime.
///
/// Logging is initialised and the version banner printed before `app` starts.
/// The closure receives the application name so it can be reused in messages.
pub fn run_native<F, Fut>(app_name: &str, app: F) -> Fut::Output
where
    F: FnOnce(String) -> Fut,
    Fut: std::future::Future,
{
    // This MUST be done before any logging
    logging::setup_logging();

    log_version_info(app_name);

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create Tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    rt.block_on(app(app_name.to_string()))
}
