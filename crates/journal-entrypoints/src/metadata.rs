/// Log version info through the tracing subscriber.
pub fn log_version_info(app_name: &str) {
    tracing::info!("{}", short_version_info(app_name));
    tracing::info!(
        "Build profile: {}",
        if cfg!(debug_assertions) {
            "debug"
        } else {
            "release"
        }
    );
}

pub fn short_version_info(app_name: &str) -> String {
    format!(
        "{} {} ({} {})",
        app_name,
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}
