use crate::app::cache::CacheConfig;
use clap::Parser;
use journal_entrypoints::{get_env, parse_args};
use roadtrip_lib::{FailureMode, MockLatency};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable standing in for the platform color scheme
pub const COLOR_SCHEME_ENV: &str = "JOURNAL_COLOR_SCHEME";

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Road Trip Journal - record road trips as ordered stops on a map
pub struct Settings {
    /// Log in with this email when no session can be restored
    #[clap(short, long)]
    pub email: Option<String>,

    /// Multiplier for the simulated backend latency (0 disables it)
    #[clap(long, default_value = "1.0", value_parser = parse_latency_scale)]
    pub latency_scale: f64,

    /// Probability (0-1) that a backend call fails with a simulated network error
    #[clap(long, default_value = "0.0", value_parser = parse_probability)]
    pub failure_rate: f64,

    /// Secure storage file (defaults to the per-user configuration directory)
    #[clap(long, value_name = "FILE")]
    pub storage_file: Option<PathBuf>,

    /// Keep the session in memory only
    #[clap(long, default_value = "false")]
    pub memory_storage: bool,

    /// Color scheme reported by the host (light or dark)
    #[clap(long)]
    pub color_scheme: Option<String>,

    /// Retries for failed queries
    #[clap(long, default_value = "3")]
    pub retry: u32,

    /// Seconds before cached query data is considered stale
    #[clap(long, default_value = "0")]
    pub stale_secs: u64,

    /// Seconds an unobserved query is kept before it is dropped from the cache
    #[clap(long, default_value = "300")]
    pub gc_secs: u64,

    /// Forget the persisted session before starting
    #[clap(long, default_value = "false")]
    pub logout: bool,
}

/// Largest accepted `--latency-scale`
const MAX_LATENCY_SCALE: f64 = 100.0;

fn parse_latency_scale(arg: &str) -> Result<f64, String> {
    let scale: f64 = arg.parse().map_err(|e| format!("{e}"))?;
    if (0.0..=MAX_LATENCY_SCALE).contains(&scale) {
        Ok(scale)
    } else {
        Err(format!("must be between 0 and {MAX_LATENCY_SCALE}"))
    }
}

fn parse_probability(arg: &str) -> Result<f64, String> {
    let p: f64 = arg.parse().map_err(|e| format!("{e}"))?;
    if (0.0..=1.0).contains(&p) {
        Ok(p)
    } else {
        Err("must be between 0 and 1".to_string())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings::parse_from(["roadtrip-journal"])
    }
}

impl Settings {
    pub fn from_cli() -> Self {
        match parse_args::<Settings>() {
            Ok(args) => args,
            Err(e) => e.exit(),
        }
    }

    pub fn latency(&self) -> MockLatency {
        MockLatency::scaled(self.latency_scale)
    }

    pub fn failure_mode(&self) -> FailureMode {
        if self.failure_rate.is_nan() || self.failure_rate <= 0.0 {
            FailureMode::Never
        } else if self.failure_rate >= 1.0 {
            FailureMode::Always
        } else {
            FailureMode::Probability(self.failure_rate)
        }
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            retry: self.retry,
            stale_time: Duration::from_secs(self.stale_secs),
            gc_time: Duration::from_secs(self.gc_secs),
            ..CacheConfig::default()
        }
    }

    /// The `--color-scheme` flag, else the environment
    pub fn color_scheme(&self) -> Option<String> {
        self.color_scheme
            .clone()
            .or_else(|| get_env::<String>(COLOR_SCHEME_ENV))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use journal_entrypoints::cli::parse_args_from;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.latency_scale, 1.0);
        assert_eq!(settings.failure_mode(), FailureMode::Never);
        assert!(!settings.memory_storage);
        assert_eq!(settings.cache_config(), CacheConfig::default());
    }

    #[test]
    fn test_flags() {
        let settings: Settings = parse_args_from([
            "roadtrip-journal",
            "--email",
            "alice@example.com",
            "--latency-scale",
            "0",
            "--failure-rate",
            "0.25",
            "--memory-storage",
            "--color-scheme",
            "dark",
            "--retry",
            "0",
            "--stale-secs",
            "30",
            "--gc-secs",
            "10",
        ])
        .unwrap();

        assert_eq!(settings.email.as_deref(), Some("alice@example.com"));
        assert_eq!(settings.latency(), MockLatency::none());
        assert_eq!(settings.failure_mode(), FailureMode::Probability(0.25));
        assert!(settings.memory_storage);
        assert_eq!(settings.color_scheme().as_deref(), Some("dark"));

        let cache = settings.cache_config();
        assert_eq!(cache.retry, 0);
        assert_eq!(cache.stale_time, Duration::from_secs(30));
        assert_eq!(cache.gc_time, Duration::from_secs(10));
    }

    #[test]
    fn test_failure_rate_bounds() {
        let always: Settings = parse_args_from(["roadtrip-journal", "--failure-rate", "1"]).unwrap();
        assert_eq!(always.failure_mode(), FailureMode::Always);

        let nan = Settings {
            failure_rate: f64::NAN,
            ..Settings::default()
        };
        assert_eq!(nan.failure_mode(), FailureMode::Never);
    }

    #[test]
    fn test_rejects_non_finite_and_out_of_range_values() {
        for (flag, value) in [
            ("--failure-rate", "NaN"),
            ("--failure-rate", "inf"),
            ("--failure-rate", "1.5"),
            ("--failure-rate", "-0.1"),
            ("--latency-scale", "inf"),
            ("--latency-scale", "NaN"),
            ("--latency-scale", "-1"),
            ("--latency-scale", "1e300"),
        ] {
            let parsed = parse_args_from::<Settings, _, _>(["roadtrip-journal", flag, value]);
            assert!(parsed.is_err(), "{flag} {value} was accepted");
        }

        let slow: Settings = parse_args_from(["roadtrip-journal", "--latency-scale", "2.5"]).unwrap();
        assert_eq!(slow.latency(), MockLatency::scaled(2.5));
    }
}
