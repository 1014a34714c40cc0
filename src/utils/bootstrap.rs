//! Bootstrap utilities.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LOG_ENV_VAR;

fn env_filter() -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
}

/// Initialize tracing with the KAMHUB_LOG environment variable.
///
/// Defaults to "info" level if KAMHUB_LOG is not set. Calling this more than
/// once is harmless; only the first subscriber is installed.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    #[serial]
    fn test_env_filter_reads_log_var() {
        std::env::set_var(LOG_ENV_VAR, "kam_hub=debug");
        let filter = env_filter();
        std::env::remove_var(LOG_ENV_VAR);

        assert_eq!(filter.to_string(), "kam_hub=debug");
    }

    #[test]
    #[serial]
    fn test_env_filter_defaults_to_info() {
        std::env::remove_var(LOG_ENV_VAR);
        assert_eq!(env_filter().to_string(), "info");
    }

    #[test]
    fn test_init_tracing_twice_does_not_panic() {
        init_tracing();
        init_tracing();
    }
}
