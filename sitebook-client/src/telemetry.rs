//! Tracing subscriber setup for the `sitebook` binary.
//!
//! The library only emits events; installing a subscriber is the binary's job.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ClientConfig;
use crate::error::ClientError;

const DEFAULT_FILTER: &str = "info";
const DEV_FILTER: &str = "sitebook_client=debug,sitebook_cache=debug,info";

/// Filter directives used when `RUST_LOG` is unset.
pub fn default_directives(config: &ClientConfig) -> String {
    match &config.log.filter {
        Some(filter) => filter.clone(),
        None if config.dev_mode => DEV_FILTER.to_string(),
        None => DEFAULT_FILTER.to_string(),
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_tracing(config: &ClientConfig) -> Result<(), ClientError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(config)));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if config.log.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
    result.map_err(|e| ClientError::Telemetry(e.to_string()))?;

    tracing::debug!(
        dev_mode = config.dev_mode,
        json = config.log.json,
        "Tracing initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dev_mode_enables_debug_for_client() {
        let mut config = ClientConfig::new("http://localhost");
        assert_eq!(default_directives(&config), "info");
        config.dev_mode = true;
        assert!(default_directives(&config).contains("sitebook_client=debug"));
        config.log.filter = Some("warn".to_string());
        assert_eq!(default_directives(&config), "warn");
    }
}
