use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Bid store retention, scan page size and sweep interval are positive
/// - Orchestrator tick interval and window limit are positive
/// - Startup probe timeout is positive
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.bid_store.retention_secs == 0 {
        return Err(ConfigError::ValidationError(
            "bid_store.retention_secs must be greater than 0".to_string(),
        ));
    }
    if config.bid_store.scan_page_size == 0 {
        return Err(ConfigError::ValidationError(
            "bid_store.scan_page_size must be greater than 0".to_string(),
        ));
    }
    if config.bid_store.sweep_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "bid_store.sweep_interval_secs must be greater than 0".to_string(),
        ));
    }

    if config.orchestrator.tick_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.tick_interval_ms must be greater than 0".to_string(),
        ));
    }
    if config.orchestrator.window_limit == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.window_limit must be greater than 0".to_string(),
        ));
    }

    if config.startup.probe_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "startup.probe_timeout_secs must be greater than 0".to_string(),
        ));
    }

    Ok(())
}
