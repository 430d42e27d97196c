//! Configuration validation rules.

use super::schema::Config;

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    if config.server.host.trim().is_empty() {
        errors.push("server.host must not be empty".to_string());
    }
    if config.server.port == 0 {
        errors.push("server.port must be > 0".to_string());
    }
    if config.server.session_idle_secs == 0 {
        errors.push("server.session_idle_secs must be > 0".to_string());
    }
    if config.server.max_sessions == 0 {
        errors.push("server.max_sessions must be > 0".to_string());
    }

    if config.provider.api_base.trim().is_empty() {
        errors.push("provider.api_base must not be empty".to_string());
    }
    if config.provider.model.trim().is_empty() {
        errors.push("provider.model must not be empty".to_string());
    }
    if config.provider.timeout_secs == 0 {
        errors.push("provider.timeout_secs must be > 0".to_string());
    }
    if let Some(temperature) = config.provider.temperature {
        if !(0.0..=2.0).contains(&temperature) {
            errors.push("provider.temperature must be in [0.0, 2.0]".to_string());
        }
    }

    if config.agent.system_prompt.trim().is_empty() {
        errors.push("agent.system_prompt must not be empty".to_string());
    }

    let format = config.logging.format.to_ascii_lowercase();
    if format != "text" && format != "json" {
        errors.push("logging.format must be one of: text, json".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Config(errors.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_errors_are_aggregated() {
        let mut config = Config::default();
        config.server.port = 0;
        config.provider.model = "  ".to_string();
        config.logging.format = "xml".to_string();

        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("server.port"));
        assert!(err.contains("provider.model"));
        assert!(err.contains("logging.format"));
    }

    #[test]
    fn test_rejects_zero_session_limits() {
        let mut config = Config::default();
        config.server.session_idle_secs = 0;
        config.server.max_sessions = 0;

        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("server.session_idle_secs"));
        assert!(err.contains("server.max_sessions"));
    }

    #[test]
    fn test_rejects_out_of_range_temperature() {
        let mut config = Config::default();
        config.provider.temperature = Some(3.0);
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("temperature"));
    }
}
