use crate::models::config::LoggingConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
/// Calling it again after a subscriber is set is a no-op.
pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(config)));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    };

    if result.is_ok() {
        tracing::debug!(level = %config.level, json = config.json, "logging initialized");
    }
}

fn default_directive(config: &LoggingConfig) -> String {
    let level = config.level.trim();
    if level.is_empty() {
        "info".to_string()
    } else if level.contains('=') {
        level.to_string()
    } else {
        format!("ocr_converter_lib={},ocr_converter={},warn", level, level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_level_scopes_to_crate() {
        let config = LoggingConfig {
            level: "debug".to_string(),
            json: false,
        };
        assert_eq!(default_directive(&config), "ocr_converter_lib=debug,ocr_converter=debug,warn");
    }

    #[test]
    fn test_directives_pass_through() {
        let config = LoggingConfig {
            level: "ocr_converter_lib=trace,reqwest=debug".to_string(),
            json: true,
        };
        assert_eq!(default_directive(&config), "ocr_converter_lib=trace,reqwest=debug");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init(&LoggingConfig::default());
        init(&LoggingConfig::default());
    }
}
