//! Mediator settings.
//!
//! ```toml
//! publish_strategy = "concurrent"   # or "sequential" (default)
//! log_level = "debug"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SetupError;
use crate::logging;
use crate::publish::PublishStrategy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediatorConfig {
    pub publish_strategy: PublishStrategy,
    pub log_level: String,
}

impl Default for MediatorConfig {
    fn default() -> Self {
        Self {
            publish_strategy: PublishStrategy::Sequential,
            log_level: "info".to_string(),
        }
    }
}

impl MediatorConfig {
    /// Parse and validate. `log_level` must be a plain level name.
    pub fn from_toml_str(source: &str) -> Result<Self, SetupError> {
        let config: Self = toml::from_str(source)?;
        logging::parse_level(&config.log_level)?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SetupError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| SetupError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = MediatorConfig::from_toml_str("").unwrap();
        assert_eq!(config, MediatorConfig::default());
    }

    #[test]
    fn parses_every_field() {
        let config = MediatorConfig::from_toml_str(
            r#"
            publish_strategy = "concurrent"
            log_level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.publish_strategy, PublishStrategy::Concurrent);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let err = MediatorConfig::from_toml_str("publish_strategy = \"parallel\"").unwrap_err();
        assert!(matches!(err, SetupError::Config(_)));
    }

    #[test]
    fn misspelt_log_level_is_rejected() {
        let err = MediatorConfig::from_toml_str("log_level = \"verbose\"").unwrap_err();
        assert!(matches!(err, SetupError::Logger(msg) if msg.contains("verbose")));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = MediatorConfig::load("/nonexistent/herald.toml").unwrap_err();
        assert!(err.to_string().contains("herald.toml"));
    }
}
