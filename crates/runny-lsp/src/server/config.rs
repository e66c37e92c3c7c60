//! Server configuration, read from the client's `initializationOptions`.

use serde::Deserialize;

/// Options the editor can pass when starting the server.
///
/// ```json
/// { "diagnostics": true, "diagnosticsDelayMs": 300 }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    /// Publish syntax diagnostics.
    pub diagnostics: bool,

    /// Debounce for diagnostics after an edit, in milliseconds.
    pub diagnostics_delay_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            diagnostics: true,
            diagnostics_delay_ms: 300,
        }
    }
}

impl ServerConfig {
    /// Read the config from initialization options, falling back to the
    /// defaults when they are missing or malformed.
    pub fn from_initialization_options(options: Option<serde_json::Value>) -> Self {
        let Some(value) = options else {
            return Self::default();
        };

        match serde_json::from_value(value) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring invalid initialization options: {}", e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_without_options() {
        assert_eq!(ServerConfig::from_initialization_options(None), ServerConfig::default());
    }

    #[test]
    fn test_partial_options() {
        let config = ServerConfig::from_initialization_options(Some(json!({
            "diagnosticsDelayMs": 50
        })));
        assert!(config.diagnostics);
        assert_eq!(config.diagnostics_delay_ms, 50);
    }

    #[test]
    fn test_disable_diagnostics() {
        let config = ServerConfig::from_initialization_options(Some(json!({
            "diagnostics": false
        })));
        assert!(!config.diagnostics);
        assert_eq!(config.diagnostics_delay_ms, 300);
    }

    #[test]
    fn test_invalid_options_fall_back() {
        let config = ServerConfig::from_initialization_options(Some(json!({
            "diagnostics": "yes please"
        })));
        assert_eq!(config, ServerConfig::default());
    }
}
