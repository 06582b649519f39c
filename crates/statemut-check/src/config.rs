//! Checker configuration.
//!
//! Every field has a default matching the behavior of the language revision
//! the checker targets, so an empty JSON object is a valid config.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Switches that adjust diagnostic policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    /// Report state writes inside `view` functions as errors instead of
    /// deprecation warnings.
    pub view_writes_are_errors: bool,
    /// Emit "can be restricted" suggestions. Default: true.
    pub suggest_restrictions: bool,
    /// Report each modifier's inferred mutability on the informational
    /// channel.
    pub explain_modifiers: bool,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        CheckerConfig {
            view_writes_are_errors: false,
            suggest_restrictions: true,
            explain_modifiers: false,
        }
    }
}

impl CheckerConfig {
    /// The default config with view/write upgraded to an error.
    pub fn strict() -> Self {
        CheckerConfig {
            view_writes_are_errors: true,
            ..CheckerConfig::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = CheckerConfig::default();
        assert!(!config.view_writes_are_errors);
        assert!(config.suggest_restrictions);
        assert!(!config.explain_modifiers);
    }

    #[test]
    fn empty_object_yields_defaults() {
        assert_eq!(
            CheckerConfig::from_json_str("{}").unwrap(),
            CheckerConfig::default()
        );
    }

    #[test]
    fn partial_object_overrides_named_fields() {
        let config = CheckerConfig::from_json_str(r#"{"view_writes_are_errors": true}"#).unwrap();
        assert_eq!(config, CheckerConfig::strict());
    }

    #[test]
    fn unreadable_file_reports_its_path() {
        let err = CheckerConfig::from_json_file(Path::new("/nonexistent/statemut.json"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/statemut.json"));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"suggest_restrictions": false}}"#).unwrap();
        let config = CheckerConfig::from_json_file(file.path()).unwrap();
        assert!(!config.suggest_restrictions);
        assert!(!config.view_writes_are_errors);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            CheckerConfig::from_json_str("{"),
            Err(ConfigError::Parse(_))
        ));
    }
}
