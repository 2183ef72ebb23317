//! Reasoner configuration.
//!
//! Parsed from TOML, e.g. `reasoner.toml`:
//!
//! ```toml
//! verbose = true
//! operation_timeout_ms = 2000
//!
//! [property_names]
//! top_object = "owl:topObjectProperty"
//! bottom_object = "owl:bottomObjectProperty"
//! top_data = "owl:topDataProperty"
//! bottom_data = "owl:bottomDataProperty"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult};

/// Names of the universal and empty object/data properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyNames {
    pub top_object: String,
    pub bottom_object: String,
    pub top_data: String,
    pub bottom_data: String,
}

impl Default for PropertyNames {
    fn default() -> Self {
        Self {
            top_object: "*UROLE*".into(),
            bottom_object: "*EROLE*".into(),
            top_data: "*UDROLE*".into(),
            bottom_data: "*EDROLE*".into(),
        }
    }
}

impl PropertyNames {
    pub fn new(
        top_object: impl Into<String>,
        bottom_object: impl Into<String>,
        top_data: impl Into<String>,
        bottom_data: impl Into<String>,
    ) -> Self {
        Self {
            top_object: top_object.into(),
            bottom_object: bottom_object.into(),
            top_data: top_data.into(),
            bottom_data: bottom_data.into(),
        }
    }

    /// All four names, in declaration order.
    pub fn as_array(&self) -> [&str; 4] {
        [
            &self.top_object,
            &self.bottom_object,
            &self.top_data,
            &self.bottom_data,
        ]
    }

    /// Check that every name is non-empty and the four are pairwise distinct.
    pub fn validate(&self) -> BridgeResult<()> {
        let names = self.as_array();
        for (i, name) in names.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(BridgeError::InvalidConfig {
                    message: "top/bottom property names must be non-empty".into(),
                });
            }
            if names[..i].contains(name) {
                return Err(BridgeError::InvalidConfig {
                    message: format!("top/bottom property name \"{name}\" is used twice"),
                });
            }
        }
        Ok(())
    }
}

/// Configuration applied to a reasoner at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasonerConfig {
    /// Log kernel lifecycle events at `info` instead of `debug`.
    pub verbose: bool,
    /// Operation timeout in milliseconds; `0` disables it.
    pub operation_timeout_ms: u64,
    /// Names for the top/bottom object and data properties.
    pub property_names: PropertyNames,
}

impl ReasonerConfig {
    /// Parse and validate a configuration from TOML source.
    pub fn from_toml_str(source: &str) -> BridgeResult<Self> {
        let config: Self = toml::from_str(source).map_err(|e| BridgeError::InvalidConfig {
            message: e.to_string(),
        })?;
        config.property_names.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file.
    pub fn load(path: &Path) -> BridgeResult<Self> {
        let source = std::fs::read_to_string(path).map_err(|source| BridgeError::ConfigIo {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// The operation timeout as a [`Duration`].
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_source_gives_defaults() {
        let config = ReasonerConfig::from_toml_str("").unwrap();
        assert_eq!(config, ReasonerConfig::default());
        assert!(!config.verbose);
        assert_eq!(config.operation_timeout(), Duration::ZERO);
        assert_eq!(config.property_names.top_object, "*UROLE*");
    }

    #[test]
    fn parses_full_config() {
        let config = ReasonerConfig::from_toml_str(
            r#"
            verbose = true
            operation_timeout_ms = 1500

            [property_names]
            top_object = "topO"
            bottom_object = "botO"
            top_data = "topD"
            bottom_data = "botD"
            "#,
        )
        .unwrap();
        assert!(config.verbose);
        assert_eq!(config.operation_timeout(), Duration::from_millis(1500));
        assert_eq!(
            config.property_names,
            PropertyNames::new("topO", "botO", "topD", "botD")
        );
    }

    #[test]
    fn partial_property_names_keep_defaults() {
        let config = ReasonerConfig::from_toml_str(
            r#"
            [property_names]
            top_object = "everything"
            "#,
        )
        .unwrap();
        assert_eq!(config.property_names.top_object, "everything");
        assert_eq!(config.property_names.bottom_object, "*EROLE*");
    }

    #[test]
    fn duplicate_names_rejected() {
        let err = PropertyNames::new("a", "b", "a", "c").validate().unwrap_err();
        assert!(matches!(err, BridgeError::InvalidConfig { .. }));
    }

    #[test]
    fn empty_name_rejected() {
        let err = PropertyNames::new("a", " ", "c", "d").validate().unwrap_err();
        assert!(matches!(err, BridgeError::InvalidConfig { .. }));
    }

    #[test]
    fn malformed_toml_rejected() {
        let err = ReasonerConfig::from_toml_str("verbose = maybe").unwrap_err();
        assert!(matches!(err, BridgeError::InvalidConfig { .. }));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("reasoner.toml");
        std::fs::write(&path, "operation_timeout_ms = 10\n").unwrap();
        let config = ReasonerConfig::load(&path).unwrap();
        assert_eq!(config.operation_timeout_ms, 10);

        let missing = ReasonerConfig::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(missing, BridgeError::ConfigIo { .. }));
    }
}
