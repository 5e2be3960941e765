use std::path::Path;

use serde::{Deserialize, Serialize};

use super::Format;
use crate::Error;
use crate::model::LineToggles;
use crate::weighting::WeightingPolicy;

/// Defaults applied to every network built by [`create_network`].
///
/// Every field is optional in the file; missing ones take the documented
/// defaults of [`WeightingPolicy`] and [`LineToggles`].
///
/// ```toml
/// [policy]
/// weighted_time = true
/// weight_time = 2.0
///
/// [line_defaults]
/// loop = false
/// ```
///
/// [`create_network`]: super::create_network
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RailNetConfig {
    /// Network-wide weighting used when a description brings none.
    pub policy: WeightingPolicy,
    /// Toggles of lines that do not set their own.
    pub line_defaults: LineToggles,
}

impl RailNetConfig {
    /// # Errors
    ///
    /// [`Error::TomlError`] for malformed input, [`Error::InvalidData`] for
    /// invalid weights.
    pub fn from_toml_str(text: &str) -> Result<Self, Error> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML or JSON configuration file.
    ///
    /// # Errors
    ///
    /// I/O and parse errors, or [`Error::InvalidData`] for invalid weights
    /// and unknown extensions.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = match Format::of(path)? {
            Format::Toml => toml::from_str(&text)?,
            Format::Json => serde_json::from_str(&text)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// [`Error::InvalidData`] if the policy is invalid.
    pub fn validate(&self) -> Result<(), Error> {
        self.policy.validate()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = RailNetConfig::from_toml_str("").unwrap();
        assert_eq!(config, RailNetConfig::default());
        assert!(config.policy.weighted_time);
        assert!(!config.policy.weighted_fuel);
        assert!(config.line_defaults.dock_on_error);
        assert!(!config.line_defaults.ignore_on_error);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = RailNetConfig::from_toml_str(
            "[policy]\nweighted_fuel = true\nweight_fuel = 0.5\n\n[line_defaults]\nloop = false\n",
        )
        .unwrap();
        assert!(config.policy.weighted_fuel);
        assert!(config.policy.weighted_time);
        assert_eq!(config.policy.weight_fuel, 0.5);
        assert!(!config.line_defaults.looping);
        assert!(config.line_defaults.ordered_points);
    }

    #[test]
    fn test_negative_weight_is_rejected() {
        let err = RailNetConfig::from_toml_str("[policy]\nweight_time = -1.0\n").unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }
}
