//! Heatmap session configuration.
//!
//! Loaded from TOML. Every key has a default, so an empty document is a
//! valid configuration. The bundled `config/default.toml` spells out the
//! same values as [`HeatmapConfig::default`].

use std::path::Path;

use issue_map_generate::GeneratorKind;
use issue_map_issue_models::{GeoCoordinate, IssueTypeFilter};
use issue_map_spatial::Range2d;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Bundled defaults, kept in sync with [`HeatmapConfig::default`].
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../config/default.toml");

/// Errors from loading or validating a [`HeatmapConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Reading the config file failed.
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// Path that was read.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The TOML did not parse or had the wrong shape.
    #[error("Invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value was out of its allowed domain.
    #[error("Invalid config value for {field}: {message}")]
    Invalid {
        /// Offending key.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },
}

/// Where heatmap points come from.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HeatmapMode {
    /// Stored issues narrowed by the type filter, unweighted.
    #[default]
    Filter,
    /// Stored issues with distance-based weights.
    Weighted,
    /// Synthetic points from a shape generator.
    Generator,
}

/// An axis-aligned range as written in config.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeConfig {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl RangeConfig {
    #[must_use]
    pub fn to_range(self) -> Range2d {
        Range2d::from_xyxy(self.min_x, self.min_y, self.max_x, self.max_y)
    }
}

/// User location marker settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserLocationConfig {
    /// Fallback latitude when geolocation is unavailable.
    #[serde(default = "default_latitude")]
    pub latitude: f64,
    /// Fallback longitude when geolocation is unavailable.
    #[serde(default = "default_longitude")]
    pub longitude: f64,
    /// Marker size. The marker box has half-size `marker_size / 10`.
    #[serde(default = "default_marker_size")]
    pub marker_size: f64,
    /// Spread factor of the location overlay.
    #[serde(default = "default_location_spread_factor")]
    pub spread_factor: f64,
}

impl Default for UserLocationConfig {
    fn default() -> Self {
        Self {
            latitude: default_latitude(),
            longitude: default_longitude(),
            marker_size: default_marker_size(),
            spread_factor: default_location_spread_factor(),
        }
    }
}

impl UserLocationConfig {
    /// The fallback location, at ground height.
    #[must_use]
    pub const fn fallback(&self) -> GeoCoordinate {
        GeoCoordinate::new(self.longitude, self.latitude, 0.0)
    }
}

/// Synthetic point settings for [`HeatmapMode::Generator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_generator_kind")]
    pub kind: GeneratorKind,
    #[serde(default = "default_generator_count")]
    pub count: usize,
    /// Seed for the random generator. Unseeded when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            kind: default_generator_kind(),
            count: default_generator_count(),
            seed: None,
        }
    }
}

/// Complete heatmap session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeatmapConfig {
    /// Base URL of the issue API, or a path to a JSON issue file.
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    #[serde(default)]
    pub mode: HeatmapMode,
    /// Issue type shown in [`HeatmapMode::Filter`] and
    /// [`HeatmapMode::Weighted`].
    #[serde(default)]
    pub filter: IssueTypeFilter,
    /// Spread factor of the issue overlay.
    #[serde(default = "default_spread_factor")]
    pub spread_factor: f64,
    /// Z-offset of the issue overlay.
    #[serde(default)]
    pub height: f64,
    /// Fraction the computed bounds are grown by on each side.
    #[serde(default = "default_expand_fraction")]
    pub expand_fraction: f64,
    /// Range shown before any data is loaded, used when the host has no view.
    #[serde(default = "default_view_range")]
    pub default_view_range: RangeConfig,
    /// Overlay height of the initial view.
    #[serde(default = "default_view_height")]
    pub view_height: f64,
    #[serde(default)]
    pub user_location: UserLocationConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            mode: HeatmapMode::default(),
            filter: IssueTypeFilter::default(),
            spread_factor: default_spread_factor(),
            height: 0.0,
            expand_fraction: default_expand_fraction(),
            default_view_range: default_view_range(),
            view_height: default_view_height(),
            user_location: UserLocationConfig::default(),
            generator: GeneratorConfig::default(),
        }
    }
}

fn default_backend_url() -> String {
    "http://localhost:3000".to_string()
}

const fn default_spread_factor() -> f64 {
    0.2
}

const fn default_expand_fraction() -> f64 {
    0.1
}

const fn default_view_range() -> RangeConfig {
    RangeConfig {
        min_x: 5.0,
        min_y: 50.0,
        max_x: 7.0,
        max_y: 62.0,
    }
}

const fn default_view_height() -> f64 {
    1.0
}

const fn default_latitude() -> f64 {
    50.0
}

const fn default_longitude() -> f64 {
    6.0
}

const fn default_marker_size() -> f64 {
    1.0
}

const fn default_location_spread_factor() -> f64 {
    2.0
}

const fn default_generator_kind() -> GeneratorKind {
    GeneratorKind::Random
}

const fn default_generator_count() -> usize {
    100
}

impl HeatmapConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys and
    /// [`ConfigError::Invalid`] for out-of-domain values.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`Self::from_toml_str`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        log::debug!("Loaded heatmap config from {}", path.display());
        Ok(config)
    }

    /// Checks every numeric setting.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("spread_factor", self.spread_factor)?;
        positive("user_location.spread_factor", self.user_location.spread_factor)?;
        positive("user_location.marker_size", self.user_location.marker_size)?;
        finite("height", self.height)?;
        finite("view_height", self.view_height)?;

        if !self.expand_fraction.is_finite() || self.expand_fraction < 0.0 {
            return Err(ConfigError::Invalid {
                field: "expand_fraction",
                message: format!("must be a finite value >= 0, got {}", self.expand_fraction),
            });
        }

        let r = self.default_view_range;
        if ![r.min_x, r.min_y, r.max_x, r.max_y]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(ConfigError::Invalid {
                field: "default_view_range",
                message: "all corners must be finite".to_string(),
            });
        }

        if !self.user_location.fallback().is_valid() {
            return Err(ConfigError::Invalid {
                field: "user_location",
                message: format!(
                    "({}, {}) is not a valid coordinate",
                    self.user_location.latitude, self.user_location.longitude
                ),
            });
        }

        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            message: format!("must be a finite value > 0, got {value}"),
        })
    }
}

fn finite(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            message: format!("must be finite, got {value}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use issue_map_issue_models::IssueType;

    use super::*;

    #[test]
    fn bundled_defaults_match_default_impl() {
        let parsed = HeatmapConfig::from_toml_str(DEFAULT_CONFIG_TOML).unwrap();
        assert_eq!(parsed, HeatmapConfig::default());
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(
            HeatmapConfig::from_toml_str("").unwrap(),
            HeatmapConfig::default()
        );
    }

    #[test]
    fn partial_tables_fill_in_defaults() {
        let config = HeatmapConfig::from_toml_str(
            r#"
            mode = "weighted"
            filter = "road"

            [user_location]
            marker_size = 4.0

            [generator]
            kind = "cross"
            seed = 7
            "#,
        )
        .unwrap();

        assert_eq!(config.mode, HeatmapMode::Weighted);
        assert_eq!(config.filter, IssueTypeFilter::Only(IssueType::Road));
        assert_eq!(config.user_location.marker_size, 4.0);
        assert_eq!(config.user_location.latitude, 50.0);
        assert_eq!(config.generator.kind, GeneratorKind::Cross);
        assert_eq!(config.generator.count, 100);
        assert_eq!(config.generator.seed, Some(7));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            HeatmapConfig::from_toml_str("spread = 1.0"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn out_of_domain_values_are_rejected() {
        for (toml_str, field) in [
            ("spread_factor = 0.0", "spread_factor"),
            ("expand_fraction = -0.5", "expand_fraction"),
            ("[user_location]\nlatitude = 120.0", "user_location"),
            ("[user_location]\nspread_factor = -2.0", "user_location.spread_factor"),
        ] {
            match HeatmapConfig::from_toml_str(toml_str) {
                Err(ConfigError::Invalid { field: f, .. }) => assert_eq!(f, field, "{toml_str}"),
                other => panic!("{toml_str}: expected Invalid, got {other:?}"),
            }
        }
    }

    #[test]
    fn mode_names_round_trip_through_strum() {
        assert_eq!("generator".parse::<HeatmapMode>().unwrap(), HeatmapMode::Generator);
        assert_eq!(HeatmapMode::Weighted.to_string(), "weighted");
    }
}
