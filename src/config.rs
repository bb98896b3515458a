//! TOML configuration for the converter.
//!
//! Every field has a default; a missing or unreadable config file falls
//! back to defaults rather than failing, since configuration here only
//! shapes an interactive tool.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::exporter::ExportOptions;
use crate::importer::ImportOptions;
use crate::library_index::DuplicatePolicy;
use crate::transform::{AngleUnit, CoordinateTransform, UpAxis};

#[derive(Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Apply the coordinate conversion at all. Off means raw passthrough.
    pub apply: bool,
    /// Source map units to scene units on import; export uses the inverse.
    pub scale_factor: f32,
    pub up_axis: UpAxis,
    pub angle_unit: AngleUnit,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        // Legacy tooling defaults: centimetre-scale maps, Z-up, radians.
        Self {
            apply: true,
            scale_factor: 0.01,
            up_axis: UpAxis::Z,
            angle_unit: AngleUnit::Radians,
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
pub struct Config {
    pub prop_libraries_dir: PathBuf,
    pub duplicate_policy: DuplicatePolicy,
    pub cache_models: bool,
    pub conversion: ConversionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prop_libraries_dir: PathBuf::new(),
            duplicate_policy: DuplicatePolicy::LastWins,
            cache_models: true,
            conversion: ConversionConfig::default(),
        }
    }
}

impl Config {
    fn transform(&self) -> CoordinateTransform {
        CoordinateTransform {
            scale_factor: self.conversion.scale_factor,
            up_axis: self.conversion.up_axis,
            angle_unit: self.conversion.angle_unit,
        }
    }

    pub fn import_options(&self) -> ImportOptions {
        ImportOptions {
            prop_libraries_dir: self.prop_libraries_dir.clone(),
            apply_coordinate_conversion: self.conversion.apply,
            transform: self.transform(),
            duplicate_policy: self.duplicate_policy,
            cache_models: self.cache_models,
        }
    }

    pub fn export_options(&self) -> ExportOptions {
        // The transform's to_source_* direction already inverts the scale,
        // so import and export share one configuration and cannot disagree.
        ExportOptions {
            apply_coordinate_conversion: self.conversion.apply,
            transform: self.transform(),
        }
    }
}

pub fn load_config(path: &Path) -> Config {
    let toml_str = match std::fs::read_to_string(path) {
        Ok(toml_str) => toml_str,
        Err(error) => {
            log::warn!(
                "failed to load configuration from {}: {error}, using defaults",
                path.display()
            );
            return Config::default();
        }
    };

    match toml::from_str(&toml_str) {
        Ok(config) => {
            log::info!("read configuration from {}", path.display());
            config
        }
        Err(error) => {
            log::warn!(
                "failed to parse configuration from {}: {error}, using defaults",
                path.display()
            );
            Config::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_legacy_tooling() {
        let config = Config::default();
        assert!(config.conversion.apply);
        assert_eq!(config.conversion.scale_factor, 0.01);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::LastWins);
        assert!(config.cache_models);
    }

    #[test]
    fn test_partial_config_parses() {
        let config: Config = toml::from_str(
            r#"
            prop_libraries_dir = "/maps/libraries"
            duplicate_policy = "first-wins"

            [conversion]
            up_axis = "y"
            angle_unit = "degrees"
            "#,
        )
        .unwrap();

        assert_eq!(config.prop_libraries_dir, PathBuf::from("/maps/libraries"));
        assert_eq!(config.duplicate_policy, DuplicatePolicy::FirstWins);
        assert_eq!(config.conversion.up_axis, UpAxis::Y);
        assert_eq!(config.conversion.angle_unit, AngleUnit::Degrees);
        // Unspecified fields keep their defaults.
        assert_eq!(config.conversion.scale_factor, 0.01);
        assert!(config.cache_models);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = load_config(Path::new("/nonexistent/converter.toml"));
        assert_eq!(config.prop_libraries_dir, PathBuf::new());
    }
}
