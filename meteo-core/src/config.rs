use anyhow::{Context, Result, anyhow, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    export::{ExportFormat, default_file_name},
    model::{Coordinates, ForecastRequest, Location},
};

/// Location the forecast is fetched for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub id: i64,
    pub name: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub population: u64,
    /// IANA timezone name, e.g. "Europe/Paris".
    pub timezone: String,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            id: 2972315,
            name: "Toulouse".to_string(),
            country: "FR".to_string(),
            latitude: 43.6047,
            longitude: 1.4442,
            population: 471941,
            timezone: "Europe/Paris".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub default_format: ExportFormat,
    /// File name used when the user does not give one; the extension is added.
    pub default_stem: String,
    /// Directory relative file names are resolved against. Current directory if unset.
    pub directory: Option<PathBuf>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            default_format: ExportFormat::Json,
            default_stem: "meteo_toulouse_export".to_string(),
            directory: None,
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// forecast_days = 7
/// page_size = 10
///
/// [location]
/// name = "Toulouse"
/// latitude = 43.6047
/// ...
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub forecast_days: u8,
    /// Upper bound on hourly records kept from one fetch.
    pub max_records: usize,
    /// Rows per page in the interactive viewer.
    pub page_size: usize,
    /// Override for the forecast endpoint, mostly for testing against a local server.
    pub provider_url: Option<String>,
    pub location: LocationConfig,
    pub export: ExportConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            forecast_days: 7,
            max_records: 40,
            page_size: 10,
            provider_url: None,
            location: LocationConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

impl Config {
    /// Load config from disk, or return the defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, use defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        cfg.validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "meteo", "meteo-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        let loc = &self.location;
        if !(-90.0..=90.0).contains(&loc.latitude) {
            bail!("Latitude {} is out of range (-90..=90)", loc.latitude);
        }
        if !(-180.0..=180.0).contains(&loc.longitude) {
            bail!("Longitude {} is out of range (-180..=180)", loc.longitude);
        }
        if !(1..=16).contains(&self.forecast_days) {
            bail!("forecast_days must be between 1 and 16, got {}", self.forecast_days);
        }
        if self.max_records == 0 {
            bail!("max_records must be at least 1");
        }
        if self.page_size == 0 {
            bail!("page_size must be at least 1");
        }
        Ok(())
    }

    /// Request for the configured location. Offset and sun times are filled in by the provider.
    pub fn forecast_request(&self) -> ForecastRequest {
        let loc = &self.location;
        ForecastRequest {
            location: Location {
                id: loc.id,
                name: loc.name.clone(),
                country: loc.country.clone(),
                coordinates: Coordinates {
                    latitude: loc.latitude,
                    longitude: loc.longitude,
                },
                population: loc.population,
                timezone: loc.timezone.clone(),
                timezone_offset: 0,
                sunrise: 0,
                sunset: 0,
            },
            timezone: loc.timezone.clone(),
            forecast_days: self.forecast_days,
            max_records: self.max_records,
        }
    }

    /// Where an export named `name` (or the default stem) in `format` should go.
    pub fn export_path(&self, name: Option<&str>, format: ExportFormat) -> PathBuf {
        let stem = name
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(self.export.default_stem.as_str());
        let file = PathBuf::from(default_file_name(stem, format));

        match &self.export.directory {
            Some(dir) if file.is_relative() => dir.join(file),
            _ => file,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_targets_toulouse() {
        let cfg = Config::default();
        assert_eq!(cfg.location.name, "Toulouse");
        assert_eq!(cfg.forecast_days, 7);
        assert_eq!(cfg.max_records, 40);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.location.name = "Lyon".into();
        cfg.location.latitude = 45.764;
        cfg.export.default_format = ExportFormat::Csv;
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "page_size = 5\n\n[export]\ndefault_format = \"csv\"\n").unwrap();

        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.page_size, 5);
        assert_eq!(cfg.export.default_format, ExportFormat::Csv);
        assert_eq!(cfg.export.default_stem, "meteo_toulouse_export");
        assert_eq!(cfg.location, LocationConfig::default());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut cfg = Config::default();
        cfg.forecast_days = 30;
        assert!(cfg.validate().unwrap_err().to_string().contains("forecast_days"));

        let mut cfg = Config::default();
        cfg.location.latitude = 91.0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.page_size = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn forecast_request_copies_location() {
        let req = Config::default().forecast_request();
        assert_eq!(req.location.coordinates.latitude, 43.6047);
        assert_eq!(req.timezone, "Europe/Paris");
        assert_eq!(req.max_records, 40);
    }

    #[test]
    fn export_path_uses_default_stem_and_directory() {
        let mut cfg = Config::default();
        assert_eq!(
            cfg.export_path(None, ExportFormat::Json),
            PathBuf::from("meteo_toulouse_export.json")
        );
        assert_eq!(
            cfg.export_path(Some("  "), ExportFormat::Csv),
            PathBuf::from("meteo_toulouse_export.csv")
        );

        cfg.export.directory = Some(PathBuf::from("out"));
        assert_eq!(
            cfg.export_path(Some("rainy"), ExportFormat::Csv),
            PathBuf::from("out").join("rainy.csv")
        );
    }
}
