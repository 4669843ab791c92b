use crate::error::{ClimaError, Result};
use crate::logic::heatmap::HeatmapSettings;
use crate::logic::metrics::AgriculturalThresholds;
use crate::models::{AdvisoryFilters, GeoPoint, MAX_HORIZON_DAYS};
use dialoguer::{Input, Select};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub filters: FiltersConfig,
    #[serde(default)]
    pub location: Option<LocationConfig>,
    pub forecast: ForecastConfig,
    #[serde(default)]
    pub openweathermap: Option<OpenWeatherMapConfig>,
    #[serde(default)]
    pub heatmap: HeatmapSettings,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub thresholds: AgriculturalThresholds,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FiltersConfig {
    pub region: String,
    pub crop: String,
    pub season: String,
}

/// Fixed query point; without it the region's reference point is used.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LocationConfig {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Graphcast,
    OpenWeatherMap,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ForecastConfig {
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default = "default_forecast_url")]
    pub url: String,
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_forecast_url() -> String {
    "http://localhost:8000/forecast".into()
}

fn default_horizon_days() -> u32 {
    MAX_HORIZON_DAYS
}

fn default_timeout_secs() -> u64 {
    15
}

impl ForecastConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Clone, Deserialize, Serialize)]
pub struct OpenWeatherMapConfig {
    pub api_key: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl std::fmt::Debug for OpenWeatherMapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenWeatherMapConfig")
            .field("api_key", &"[REDACTED]")
            .field("enabled", &self.enabled)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ExportConfig {
    pub dir: Option<PathBuf>,
}

impl Config {
    pub fn load(config_override: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_override {
            Some(p) => p,
            None => Self::find_config_path()?,
        };

        if !config_path.exists() {
            return Err(ClimaError::Config(format!(
                "Config file not found at {:?}. Run `climasense init` to set up.",
                config_path
            )));
        }

        let config_str = std::fs::read_to_string(&config_path)
            .map_err(|e| ClimaError::Config(format!("Failed to read config: {}", e)))?;

        Self::parse(&config_str)
    }

    /// Parse YAML after `${VAR}` substitution and validate the values that
    /// cannot be checked by serde alone.
    pub fn parse(content: &str) -> Result<Self> {
        let content = Self::substitute_env_vars(content);

        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ClimaError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.filters()?;
        if let Some(ref loc) = self.location {
            GeoPoint::new(loc.latitude, loc.longitude).validate()?;
        }
        if !(1..=MAX_HORIZON_DAYS).contains(&self.forecast.horizon_days) {
            return Err(ClimaError::Config(format!(
                "forecast.horizon_days must be between 1 and {}",
                MAX_HORIZON_DAYS
            )));
        }
        if self.forecast.provider == ProviderKind::OpenWeatherMap
            && !self
                .openweathermap
                .as_ref()
                .is_some_and(|c| c.enabled && !c.api_key.is_empty())
        {
            return Err(ClimaError::Config(
                "provider 'openweathermap' needs an enabled openweathermap.api_key".into(),
            ));
        }
        self.heatmap.validate()?;
        self.thresholds.validate()?;
        Ok(())
    }

    pub fn filters(&self) -> Result<AdvisoryFilters> {
        AdvisoryFilters::parse(
            &self.filters.region,
            &self.filters.crop,
            &self.filters.season,
        )
    }

    /// Where to query the forecast for the given filters.
    pub fn query_point(&self, filters: &AdvisoryFilters) -> GeoPoint {
        match self.location {
            Some(ref loc) => GeoPoint::new(loc.latitude, loc.longitude),
            None => filters.region.reference_point(),
        }
    }

    /// Search for config.yaml in standard locations.
    /// Returns the path of the first found config, or the XDG default path if none found.
    fn find_config_path() -> Result<PathBuf> {
        let local_config = PathBuf::from("config/config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        Self::default_config_path()
    }

    /// Returns true if a config file can be found in any standard location.
    pub fn exists(config_override: Option<&PathBuf>) -> bool {
        match config_override {
            Some(p) => p.exists(),
            None => Self::find_config_path()
                .map(|p| p.exists())
                .unwrap_or(false),
        }
    }

    /// Default path for writing new config files (~/.config/climasense/config.yaml).
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ClimaError::Config("Cannot determine config directory".into()))?
            .join("climasense");
        Ok(config_dir.join("config.yaml"))
    }

    /// Run interactive setup prompts and write config to disk.
    /// Returns the loaded Config and the path it was written to.
    pub fn setup_interactive() -> Result<(Self, PathBuf)> {
        use crate::models::{Crop, Region, Season};

        println!();
        println!("Let's set up ClimaSense!");
        println!();

        println!("Advisory filters");
        let regions: Vec<&str> = Region::ALL.iter().map(|r| r.as_str()).collect();
        let region = Select::new()
            .with_prompt("  Region")
            .items(&regions)
            .default(0)
            .interact()
            .map_err(|e| ClimaError::Config(format!("Input error: {}", e)))?;

        let crops: Vec<&str> = Crop::ALL.iter().map(|c| c.as_str()).collect();
        let crop = Select::new()
            .with_prompt("  Crop")
            .items(&crops)
            .default(0)
            .interact()
            .map_err(|e| ClimaError::Config(format!("Input error: {}", e)))?;

        let seasons: Vec<&str> = Season::ALL.iter().map(|s| s.as_str()).collect();
        let season = Select::new()
            .with_prompt("  Season")
            .items(&seasons)
            .default(0)
            .interact()
            .map_err(|e| ClimaError::Config(format!("Input error: {}", e)))?;

        println!();

        println!("Forecast service");
        let url: String = Input::new()
            .with_prompt("  Forecast endpoint")
            .default(default_forecast_url())
            .interact_text()
            .map_err(|e| ClimaError::Config(format!("Input error: {}", e)))?;

        let timeout_secs: u64 = Input::new()
            .with_prompt("  Request timeout (seconds)")
            .default(default_timeout_secs())
            .interact_text()
            .map_err(|e| ClimaError::Config(format!("Input error: {}", e)))?;

        println!();

        println!("OpenWeatherMap fallback (leave API key blank to skip)");
        let owm_api_key: String = Input::new()
            .with_prompt("  API key")
            .default(String::new())
            .allow_empty(true)
            .interact_text()
            .map_err(|e| ClimaError::Config(format!("Input error: {}", e)))?;

        let openweathermap = (!owm_api_key.is_empty()).then(|| OpenWeatherMapConfig {
            api_key: owm_api_key,
            enabled: true,
        });

        println!();

        let config = Config {
            filters: FiltersConfig {
                region: regions[region].into(),
                crop: crops[crop].into(),
                season: seasons[season].into(),
            },
            location: None,
            forecast: ForecastConfig {
                provider: ProviderKind::Graphcast,
                url,
                horizon_days: default_horizon_days(),
                timeout_secs,
            },
            openweathermap,
            heatmap: HeatmapSettings::default(),
            export: ExportConfig::default(),
            thresholds: AgriculturalThresholds::default(),
        };

        let config_path = Self::default_config_path()?;
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let yaml = serde_yaml::to_string(&config)
            .map_err(|e| ClimaError::Config(format!("Failed to serialize config: {}", e)))?;

        let content = format!(
            "# ClimaSense Configuration\n# Generated by `climasense init`\n# Environment variable substitution (${{VAR}}) is supported.\n\n{}",
            yaml
        );
        std::fs::write(&config_path, content)?;

        println!("Configuration saved to {}", config_path.display());
        println!();

        Ok((config, config_path))
    }

    fn substitute_env_vars(content: &str) -> String {
        let mut result = content.to_string();

        // Find all ${VAR_NAME} patterns and substitute
        let re = match regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}") {
            Ok(re) => re,
            Err(_) => return result,
        };

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let placeholder = &cap[0];
            if let Ok(value) = std::env::var(var_name) {
                result = result.replace(placeholder, &value);
            }
        }

        result
    }

    /// Directory CSV exports are written to.
    pub fn export_dir(&self, dir_override: Option<&PathBuf>) -> Result<PathBuf> {
        // CLI override takes priority
        if let Some(dir) = dir_override {
            return Ok(dir.clone());
        }

        if let Ok(dir) = std::env::var("CLIMASENSE_EXPORT_DIR") {
            return Ok(PathBuf::from(dir));
        }

        if let Some(ref dir) = self.export.dir {
            return Ok(dir.clone());
        }

        dirs::download_dir()
            .or_else(|| dirs::data_dir().map(|d| d.join("climasense").join("exports")))
            .ok_or_else(|| ClimaError::Config("Cannot determine export directory".into()))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            filters: FiltersConfig {
                region: "Pune".into(),
                crop: "Rice".into(),
                season: "Kharif".into(),
            },
            location: None,
            forecast: ForecastConfig {
                provider: ProviderKind::Graphcast,
                url: default_forecast_url(),
                horizon_days: default_horizon_days(),
                timeout_secs: default_timeout_secs(),
            },
            openweathermap: None,
            heatmap: HeatmapSettings::default(),
            export: ExportConfig::default(),
            thresholds: AgriculturalThresholds::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Crop, Region, Season};

    const MINIMAL: &str = r#"
filters:
  region: Nashik
  crop: wheat
  season: rabi
forecast:
  url: http://127.0.0.1:9000/forecast
"#;

    #[test]
    fn minimal_config_fills_defaults() {
        let config = Config::parse(MINIMAL).unwrap();
        assert_eq!(config.forecast.provider, ProviderKind::Graphcast);
        assert_eq!(config.forecast.horizon_days, 10);
        assert_eq!(config.forecast.timeout(), Duration::from_secs(15));
        assert_eq!(config.heatmap.grid_radius, 5);

        let filters = config.filters().unwrap();
        assert_eq!(filters.region, Region::Nashik);
        assert_eq!(filters.crop, Crop::Wheat);
        assert_eq!(filters.season, Season::Rabi);
        assert_eq!(config.query_point(&filters), Region::Nashik.reference_point());
    }

    #[test]
    fn explicit_location_overrides_region() {
        let yaml = format!("{}location:\n  latitude: 19.1\n  longitude: 74.2\n", MINIMAL);
        let config = Config::parse(&yaml).unwrap();
        let filters = config.filters().unwrap();
        assert_eq!(config.query_point(&filters), GeoPoint::new(19.1, 74.2));
    }

    #[test]
    fn unknown_crop_is_rejected() {
        let yaml = MINIMAL.replace("wheat", "barley");
        assert!(matches!(
            Config::parse(&yaml),
            Err(ClimaError::InvalidInput(_))
        ));
    }

    #[test]
    fn horizon_beyond_provider_maximum_is_rejected() {
        let yaml = format!("{}  horizon_days: 14\n", MINIMAL);
        assert!(matches!(Config::parse(&yaml), Err(ClimaError::Config(_))));
    }

    #[test]
    fn openweathermap_provider_needs_key() {
        let yaml = format!("{}  provider: openweathermap\n", MINIMAL);
        assert!(matches!(Config::parse(&yaml), Err(ClimaError::Config(_))));

        let yaml = format!(
            "{}  provider: openweathermap\nopenweathermap:\n  api_key: abc\n",
            MINIMAL
        );
        assert!(Config::parse(&yaml).is_ok());
    }

    #[test]
    fn partial_threshold_override_keeps_other_defaults() {
        let yaml = format!("{}thresholds:\n  soil:\n    field_capacity: 90.0\n", MINIMAL);
        let config = Config::parse(&yaml).unwrap();
        assert_eq!(config.thresholds.soil.field_capacity, 90.0);
        assert_eq!(config.thresholds.soil.initial_moisture, 50.0);
        assert_eq!(config.thresholds.rainfall.moderate_mm, 25.0);
    }

    #[test]
    fn inverted_soil_bounds_are_rejected() {
        let yaml = format!(
            "{}thresholds:\n  soil:\n    field_capacity: 40.0\n    wilting_point: 60.0\n",
            MINIMAL
        );
        assert!(matches!(Config::parse(&yaml), Err(ClimaError::Config(_))));
    }

    #[test]
    fn zero_divisor_thresholds_are_rejected() {
        for section in [
            "  rainfall:\n    low_mm: 25.0\n    moderate_mm: 25.0\n",
            "  rainfall:\n    flash_flood_mm_per_hour: 0.0\n",
            "  rainfall:\n    high_cumulative_mm: 0.0\n",
            "  temperature:\n    deviation_c: 0.0\n",
        ] {
            let yaml = format!("{}thresholds:\n{}", MINIMAL, section);
            assert!(
                matches!(Config::parse(&yaml), Err(ClimaError::Config(_))),
                "accepted {}",
                section
            );
        }
    }

    #[test]
    fn env_vars_are_substituted() {
        std::env::set_var("CLIMASENSE_TEST_FORECAST_HOST", "10.0.0.5");
        let out = Config::substitute_env_vars("url: http://${CLIMASENSE_TEST_FORECAST_HOST}/f");
        assert_eq!(out, "url: http://10.0.0.5/f");

        let untouched = Config::substitute_env_vars("key: ${CLIMASENSE_TEST_UNSET_VAR}");
        assert_eq!(untouched, "key: ${CLIMASENSE_TEST_UNSET_VAR}");
    }

    #[test]
    fn api_key_is_redacted_in_debug() {
        let owm = OpenWeatherMapConfig {
            api_key: "secret".into(),
            enabled: true,
        };
        assert!(!format!("{:?}", owm).contains("secret"));
    }
}
