use crate::error::{ClimaError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Longest horizon any upstream provider will serve.
pub const MAX_HORIZON_DAYS: u32 = 10;

/// A query coordinate in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ClimaError::InvalidInput(format!(
                "latitude {} outside [-90, 90]",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ClimaError::InvalidInput(format!(
                "longitude {} outside [-180, 180]",
                self.longitude
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}°N, {:.4}°E", self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub region: String,
}

impl Location {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastMetadata {
    pub model_version: String,
    pub generated_at: DateTime<Utc>,
    pub cache_hit: bool,
    pub inference_time_ms: u64,
}

/// Raw daily weather behind the derived scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawWeather {
    pub precipitation_mm: f64,
    pub temp_max_c: f64,
    pub temp_min_c: f64,
    pub humidity_percent: f64,
    pub wind_speed_ms: Option<f64>,
}

impl RawWeather {
    pub fn temp_mean_c(&self) -> Option<f64> {
        let mean = (self.temp_max_c + self.temp_min_c) / 2.0;
        mean.is_finite().then_some(mean)
    }

    fn validate(&self, date: NaiveDate) -> Result<()> {
        if self.precipitation_mm < 0.0 {
            return Err(ClimaError::InvalidInput(format!(
                "{}: negative precipitation {}",
                date, self.precipitation_mm
            )));
        }
        if self.temp_max_c < self.temp_min_c {
            return Err(ClimaError::InvalidInput(format!(
                "{}: temp_max_c {} below temp_min_c {}",
                date, self.temp_max_c, self.temp_min_c
            )));
        }
        if !(0.0..=100.0).contains(&self.humidity_percent) && self.humidity_percent.is_finite() {
            return Err(ClimaError::InvalidInput(format!(
                "{}: humidity {}% outside [0, 100]",
                date, self.humidity_percent
            )));
        }
        if matches!(self.wind_speed_ms, Some(w) if w < 0.0) {
            return Err(ClimaError::InvalidInput(format!(
                "{}: negative wind speed",
                date
            )));
        }
        Ok(())
    }
}

/// One calendar day of the forecast horizon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub rain_risk: f64,           // 0-100
    pub temp_extreme: f64,        // 0-100
    pub soil_moisture_proxy: f64, // 0-100, low moisture = risk
    pub confidence_score: f64,    // 0-1
    pub raw_weather: RawWeather,
}

impl ForecastDay {
    pub fn metric(&self, metric: RiskMetric) -> f64 {
        match metric {
            RiskMetric::RainRisk => self.rain_risk,
            RiskMetric::TempExtreme => self.temp_extreme,
            RiskMetric::SoilMoistureProxy => self.soil_moisture_proxy,
        }
    }
}

/// The three derived per-day risk scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskMetric {
    RainRisk,
    TempExtreme,
    SoilMoistureProxy,
}

impl RiskMetric {
    pub const ALL: [RiskMetric; 3] = [
        RiskMetric::RainRisk,
        RiskMetric::TempExtreme,
        RiskMetric::SoilMoistureProxy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskMetric::RainRisk => "Rain Risk",
            RiskMetric::TempExtreme => "Temp Extreme",
            RiskMetric::SoilMoistureProxy => "Soil Moisture",
        }
    }

    /// Soil moisture reads the other way round: dry soil is the risk.
    pub fn is_inverted(&self) -> bool {
        matches!(self, RiskMetric::SoilMoistureProxy)
    }

    pub fn next(&self) -> Self {
        match self {
            RiskMetric::RainRisk => RiskMetric::TempExtreme,
            RiskMetric::TempExtreme => RiskMetric::SoilMoistureProxy,
            RiskMetric::SoilMoistureProxy => RiskMetric::RainRisk,
        }
    }
}

impl std::fmt::Display for RiskMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RiskMetric {
    type Err = ClimaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "rain" | "rain_risk" | "rainrisk" => Ok(RiskMetric::RainRisk),
            "temp" | "temp_extreme" | "tempextreme" | "temperature" => {
                Ok(RiskMetric::TempExtreme)
            }
            "moisture" | "soil" | "soil_moisture" | "soil_moisture_proxy" => {
                Ok(RiskMetric::SoilMoistureProxy)
            }
            other => Err(ClimaError::InvalidInput(format!(
                "unknown metric '{}' (expected rain, temp or moisture)",
                other
            ))),
        }
    }
}

/// An immutable forecast for one location, built in one piece from a
/// single upstream response and replaced wholesale on refetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastSeries {
    location: Location,
    days: Vec<ForecastDay>,
    metadata: ForecastMetadata,
}

impl ForecastSeries {
    /// Dates are sorted ascending; duplicates and impossible raw weather
    /// are rejected.
    pub fn new(
        location: Location,
        mut days: Vec<ForecastDay>,
        metadata: ForecastMetadata,
    ) -> Result<Self> {
        location.point().validate()?;

        days.sort_by_key(|d| d.date);
        if let Some(pair) = days.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(ClimaError::InvalidInput(format!(
                "duplicate forecast date {}",
                pair[0].date
            )));
        }
        for day in &days {
            day.raw_weather.validate(day.date)?;
        }

        Ok(Self {
            location,
            days,
            metadata,
        })
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn days(&self) -> &[ForecastDay] {
        &self.days
    }

    pub fn metadata(&self) -> &ForecastMetadata {
        &self.metadata
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn day(&self, index: usize) -> Option<&ForecastDay> {
        self.days.get(index)
    }

    pub fn position_of(&self, date: NaiveDate) -> Option<usize> {
        self.days.iter().position(|d| d.date == date)
    }

    /// True when confidence never rises with horizon distance.
    pub fn confidence_is_non_increasing(&self) -> bool {
        self.days
            .windows(2)
            .all(|w| !(w[1].confidence_score > w[0].confidence_score))
    }

    /// Confidence per day clamped to [0, 1] and forced non-increasing.
    /// Non-finite scores stay `None`.
    pub fn enforced_confidence(&self) -> Vec<Option<f64>> {
        let mut ceiling = 1.0_f64;
        self.days
            .iter()
            .map(|d| {
                if !d.confidence_score.is_finite() {
                    return None;
                }
                let c = d.confidence_score.clamp(0.0, 1.0).min(ceiling);
                ceiling = c;
                Some(c)
            })
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::TimeZone;

    pub fn location() -> Location {
        Location {
            latitude: 18.5204,
            longitude: 73.8567,
            region: "Pune, Maharashtra".into(),
        }
    }

    pub fn metadata() -> ForecastMetadata {
        ForecastMetadata {
            model_version: "graphcast-v0.1".into(),
            generated_at: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            cache_hit: false,
            inference_time_ms: 420,
        }
    }

    pub fn date(offset: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap() + chrono::Duration::days(offset as i64)
    }

    pub fn day(offset: u32, rain: f64, temp: f64, soil: f64, confidence: f64) -> ForecastDay {
        ForecastDay {
            date: date(offset),
            rain_risk: rain,
            temp_extreme: temp,
            soil_moisture_proxy: soil,
            confidence_score: confidence,
            raw_weather: RawWeather {
                precipitation_mm: 5.0,
                temp_max_c: 32.0,
                temp_min_c: 22.0,
                humidity_percent: 65.0,
                wind_speed_ms: Some(3.2),
            },
        }
    }

    pub fn with_precip(mut day: ForecastDay, precipitation_mm: f64) -> ForecastDay {
        day.raw_weather.precipitation_mm = precipitation_mm;
        day
    }

    pub fn series(days: Vec<ForecastDay>) -> ForecastSeries {
        ForecastSeries::new(location(), days, metadata()).unwrap()
    }

    /// Ten days with decaying confidence and varied scores
    pub fn ten_day_series() -> ForecastSeries {
        let days = (0..10)
            .map(|i| {
                let f = i as f64;
                let mut d = day(
                    i,
                    (15.0 + f * 7.0) % 100.0,
                    20.0 + (f * 13.0) % 50.0,
                    70.0 - f * 4.0,
                    0.95 - f * 0.04,
                );
                d.raw_weather.precipitation_mm = f * 2.5;
                d.raw_weather.temp_max_c = 30.0 + f * 0.5;
                d.raw_weather.temp_min_c = 20.0 + f * 0.25;
                d
            })
            .collect();
        series(days)
    }
}
