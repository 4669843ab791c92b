//! Derives the per-day risk scores from raw daily weather.
//!
//! Used for providers that only deliver weather (OpenWeatherMap), so their
//! series carry the same scores as the forecast service would compute.

use crate::error::{ClimaError, Result};
use crate::models::{Crop, ForecastDay, RawWeather};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgriculturalThresholds {
    pub rainfall: RainfallThresholds,
    pub temperature: TemperatureThresholds,
    pub soil: SoilThresholds,
    pub confidence: ConfidenceThresholds,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RainfallThresholds {
    pub low_mm: f64,
    pub moderate_mm: f64,
    pub flash_flood_mm_per_hour: f64,
    pub cumulative_window_days: usize,
    pub high_cumulative_mm: f64,
}

impl Default for RainfallThresholds {
    fn default() -> Self {
        Self {
            low_mm: 5.0,
            moderate_mm: 25.0,
            flash_flood_mm_per_hour: 10.0,
            cumulative_window_days: 7,
            high_cumulative_mm: 100.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemperatureThresholds {
    pub deviation_c: f64,
    pub extreme_heat_c: f64,
    pub extreme_cold_c: f64,
}

impl Default for TemperatureThresholds {
    fn default() -> Self {
        Self {
            deviation_c: 5.0,
            extreme_heat_c: 40.0,
            extreme_cold_c: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SoilThresholds {
    pub field_capacity: f64,
    pub wilting_point: f64,
    pub initial_moisture: f64,
    pub et_base_mm: f64,
    pub et_temp_coefficient: f64,
    pub drainage_coefficient: f64,
    pub precipitation_efficiency: f64,
}

impl Default for SoilThresholds {
    fn default() -> Self {
        Self {
            field_capacity: 100.0,
            wilting_point: 0.0,
            initial_moisture: 50.0,
            et_base_mm: 5.0,
            et_temp_coefficient: 0.15,
            drainage_coefficient: 0.1,
            precipitation_efficiency: 0.8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceThresholds {
    pub base: f64,
    pub decay_rate: f64,
    pub floor: f64,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            base: 0.95,
            decay_rate: 0.05,
            floor: 0.5,
        }
    }
}

fn invalid(field: &str, reason: &str) -> ClimaError {
    ClimaError::Config(format!("thresholds.{} {}", field, reason))
}

fn finite(field: &str, v: f64) -> Result<f64> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(invalid(field, "must be a finite number"))
    }
}

fn positive(field: &str, v: f64) -> Result<()> {
    if finite(field, v)? > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, "must be greater than zero"))
    }
}

impl AgriculturalThresholds {
    /// Reject values that would divide by zero or invert a range in the
    /// score formulas.
    pub fn validate(&self) -> Result<()> {
        let r = &self.rainfall;
        if finite("rainfall.low_mm", r.low_mm)? < 0.0 {
            return Err(invalid("rainfall.low_mm", "must not be negative"));
        }
        if finite("rainfall.moderate_mm", r.moderate_mm)? <= r.low_mm {
            return Err(invalid("rainfall.moderate_mm", "must be above rainfall.low_mm"));
        }
        positive("rainfall.flash_flood_mm_per_hour", r.flash_flood_mm_per_hour)?;
        positive("rainfall.high_cumulative_mm", r.high_cumulative_mm)?;
        if r.cumulative_window_days == 0 {
            return Err(invalid("rainfall.cumulative_window_days", "must be at least 1"));
        }

        let t = &self.temperature;
        positive("temperature.deviation_c", t.deviation_c)?;
        finite("temperature.extreme_heat_c", t.extreme_heat_c)?;
        finite("temperature.extreme_cold_c", t.extreme_cold_c)?;

        let s = &self.soil;
        let wilting = finite("soil.wilting_point", s.wilting_point)?;
        if finite("soil.field_capacity", s.field_capacity)? <= wilting {
            return Err(invalid("soil.field_capacity", "must be above soil.wilting_point"));
        }
        finite("soil.initial_moisture", s.initial_moisture)?;
        for (field, v) in [
            ("soil.et_base_mm", s.et_base_mm),
            ("soil.et_temp_coefficient", s.et_temp_coefficient),
            ("soil.drainage_coefficient", s.drainage_coefficient),
            ("soil.precipitation_efficiency", s.precipitation_efficiency),
        ] {
            if finite(field, v)? < 0.0 {
                return Err(invalid(field, "must not be negative"));
            }
        }

        let c = &self.confidence;
        for (field, v) in [("confidence.base", c.base), ("confidence.floor", c.floor)] {
            if !(0.0..=1.0).contains(&finite(field, v)?) {
                return Err(invalid(field, "must be between 0 and 1"));
            }
        }
        if finite("confidence.decay_rate", c.decay_rate)? < 0.0 {
            return Err(invalid("confidence.decay_rate", "must not be negative"));
        }
        Ok(())
    }
}

pub struct AgriculturalMetrics {
    thresholds: AgriculturalThresholds,
}

impl AgriculturalMetrics {
    pub fn new(thresholds: AgriculturalThresholds) -> Self {
        Self { thresholds }
    }

    /// Rainfall risk (0-100) per day: daily amount (0-40), rolling
    /// cumulative total (0-30) and intensity over the day (0-30).
    pub fn rainfall_risk(&self, precipitation_mm: &[f64]) -> Vec<f64> {
        let t = &self.thresholds.rainfall;
        let window = t.cumulative_window_days.max(1);

        precipitation_mm
            .iter()
            .enumerate()
            .map(|(i, &daily)| {
                let daily = daily.max(0.0);
                let start = (i + 1).saturating_sub(window);
                let cumulative: f64 = precipitation_mm[start..=i].iter().map(|p| p.max(0.0)).sum();
                let intensity = daily / 24.0;

                let daily_risk = if daily < t.low_mm {
                    0.0
                } else if daily < t.moderate_mm {
                    20.0 * (daily - t.low_mm) / (t.moderate_mm - t.low_mm)
                } else {
                    20.0 + (20.0_f64).min((daily - t.moderate_mm) / 2.0)
                };

                let cumulative_risk = (30.0 * cumulative / t.high_cumulative_mm).min(30.0);

                let intensity_risk = if intensity >= t.flash_flood_mm_per_hour {
                    (15.0 + (intensity - t.flash_flood_mm_per_hour)).min(30.0)
                } else {
                    15.0 * intensity / t.flash_flood_mm_per_hour
                };

                (daily_risk + cumulative_risk + intensity_risk).clamp(0.0, 100.0)
            })
            .collect()
    }

    /// Temperature extreme risk (0-100) from deviation outside the crop's
    /// optimal band, plus flat penalties for extreme heat and cold.
    pub fn temperature_risk(&self, weather: &[RawWeather], crop: Crop) -> Vec<f64> {
        let t = &self.thresholds.temperature;
        let (optimal_min, optimal_max) = crop.optimal_temp_c();

        let deviation_risk = |deviation: f64| {
            if deviation <= t.deviation_c {
                10.0 * deviation / t.deviation_c
            } else {
                10.0 + (40.0_f64).min(4.0 * (deviation - t.deviation_c))
            }
        };

        weather
            .iter()
            .map(|w| {
                let above = (w.temp_max_c - optimal_max).max(0.0);
                let below = (optimal_min - w.temp_min_c).max(0.0);

                let mut risk = deviation_risk(above) + deviation_risk(below);
                if w.temp_max_c >= t.extreme_heat_c {
                    risk += 20.0;
                }
                if w.temp_min_c <= t.extreme_cold_c {
                    risk += 20.0;
                }
                risk.clamp(0.0, 100.0)
            })
            .collect()
    }

    /// Bucket water balance: infiltrated rain minus evapotranspiration,
    /// with partial drainage above field capacity.
    pub fn soil_moisture(&self, weather: &[RawWeather]) -> Vec<f64> {
        let s = &self.thresholds.soil;
        let mut moisture = s.initial_moisture;

        weather
            .iter()
            .map(|w| {
                let temp = w.temp_mean_c().unwrap_or(25.0);
                let humidity = if w.humidity_percent.is_finite() {
                    w.humidity_percent
                } else {
                    50.0
                };
                let et = self.evapotranspiration(temp, humidity);

                moisture += w.precipitation_mm.max(0.0) * s.precipitation_efficiency - et;
                if moisture > s.field_capacity {
                    let excess = moisture - s.field_capacity;
                    moisture -= excess * s.drainage_coefficient;
                }
                moisture = moisture.max(s.wilting_point).min(s.field_capacity);
                moisture
            })
            .collect()
    }

    /// Simplified Hargreaves ET in mm/day
    pub fn evapotranspiration(&self, temp_mean_c: f64, humidity_percent: f64) -> f64 {
        let s = &self.thresholds.soil;
        let temp_effect = (1.0 + s.et_temp_coefficient * (temp_mean_c - 25.0)).max(0.1);
        let humidity_factor = (1.0 - humidity_percent / 200.0).clamp(0.5, 1.0);
        (s.et_base_mm * temp_effect * humidity_factor).max(0.0)
    }

    /// Confidence for the 1-based forecast day; exponential decay to a floor.
    pub fn confidence(&self, forecast_day: u32) -> f64 {
        let c = &self.thresholds.confidence;
        let steps = forecast_day.saturating_sub(1) as f64;
        (c.base * (-c.decay_rate * steps).exp())
            .max(c.floor)
            .clamp(0.0, 1.0)
    }

    /// Full days for a chronologically ordered run of raw weather.
    pub fn derive_days(&self, weather: Vec<(NaiveDate, RawWeather)>, crop: Crop) -> Vec<ForecastDay> {
        let raw: Vec<RawWeather> = weather.iter().map(|(_, w)| w.clone()).collect();
        let precipitation: Vec<f64> = raw.iter().map(|w| w.precipitation_mm).collect();

        let rain = self.rainfall_risk(&precipitation);
        let temp = self.temperature_risk(&raw, crop);
        let moisture = self.soil_moisture(&raw);

        weather
            .into_iter()
            .enumerate()
            .map(|(i, (date, raw_weather))| ForecastDay {
                date,
                rain_risk: rain[i],
                temp_extreme: temp[i],
                soil_moisture_proxy: moisture[i],
                confidence_score: self.confidence(i as u32 + 1),
                raw_weather,
            })
            .collect()
    }
}

impl Default for AgriculturalMetrics {
    fn default() -> Self {
        Self::new(AgriculturalThresholds::default())
    }
}
