//! Synthetic heatmap around a single-point forecast.
//!
//! This is cosmetic spatial interpolation for map shading. The forecast
//! has exactly one value per day for the whole location; the grid spreads
//! that value outwards with a distance fade and a deterministic ripple so
//! the layer does not render as a flat square. None of the variation
//! between cells is a modelled gradient and it must not be read as
//! geospatial signal.

use crate::error::{ClimaError, Result};
use crate::models::{BoundingBox, ForecastSeries, HeatmapSample, RiskMetric};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapSettings {
    /// N in the (2N+1)² grid
    pub grid_radius: u32,
    /// Angular spacing between grid points in degrees
    pub step_deg: f64,
    /// Fraction of intensity lost at the grid corner
    pub distance_falloff: f64,
    pub ripple_frequency: f64,
    pub ripple_amplitude: f64,
    pub bounds: BoundingBox,
}

impl Default for HeatmapSettings {
    fn default() -> Self {
        Self {
            grid_radius: 5,
            step_deg: 0.3,
            distance_falloff: 0.3,
            ripple_frequency: 10.0,
            ripple_amplitude: 0.05,
            bounds: BoundingBox::MAHARASHTRA,
        }
    }
}

impl HeatmapSettings {
    pub fn validate(&self) -> Result<()> {
        if !(self.step_deg.is_finite() && self.step_deg > 0.0) {
            return Err(ClimaError::Config(format!(
                "heatmap.step_deg must be positive, got {}",
                self.step_deg
            )));
        }
        if self.grid_radius > 50 {
            return Err(ClimaError::Config(format!(
                "heatmap.grid_radius {} is too large (max 50)",
                self.grid_radius
            )));
        }
        self.bounds.validate()
    }
}

pub struct SpatialHeatmapProjector {
    settings: HeatmapSettings,
}

impl SpatialHeatmapProjector {
    pub fn new(settings: HeatmapSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &HeatmapSettings {
        &self.settings
    }

    /// Expand one day's metric into grid samples around the series
    /// location. Output order is row-major from the south-west corner and
    /// identical for identical inputs.
    pub fn project(
        &self,
        series: &ForecastSeries,
        day_index: usize,
        metric: RiskMetric,
    ) -> Result<Vec<HeatmapSample>> {
        let day = series.day(day_index).ok_or_else(|| {
            ClimaError::InvalidInput(format!(
                "day index {} outside forecast of {} days",
                day_index,
                series.len()
            ))
        })?;

        let Some(base) = normalized_intensity(day.metric(metric), metric) else {
            tracing::debug!(date = %day.date, %metric, "no data for heatmap");
            return Ok(Vec::new());
        };

        let s = &self.settings;
        let center = series.location();
        let n = s.grid_radius as i64;
        let max_distance = (n as f64 * s.step_deg) * std::f64::consts::SQRT_2;

        let mut samples = Vec::with_capacity(((2 * n + 1) * (2 * n + 1)) as usize);
        for i in -n..=n {
            for j in -n..=n {
                let latitude = center.latitude + i as f64 * s.step_deg;
                let longitude = center.longitude + j as f64 * s.step_deg;
                if !s.bounds.contains(latitude, longitude) {
                    continue;
                }

                let distance = (latitude - center.latitude).hypot(longitude - center.longitude);
                let fade = if max_distance > 0.0 {
                    1.0 - s.distance_falloff * distance / max_distance
                } else {
                    1.0
                };
                let ripple = (latitude * s.ripple_frequency).sin()
                    * (longitude * s.ripple_frequency).cos()
                    * s.ripple_amplitude;

                samples.push(HeatmapSample {
                    latitude,
                    longitude,
                    intensity: (base * fade + ripple).clamp(0.0, 1.0),
                });
            }
        }

        Ok(samples)
    }
}

impl Default for SpatialHeatmapProjector {
    fn default() -> Self {
        Self::new(HeatmapSettings::default())
    }
}

/// Metric value mapped to [0, 1] where 1 is worst. `None` for missing data.
pub fn normalized_intensity(value: f64, metric: RiskMetric) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }
    let v = (value / 100.0).clamp(0.0, 1.0);
    Some(if metric.is_inverted() { 1.0 - v } else { v })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::forecast::fixtures::*;

    #[test]
    fn projection_is_deterministic() {
        let series = ten_day_series();
        let projector = SpatialHeatmapProjector::default();
        let a = projector.project(&series, 3, RiskMetric::RainRisk).unwrap();
        let b = projector.project(&series, 3, RiskMetric::RainRisk).unwrap();
        assert!(!a.is_empty());
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.latitude.to_bits(), y.latitude.to_bits());
            assert_eq!(x.longitude.to_bits(), y.longitude.to_bits());
            assert_eq!(x.intensity.to_bits(), y.intensity.to_bits());
        }
    }

    #[test]
    fn full_grid_inside_bounds() {
        // Pune at ±1.5° stays inside the Maharashtra box
        let series = ten_day_series();
        let samples = SpatialHeatmapProjector::default()
            .project(&series, 0, RiskMetric::TempExtreme)
            .unwrap();
        assert_eq!(samples.len(), 11 * 11);
    }

    #[test]
    fn points_outside_bounds_are_dropped() {
        let settings = HeatmapSettings {
            bounds: BoundingBox {
                lat_min: 18.0,
                lat_max: 19.0,
                lon_min: 73.0,
                lon_max: 74.0,
            },
            ..HeatmapSettings::default()
        };
        let series = ten_day_series();
        let samples = SpatialHeatmapProjector::new(settings.clone())
            .project(&series, 0, RiskMetric::RainRisk)
            .unwrap();
        assert!(!samples.is_empty());
        assert!(samples.len() < 121);
        assert!(samples
            .iter()
            .all(|s| settings.bounds.contains(s.latitude, s.longitude)));
    }

    #[test]
    fn intensities_stay_in_unit_range_for_adversarial_scores() {
        let projector = SpatialHeatmapProjector::default();
        for score in [-500.0, -1.0, 0.0, 50.0, 100.0, 101.0, 1e9] {
            let series = series(vec![day(0, score, score, score, 0.9)]);
            for metric in RiskMetric::ALL {
                let samples = projector.project(&series, 0, metric).unwrap();
                assert!(samples
                    .iter()
                    .all(|s| (0.0..=1.0).contains(&s.intensity)));
            }
        }
    }

    #[test]
    fn missing_metric_produces_no_samples() {
        let series = series(vec![day(0, f64::NAN, 10.0, 10.0, 0.9)]);
        let samples = SpatialHeatmapProjector::default()
            .project(&series, 0, RiskMetric::RainRisk)
            .unwrap();
        assert!(samples.is_empty());
    }

    #[test]
    fn day_index_out_of_range_is_rejected() {
        let series = ten_day_series();
        let err = SpatialHeatmapProjector::default()
            .project(&series, 10, RiskMetric::RainRisk)
            .unwrap_err();
        assert!(matches!(err, ClimaError::InvalidInput(_)));
    }

    #[test]
    fn soil_moisture_is_inverted() {
        assert_eq!(
            normalized_intensity(80.0, RiskMetric::SoilMoistureProxy),
            Some(1.0 - 0.8)
        );
        assert_eq!(normalized_intensity(80.0, RiskMetric::RainRisk), Some(0.8));
        assert_eq!(normalized_intensity(f64::NAN, RiskMetric::RainRisk), None);
    }

    #[test]
    fn center_is_brighter_than_corner_without_ripple() {
        let settings = HeatmapSettings {
            ripple_amplitude: 0.0,
            ..HeatmapSettings::default()
        };
        let series = series(vec![day(0, 80.0, 0.0, 0.0, 0.9)]);
        let samples = SpatialHeatmapProjector::new(settings)
            .project(&series, 0, RiskMetric::RainRisk)
            .unwrap();
        let center = samples[samples.len() / 2];
        let corner = samples[0];
        assert!((center.intensity - 0.8).abs() < 1e-12);
        assert!((corner.intensity - 0.8 * 0.7).abs() < 1e-9);
    }
}
