use super::ForecastRequest;
use crate::config::OpenWeatherMapConfig;
use crate::error::{ClimaError, Result};
use crate::logic::metrics::AgriculturalMetrics;
use crate::models::forecast::{ForecastMetadata, ForecastSeries, Location, RawWeather};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

const API_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// The 5-day/3-hour endpoint never covers more than this
pub const MAX_DAYS: u32 = 5;

const MODEL_VERSION: &str = "openweathermap-2.5";

pub struct OpenWeatherMapClient {
    client: reqwest::Client,
    config: OpenWeatherMapConfig,
    metrics: AgriculturalMetrics,
    base_url: String,
    timeout: Duration,
}

// OpenWeatherMap API response structures
#[derive(Debug, Deserialize)]
struct OwmForecastResponse {
    list: Vec<OwmForecastItem>,
    city: OwmCity,
}

#[derive(Debug, Deserialize)]
struct OwmForecastItem {
    dt: i64,
    main: OwmMain,
    #[serde(default)]
    wind: Option<OwmWind>,
    #[serde(default)]
    rain: Option<OwmPrecipitation>,
    #[serde(default)]
    snow: Option<OwmPrecipitation>,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwmPrecipitation {
    #[serde(rename = "3h", default)]
    three_hour: f64,
}

#[derive(Debug, Deserialize)]
struct OwmCity {
    name: String,
    #[serde(default)]
    country: String,
    coord: OwmCoord,
}

#[derive(Debug, Deserialize)]
struct OwmCoord {
    lat: f64,
    lon: f64,
}

/// One 3-hour slot in metric units
#[derive(Debug, Clone)]
struct Slot {
    temp_c: f64,
    humidity_percent: f64,
    precipitation_mm: f64,
    wind_speed_ms: Option<f64>,
}

impl OpenWeatherMapClient {
    pub fn new(
        config: OpenWeatherMapConfig,
        metrics: AgriculturalMetrics,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClimaError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            config,
            metrics,
            base_url: API_BASE_URL.to_string(),
            timeout,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetch the 5-day/3-hour forecast and derive daily risk scores from it
    pub async fn fetch_forecast(&self, request: &ForecastRequest) -> Result<ForecastSeries> {
        let url = format!(
            "{}/forecast?lat={}&lon={}&appid={}&units=metric",
            self.base_url, request.point.latitude, request.point.longitude, self.config.api_key
        );

        let started = Instant::now();
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClimaError::ForecastUnavailable(format!(
                "OpenWeatherMap returned {}: {}",
                status, body
            )));
        }

        let text = response.text().await.map_err(|e| self.transport_error(e))?;
        let owm_response: OwmForecastResponse = serde_json::from_str(&text).map_err(|e| {
            ClimaError::ForecastUnavailable(format!(
                "Failed to parse OpenWeatherMap response: {}",
                e
            ))
        })?;

        let horizon = request.horizon_days.min(MAX_DAYS);
        if horizon < request.horizon_days {
            tracing::debug!(
                requested = request.horizon_days,
                served = horizon,
                "OpenWeatherMap horizon capped"
            );
        }

        self.convert_response(owm_response, request, horizon, started.elapsed())
            .map_err(|e| match e {
                ClimaError::InvalidInput(msg) => {
                    ClimaError::ForecastUnavailable(format!("Malformed OpenWeatherMap data: {}", msg))
                }
                other => other,
            })
    }

    /// Test connection to OpenWeatherMap API
    pub async fn test_connection(&self, request: &ForecastRequest) -> Result<bool> {
        let url = format!(
            "{}/weather?lat={}&lon={}&appid={}&units=metric",
            self.base_url, request.point.latitude, request.point.longitude, self.config.api_key
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        Ok(response.status().is_success())
    }

    fn transport_error(&self, e: reqwest::Error) -> ClimaError {
        if e.is_timeout() {
            ClimaError::ForecastTimeout(self.timeout)
        } else {
            ClimaError::ForecastUnavailable(format!("OpenWeatherMap: {}", e))
        }
    }

    fn convert_response(
        &self,
        response: OwmForecastResponse,
        request: &ForecastRequest,
        horizon: u32,
        elapsed: Duration,
    ) -> Result<ForecastSeries> {
        let region = if response.city.country.is_empty() {
            response.city.name
        } else {
            format!("{}, {}", response.city.name, response.city.country)
        };
        let location = Location {
            latitude: response.city.coord.lat,
            longitude: response.city.coord.lon,
            region,
        };

        let weather: Vec<(NaiveDate, RawWeather)> = aggregate_daily(&response.list)
            .into_iter()
            .take(horizon as usize)
            .collect();
        let days = self.metrics.derive_days(weather, request.crop);

        let metadata = ForecastMetadata {
            model_version: MODEL_VERSION.to_string(),
            generated_at: Utc::now(),
            cache_hit: false,
            inference_time_ms: elapsed.as_millis() as u64,
        };

        ForecastSeries::new(location, days, metadata)
    }
}

fn convert_item(item: &OwmForecastItem) -> Option<(NaiveDate, Slot)> {
    let Some(timestamp) = DateTime::from_timestamp(item.dt, 0) else {
        tracing::warn!(dt = item.dt, "skipping forecast slot with invalid timestamp");
        return None;
    };

    // Combine rain and snow precipitation
    let rain_mm = item.rain.as_ref().map(|r| r.three_hour).unwrap_or(0.0);
    let snow_mm = item.snow.as_ref().map(|s| s.three_hour).unwrap_or(0.0);

    Some((
        timestamp.date_naive(),
        Slot {
            temp_c: item.main.temp,
            humidity_percent: item.main.humidity,
            precipitation_mm: rain_mm + snow_mm,
            wind_speed_ms: item.wind.as_ref().map(|w| w.speed),
        },
    ))
}

/// Group 3-hour slots by UTC date, in date order
fn aggregate_daily(items: &[OwmForecastItem]) -> Vec<(NaiveDate, RawWeather)> {
    let mut by_date: BTreeMap<NaiveDate, Vec<Slot>> = BTreeMap::new();
    for (date, slot) in items.iter().filter_map(convert_item) {
        by_date.entry(date).or_default().push(slot);
    }

    by_date
        .into_iter()
        .map(|(date, slots)| (date, aggregate_day(&slots)))
        .collect()
}

fn aggregate_day(slots: &[Slot]) -> RawWeather {
    let count = slots.len().max(1) as f64;

    let temp_max_c = slots
        .iter()
        .map(|s| s.temp_c)
        .fold(f64::NEG_INFINITY, f64::max);
    let temp_min_c = slots.iter().map(|s| s.temp_c).fold(f64::INFINITY, f64::min);

    let winds: Vec<f64> = slots.iter().filter_map(|s| s.wind_speed_ms).collect();
    let wind_speed_ms = if winds.is_empty() {
        None
    } else {
        Some(winds.iter().sum::<f64>() / winds.len() as f64)
    };

    RawWeather {
        precipitation_mm: slots.iter().map(|s| s.precipitation_mm).sum(),
        temp_max_c,
        temp_min_c,
        humidity_percent: slots.iter().map(|s| s.humidity_percent).sum::<f64>() / count,
        wind_speed_ms,
    }
}
