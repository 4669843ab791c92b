use super::ForecastRequest;
use crate::error::{ClimaError, Result};
use crate::models::forecast::{ForecastDay, ForecastMetadata, ForecastSeries, Location, RawWeather};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Client for the forecast service's `POST /forecast` endpoint
pub struct ForecastApiClient {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct ForecastApiRequest {
    latitude: f64,
    longitude: f64,
    forecast_days: u32,
}

// Forecast service response structures
#[derive(Debug, Deserialize)]
struct ApiResponse {
    location: ApiLocation,
    forecast: Vec<ApiDay>,
    metadata: ApiMetadata,
}

#[derive(Debug, Deserialize)]
struct ApiLocation {
    latitude: f64,
    longitude: f64,
    region: String,
}

#[derive(Debug, Deserialize)]
struct ApiDay {
    date: String,
    rain_risk: f64,
    temp_extreme: f64,
    soil_moisture_proxy: f64,
    confidence_score: f64,
    raw_data: ApiRawData,
}

#[derive(Debug, Deserialize)]
struct ApiRawData {
    precipitation_mm: f64,
    temp_max_c: f64,
    temp_min_c: f64,
    humidity_percent: f64,
    #[serde(default)]
    wind_speed_ms: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ApiMetadata {
    model_version: String,
    generated_at: String,
    cache_hit: bool,
    inference_time_ms: f64,
}

impl ForecastApiClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClimaError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch and validate a forecast. Days past the requested horizon are
    /// dropped; any schema violation rejects the whole response.
    pub async fn fetch_forecast(&self, request: &ForecastRequest) -> Result<ForecastSeries> {
        let body = ForecastApiRequest {
            latitude: request.point.latitude,
            longitude: request.point.longitude,
            forecast_days: request.horizon_days,
        };

        tracing::debug!(url = %self.url, point = %request.point, days = request.horizon_days, "requesting forecast");

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClimaError::ForecastUnavailable(format!(
                "Forecast service returned {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let text = response.text().await.map_err(|e| self.transport_error(e))?;
        let parsed: ApiResponse = serde_json::from_str(&text).map_err(|e| {
            ClimaError::ForecastUnavailable(format!("Failed to parse forecast response: {}", e))
        })?;

        let series = convert_response(parsed, request.horizon_days).map_err(|e| match e {
            ClimaError::InvalidInput(msg) => {
                ClimaError::ForecastUnavailable(format!("Malformed forecast: {}", msg))
            }
            other => other,
        })?;

        if !series.confidence_is_non_increasing() {
            tracing::warn!(
                url = %self.url,
                "forecast confidence rises with lead time; advisories cap it at the running minimum"
            );
        }
        Ok(series)
    }

    /// Test connection to the forecast service with a one-day request
    pub async fn test_connection(&self, request: &ForecastRequest) -> Result<bool> {
        let probe = ForecastRequest {
            horizon_days: 1,
            ..*request
        };
        match self.fetch_forecast(&probe).await {
            Ok(_) => Ok(true),
            Err(ClimaError::ForecastUnavailable(msg)) => {
                tracing::debug!("forecast service probe failed: {}", msg);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn transport_error(&self, e: reqwest::Error) -> ClimaError {
        if e.is_timeout() {
            ClimaError::ForecastTimeout(self.timeout)
        } else {
            ClimaError::ForecastUnavailable(format!("Forecast service: {}", e))
        }
    }
}

fn convert_response(response: ApiResponse, horizon_days: u32) -> Result<ForecastSeries> {
    let location = Location {
        latitude: response.location.latitude,
        longitude: response.location.longitude,
        region: response.location.region,
    };

    let mut days = response
        .forecast
        .into_iter()
        .map(convert_day)
        .collect::<Result<Vec<_>>>()?;
    days.sort_by_key(|d| d.date);
    if days.len() > horizon_days as usize {
        tracing::debug!(
            received = days.len(),
            horizon = horizon_days,
            "truncating forecast to requested horizon"
        );
        days.truncate(horizon_days as usize);
    }

    let metadata = ForecastMetadata {
        model_version: response.metadata.model_version,
        generated_at: parse_timestamp(&response.metadata.generated_at)?,
        cache_hit: response.metadata.cache_hit,
        inference_time_ms: response.metadata.inference_time_ms.max(0.0).round() as u64,
    };

    ForecastSeries::new(location, days, metadata)
}

fn convert_day(day: ApiDay) -> Result<ForecastDay> {
    Ok(ForecastDay {
        date: parse_date(&day.date)?,
        rain_risk: day.rain_risk,
        temp_extreme: day.temp_extreme,
        soil_moisture_proxy: day.soil_moisture_proxy,
        confidence_score: day.confidence_score,
        raw_weather: RawWeather {
            precipitation_mm: day.raw_data.precipitation_mm,
            temp_max_c: day.raw_data.temp_max_c,
            temp_min_c: day.raw_data.temp_min_c,
            humidity_percent: day.raw_data.humidity_percent,
            wind_speed_ms: day.raw_data.wind_speed_ms,
        },
    })
}

/// Accepts `2024-06-01` or any date-time form `parse_timestamp` accepts
fn parse_date(s: &str) -> Result<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }
    parse_timestamp(s)
        .map(|ts| ts.date_naive())
        .map_err(|_| ClimaError::InvalidInput(format!("unparsable date '{}'", s)))
}

/// RFC 3339, naive ISO-8601 date-time (taken as UTC), or a bare date
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ClimaError::InvalidInput(format!("unparsable timestamp '{}'", s)))
}
