pub mod forecast_api;
pub mod openweathermap;

pub use forecast_api::ForecastApiClient;
pub use openweathermap::OpenWeatherMapClient;

use crate::config::{Config, ProviderKind};
use crate::error::{ClimaError, Result};
use crate::logic::metrics::AgriculturalMetrics;
use crate::models::{AdvisoryFilters, Crop, ForecastSeries, GeoPoint, MAX_HORIZON_DAYS};

/// What to fetch. Crop only matters to providers that derive risk
/// scores locally.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastRequest {
    pub point: GeoPoint,
    pub horizon_days: u32,
    pub crop: Crop,
}

impl ForecastRequest {
    /// The request the configured filters imply
    pub fn from_config(config: &Config, filters: &AdvisoryFilters) -> Self {
        Self {
            point: config.query_point(filters),
            horizon_days: config.forecast.horizon_days,
            crop: filters.crop,
        }
    }

    /// Rejects bad coordinates and horizons before anything touches the
    /// network.
    pub fn validate(&self) -> Result<()> {
        self.point.validate()?;
        if !(1..=MAX_HORIZON_DAYS).contains(&self.horizon_days) {
            return Err(ClimaError::InvalidInput(format!(
                "horizon of {} days outside 1..={}",
                self.horizon_days, MAX_HORIZON_DAYS
            )));
        }
        Ok(())
    }
}

/// Upstream forecast providers
pub enum ForecastSource {
    Api(ForecastApiClient),
    OpenWeatherMap(OpenWeatherMapClient),
}

impl ForecastSource {
    pub fn from_config(config: &Config) -> Result<Self> {
        let timeout = config.forecast.timeout();
        match config.forecast.provider {
            ProviderKind::Graphcast => {
                tracing::info!(url = %config.forecast.url, "using forecast service");
                Ok(Self::Api(ForecastApiClient::new(
                    config.forecast.url.clone(),
                    timeout,
                )?))
            }
            ProviderKind::OpenWeatherMap => {
                let owm = config
                    .openweathermap
                    .as_ref()
                    .filter(|c| c.enabled && !c.api_key.is_empty())
                    .ok_or_else(|| {
                        ClimaError::Config("OpenWeatherMap is not configured".into())
                    })?;
                tracing::info!("using OpenWeatherMap with locally derived risk scores");
                let metrics = AgriculturalMetrics::new(config.thresholds.clone());
                Ok(Self::OpenWeatherMap(OpenWeatherMapClient::new(
                    owm.clone(),
                    metrics,
                    timeout,
                )?))
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Api(_) => "forecast service",
            Self::OpenWeatherMap(_) => "OpenWeatherMap",
        }
    }

    pub async fn fetch(&self, request: &ForecastRequest) -> Result<ForecastSeries> {
        request.validate()?;
        match self {
            Self::Api(client) => client.fetch_forecast(request).await,
            Self::OpenWeatherMap(client) => client.fetch_forecast(request).await,
        }
    }

    pub async fn test_connection(&self, request: &ForecastRequest) -> Result<bool> {
        request.validate()?;
        match self {
            Self::Api(client) => client.test_connection(request).await,
            Self::OpenWeatherMap(client) => client.test_connection(request).await,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_server {
    use axum::Router;
    use serde_json::{json, Value};

    /// Serve `router` on an ephemeral local port and return its base URL
    pub async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    /// A well-formed forecast service response of `days` days from
    /// 2024-06-01. Odd days leave out wind speed.
    pub fn forecast_payload(days: usize) -> Value {
        let forecast: Vec<Value> = (0..days)
            .map(|i| {
                let mut raw = json!({
                    "precipitation_mm": 2.0 * i as f64,
                    "temp_max_c": 31.0,
                    "temp_min_c": 21.0,
                    "humidity_percent": 70.0
                });
                if i % 2 == 0 {
                    raw["wind_speed_ms"] = json!(3.5);
                }
                json!({
                    "date": format!("2024-06-{:02}", i + 1),
                    "rain_risk": 10.0 + 5.0 * i as f64,
                    "temp_extreme": 20.0,
                    "soil_moisture_proxy": 55.0,
                    "confidence_score": 0.95 - 0.04 * i as f64,
                    "raw_data": raw,
                })
            })
            .collect();

        json!({
            "location": { "latitude": 18.5204, "longitude": 73.8567, "region": "Pune, Maharashtra" },
            "forecast": forecast,
            "metadata": {
                "model_version": "graphcast-test",
                "generated_at": "2024-06-01T00:00:00Z",
                "cache_hit": true,
                "inference_time_ms": 1234.0
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_validation() {
        let ok = ForecastRequest {
            point: GeoPoint::new(18.5, 73.8),
            horizon_days: 10,
            crop: Crop::Rice,
        };
        assert!(ok.validate().is_ok());

        let too_long = ForecastRequest {
            horizon_days: 11,
            ..ok
        };
        assert!(matches!(
            too_long.validate(),
            Err(ClimaError::InvalidInput(_))
        ));

        let zero = ForecastRequest {
            horizon_days: 0,
            ..ok
        };
        assert!(zero.validate().is_err());

        let off_planet = ForecastRequest {
            point: GeoPoint::new(95.0, 73.8),
            ..ok
        };
        assert!(matches!(
            off_planet.validate(),
            Err(ClimaError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn invalid_request_never_reaches_network() {
        // Nothing listens on the discard port; validation must fail first
        let source = ForecastSource::Api(
            ForecastApiClient::new("http://127.0.0.1:9/forecast", std::time::Duration::from_secs(1))
                .unwrap(),
        );
        let request = ForecastRequest {
            point: GeoPoint::new(f64::NAN, 73.8),
            horizon_days: 5,
            crop: Crop::Rice,
        };
        let err = source.fetch(&request).await.unwrap_err();
        assert!(matches!(err, ClimaError::InvalidInput(_)));
    }
}
