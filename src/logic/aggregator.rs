use crate::error::{ClimaError, Result};
use crate::logic::rules::RulesEngine;
use crate::models::{
    Advisory, AdvisoryFilters, ForecastSeries, MetricSummary, MoistureLevel, RiskLevel,
    RiskSummary, YieldEstimate, YieldFactors,
};

pub const DEFAULT_WINDOW_DAYS: usize = 7;

/// Half-width of the reported yield range, as a fraction of the estimate
const YIELD_SPREAD: f64 = 0.10;

/// Turns a forecast series into an advisory. Holds no per-call state, so
/// repeated calls on the same series give identical output.
pub struct RiskAggregator {
    engine: RulesEngine,
}

impl RiskAggregator {
    pub fn new() -> Self {
        Self {
            engine: RulesEngine::new(),
        }
    }

    pub fn summarize(
        &self,
        series: &ForecastSeries,
        window_days: usize,
        filters: &AdvisoryFilters,
    ) -> Result<Advisory> {
        let risk = summarize_risk(series, window_days)?;
        let factors = yield_factors(&risk);
        let yield_estimate = estimate_yield(filters, &factors);

        let mut recommendations: Vec<String> = self
            .engine
            .evaluate(&risk, filters)
            .into_iter()
            .inspect(|rec| {
                tracing::trace!(rule = rec.rule_id, severity = rec.severity.as_str(), "rule matched")
            })
            .flat_map(|rec| rec.actions)
            .collect();
        recommendations.extend(context_lines(filters));

        tracing::debug!(
            window = risk.window_days,
            rain = ?risk.rain_risk.level,
            temp = ?risk.temp_extreme.level,
            moisture = ?risk.moisture_level,
            predicted = yield_estimate.predicted,
            "advisory computed"
        );

        Ok(Advisory {
            filters: *filters,
            summary: summary_text(&risk, filters, &yield_estimate),
            recommendations,
            yield_estimate,
            factors,
            risk,
        })
    }
}

impl Default for RiskAggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// Window statistics over the first `window_days` entries of the series.
pub fn summarize_risk(series: &ForecastSeries, window_days: usize) -> Result<RiskSummary> {
    if window_days == 0 {
        return Err(ClimaError::InvalidInput(
            "aggregation window must be at least one day".into(),
        ));
    }
    if series.is_empty() {
        return Err(ClimaError::EmptySeries);
    }

    let used = window_days.min(series.len());
    let days = &series.days()[..used];

    let enforced = series.enforced_confidence();
    let window_confidence: Vec<f64> = enforced[..used].iter().flatten().copied().collect();
    let confidence_adjusted = days
        .iter()
        .zip(&enforced[..used])
        .any(|(day, fixed)| match fixed {
            Some(c) => day.confidence_score.clamp(0.0, 1.0) != *c,
            None => false,
        });
    if confidence_adjusted {
        tracing::debug!(
            region = %series.location().region,
            "confidence capped at running minimum"
        );
    }

    let soil_moisture = metric_summary(days.iter().map(|d| d.soil_moisture_proxy));
    let temps: Vec<f64> = days
        .iter()
        .filter_map(|d| d.raw_weather.temp_mean_c())
        .collect();

    Ok(RiskSummary {
        requested_window: window_days,
        window_days: used,
        reduced_window: used < window_days,
        rain_risk: metric_summary(days.iter().map(|d| d.rain_risk)),
        temp_extreme: metric_summary(days.iter().map(|d| d.temp_extreme)),
        moisture_level: soil_moisture.mean.and_then(MoistureLevel::from_proxy),
        soil_moisture,
        mean_confidence: mean(&window_confidence),
        confidence_adjusted,
        total_precipitation_mm: days
            .iter()
            .map(|d| d.raw_weather.precipitation_mm)
            .filter(|p| p.is_finite())
            .sum(),
        mean_temperature_c: mean(&temps),
    })
}

/// Mean of finite scores after clamping to [0, 100]
fn metric_summary(values: impl Iterator<Item = f64>) -> MetricSummary {
    let clamped: Vec<f64> = values
        .filter(|v| v.is_finite())
        .map(|v| v.clamp(0.0, 100.0))
        .collect();
    let mean = mean(&clamped);
    MetricSummary {
        mean,
        level: mean.and_then(RiskLevel::from_score),
        samples: clamped.len(),
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

pub fn rain_factor(level: Option<RiskLevel>) -> f64 {
    match level {
        None | Some(RiskLevel::Low) => 1.0,
        Some(RiskLevel::Moderate) => 0.90,
        Some(RiskLevel::High) => 0.80,
    }
}

pub fn temperature_factor(level: Option<RiskLevel>) -> f64 {
    match level {
        None | Some(RiskLevel::Low) => 1.0,
        Some(RiskLevel::Moderate) => 0.90,
        Some(RiskLevel::High) => 0.85,
    }
}

pub fn moisture_factor(level: Option<MoistureLevel>) -> f64 {
    match level {
        None | Some(MoistureLevel::Optimal) => 1.0,
        Some(MoistureLevel::Saturated) => 0.90,
        Some(MoistureLevel::Dry) => 0.85,
    }
}

pub fn yield_factors(risk: &RiskSummary) -> YieldFactors {
    YieldFactors {
        rain: rain_factor(risk.rain_risk.level),
        temperature: temperature_factor(risk.temp_extreme.level),
        moisture: moisture_factor(risk.moisture_level),
    }
}

pub fn estimate_yield(filters: &AdvisoryFilters, factors: &YieldFactors) -> YieldEstimate {
    let predicted = filters.crop.base_yield_t_per_ha() * factors.product();
    YieldEstimate {
        predicted,
        low: predicted * (1.0 - YIELD_SPREAD),
        high: predicted * (1.0 + YIELD_SPREAD),
        unit: "t/ha".into(),
    }
}

fn context_lines(filters: &AdvisoryFilters) -> Vec<String> {
    vec![
        format!(
            "Consult the Maharashtra Agricultural Department for {} district guidance",
            filters.region
        ),
        format!("Review best practices specific to {} cultivation", filters.crop),
        format!(
            "Consider seasonal factors for {} when implementing changes",
            filters.season
        ),
    ]
}

fn describe(summary: &MetricSummary) -> String {
    match (summary.level, summary.mean) {
        (Some(level), Some(mean)) => format!("{} ({:.0}/100)", level, mean),
        _ => "no data".into(),
    }
}

fn summary_text(risk: &RiskSummary, filters: &AdvisoryFilters, estimate: &YieldEstimate) -> String {
    let moisture = match (risk.moisture_level, risk.soil_moisture.mean) {
        (Some(level), Some(mean)) => format!("{} ({:.0}%)", level.as_str(), mean),
        _ => "no data".into(),
    };
    let temperature = risk
        .mean_temperature_c
        .map(|t| format!(", mean {:.1}°C", t))
        .unwrap_or_default();

    let mut text = format!(
        "{}-day outlook for {} in {} ({}): rain risk {}, temperature extremes {}, soil moisture {}. \
         {:.1} mm expected{}. Estimated yield {:.2} {} ({:.2}-{:.2}).",
        risk.window_days,
        filters.crop,
        filters.region,
        filters.season,
        describe(&risk.rain_risk),
        describe(&risk.temp_extreme),
        moisture,
        risk.total_precipitation_mm,
        temperature,
        estimate.predicted,
        estimate.unit,
        estimate.low,
        estimate.high,
    );
    if risk.reduced_window {
        text.push_str(&format!(
            " Based on {} of {} requested days; confidence reduced.",
            risk.window_days, risk.requested_window
        ));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::forecast::fixtures::*;

    fn two_day_example() -> ForecastSeries {
        series(vec![
            with_precip(day(0, 20.0, 25.0, 70.0, 0.9), 5.0),
            with_precip(day(1, 80.0, 25.0, 30.0, 0.7), 30.0),
        ])
    }

    #[test]
    fn two_day_example_scenario() {
        let advisory = RiskAggregator::new()
            .summarize(&two_day_example(), 2, &AdvisoryFilters::default())
            .unwrap();
        let risk = &advisory.risk;

        assert_eq!(risk.rain_risk.mean, Some(50.0));
        assert_eq!(risk.rain_risk.level, Some(RiskLevel::Moderate));
        assert_eq!(risk.temp_extreme.level, Some(RiskLevel::Low));
        assert_eq!(risk.soil_moisture.mean, Some(50.0));
        assert_eq!(risk.moisture_level, Some(MoistureLevel::Optimal));
        assert_eq!(risk.total_precipitation_mm, 35.0);
        assert!((risk.mean_confidence.unwrap() - 0.8).abs() < 1e-12);
        assert!(!risk.reduced_window);

        // one moderate bucket, two favorable
        assert_eq!(advisory.factors.rain, 0.90);
        assert_eq!(advisory.factors.temperature, 1.0);
        assert_eq!(advisory.factors.moisture, 1.0);

        let y = &advisory.yield_estimate;
        assert!((y.predicted - 2.8 * 0.9).abs() < 1e-9);
        assert!((y.low - y.predicted * 0.9).abs() < 1e-9);
        assert!((y.high - y.predicted * 1.1).abs() < 1e-9);
        assert_eq!(y.unit, "t/ha");
    }

    #[test]
    fn summary_mentions_buckets_and_totals() {
        let advisory = RiskAggregator::new()
            .summarize(&two_day_example(), 2, &AdvisoryFilters::default())
            .unwrap();
        assert!(advisory.summary.starts_with("2-day outlook for Rice in Pune (Kharif)"));
        assert!(advisory.summary.contains("rain risk moderate (50/100)"));
        assert!(advisory.summary.contains("35.0 mm expected"));
        assert!(!advisory.summary.contains("confidence reduced"));
    }

    #[test]
    fn recommendations_end_with_context_lines() {
        let advisory = RiskAggregator::new()
            .summarize(&two_day_example(), 2, &AdvisoryFilters::default())
            .unwrap();
        let recs = &advisory.recommendations;
        assert!(recs[0].starts_with("Moderate rainfall risk"));
        assert_eq!(
            recs.last().unwrap(),
            "Consider seasonal factors for Kharif when implementing changes"
        );
    }

    #[test]
    fn aggregation_is_idempotent() {
        let series = ten_day_series();
        let aggregator = RiskAggregator::new();
        let filters = AdvisoryFilters::default();
        let a = aggregator.summarize(&series, 7, &filters).unwrap();
        let b = aggregator.summarize(&series, 7, &filters).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn short_series_uses_all_days_and_notes_it() {
        let advisory = RiskAggregator::new()
            .summarize(&two_day_example(), DEFAULT_WINDOW_DAYS, &AdvisoryFilters::default())
            .unwrap();
        assert!(advisory.risk.reduced_window);
        assert_eq!(advisory.risk.window_days, 2);
        assert_eq!(advisory.risk.requested_window, 7);
        assert!(advisory.summary.contains("Based on 2 of 7 requested days"));
        assert!(advisory
            .recommendations
            .iter()
            .any(|r| r.starts_with("Only 2 of 7")));
    }

    #[test]
    fn window_limits_days_used() {
        let risk = summarize_risk(&ten_day_series(), 7).unwrap();
        assert_eq!(risk.window_days, 7);
        assert_eq!(risk.rain_risk.samples, 7);
        // precipitation 0, 2.5, ... 15.0
        assert!((risk.total_precipitation_mm - 52.5).abs() < 1e-9);
    }

    #[test]
    fn empty_series_is_an_error() {
        let empty = series(vec![]);
        let err = RiskAggregator::new()
            .summarize(&empty, 7, &AdvisoryFilters::default())
            .unwrap_err();
        assert!(matches!(err, ClimaError::EmptySeries));
    }

    #[test]
    fn zero_window_is_invalid() {
        let err = summarize_risk(&ten_day_series(), 0).unwrap_err();
        assert!(matches!(err, ClimaError::InvalidInput(_)));
    }

    #[test]
    fn adversarial_scores_are_clamped_and_missing_excluded() {
        let s = series(vec![
            day(0, 250.0, -30.0, f64::NAN, 0.9),
            day(1, f64::NAN, f64::INFINITY, f64::NAN, 0.8),
        ]);
        let risk = summarize_risk(&s, 7).unwrap();
        assert_eq!(risk.rain_risk.mean, Some(100.0));
        assert_eq!(risk.rain_risk.samples, 1);
        assert_eq!(risk.temp_extreme.mean, Some(0.0));
        assert_eq!(risk.soil_moisture.mean, None);
        assert_eq!(risk.moisture_level, None);

        let factors = yield_factors(&risk);
        assert_eq!(factors.moisture, 1.0);
        assert!(factors.product() > 0.0 && factors.product() <= 1.0);
    }

    #[test]
    fn rising_confidence_is_capped() {
        let s = series(vec![
            day(0, 10.0, 10.0, 50.0, 0.8),
            day(1, 10.0, 10.0, 50.0, 0.9),
        ]);
        let risk = summarize_risk(&s, 2).unwrap();
        assert!(risk.confidence_adjusted);
        assert!((risk.mean_confidence.unwrap() - 0.8).abs() < 1e-12);

        let fine = summarize_risk(&ten_day_series(), 7).unwrap();
        assert!(!fine.confidence_adjusted);
    }

    #[test]
    fn factors_stay_in_unit_interval() {
        for level in [None, Some(RiskLevel::Low), Some(RiskLevel::Moderate), Some(RiskLevel::High)] {
            for f in [rain_factor(level), temperature_factor(level)] {
                assert!(f > 0.0 && f <= 1.0);
            }
        }
        for level in [None, Some(MoistureLevel::Dry), Some(MoistureLevel::Saturated)] {
            let f = moisture_factor(level);
            assert!(f > 0.0 && f <= 1.0);
        }
    }
}
