use super::filters::AdvisoryFilters;
use serde::{Deserialize, Serialize};

/// Bucket boundary between low and moderate risk
pub const MODERATE_THRESHOLD: f64 = 30.0;
/// Bucket boundary between moderate and high risk
pub const HIGH_THRESHOLD: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    /// `< 30` low, `30..60` moderate, `>= 60` high. Scores are clamped to
    /// [0, 100] first; non-finite scores have no level.
    pub fn from_score(score: f64) -> Option<Self> {
        if !score.is_finite() {
            return None;
        }
        let score = score.clamp(0.0, 100.0);
        Some(if score < MODERATE_THRESHOLD {
            RiskLevel::Low
        } else if score < HIGH_THRESHOLD {
            RiskLevel::Moderate
        } else {
            RiskLevel::High
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::High => "high",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Favorable",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::High => "Severe",
        }
    }

    pub fn color(&self) -> ratatui::style::Color {
        use ratatui::style::Color;
        match self {
            RiskLevel::Low => Color::Green,
            RiskLevel::Moderate => Color::Yellow,
            RiskLevel::High => Color::Red,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoistureLevel {
    Dry,
    Optimal,
    Saturated,
}

impl MoistureLevel {
    pub fn from_proxy(moisture: f64) -> Option<Self> {
        if !moisture.is_finite() {
            return None;
        }
        let moisture = moisture.clamp(0.0, 100.0);
        Some(if moisture < 30.0 {
            MoistureLevel::Dry
        } else if moisture < 80.0 {
            MoistureLevel::Optimal
        } else {
            MoistureLevel::Saturated
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MoistureLevel::Dry => "dry",
            MoistureLevel::Optimal => "optimal",
            MoistureLevel::Saturated => "saturated",
        }
    }
}

/// Mean and bucket for one score over the aggregation window
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricSummary {
    pub mean: Option<f64>,
    pub level: Option<RiskLevel>,
    pub samples: usize,
}

/// Window statistics the advisory is built from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskSummary {
    pub requested_window: usize,
    pub window_days: usize,
    pub reduced_window: bool,
    pub rain_risk: MetricSummary,
    pub temp_extreme: MetricSummary,
    pub soil_moisture: MetricSummary,
    pub moisture_level: Option<MoistureLevel>,
    pub mean_confidence: Option<f64>,
    pub confidence_adjusted: bool,
    pub total_precipitation_mm: f64,
    pub mean_temperature_c: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct YieldFactors {
    pub rain: f64,
    pub temperature: f64,
    pub moisture: f64,
}

impl YieldFactors {
    pub fn product(&self) -> f64 {
        self.rain * self.temperature * self.moisture
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YieldEstimate {
    pub predicted: f64,
    pub low: f64,
    pub high: f64,
    pub unit: String,
}

/// Human-readable outcome of aggregating a forecast series. Derived on
/// demand and never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Advisory {
    pub filters: AdvisoryFilters,
    pub summary: String,
    pub recommendations: Vec<String>,
    pub yield_estimate: YieldEstimate,
    pub factors: YieldFactors,
    pub risk: RiskSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Advisory,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "Info",
            Severity::Advisory => "Advisory",
            Severity::Warning => "Warning",
            Severity::Critical => "Critical",
        }
    }
}

/// A single rule outcome before it is flattened into the advisory
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub rule_id: &'static str,
    pub severity: Severity,
    pub actions: Vec<String>,
}

impl Recommendation {
    pub fn new(rule_id: &'static str, severity: Severity) -> Self {
        Self {
            rule_id,
            severity,
            actions: Vec::new(),
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.actions.push(action.into());
        self
    }
}
