use super::Rule;
use crate::models::{AdvisoryFilters, Recommendation, RiskLevel, RiskSummary, Severity};

/// Cumulative window rainfall that turns a high rain risk into a critical one
const FLOOD_TOTAL_MM: f64 = 100.0;

/// Rainfall risk rule
///
/// Severity levels:
/// - Advisory: moderate mean rain risk
/// - Warning: high mean rain risk
/// - Critical: high mean rain risk and at least 100 mm over the window
pub struct RainfallRule;

impl Rule for RainfallRule {
    fn id(&self) -> &'static str {
        "rainfall"
    }

    fn name(&self) -> &'static str {
        "Rainfall Risk"
    }

    fn evaluate(&self, risk: &RiskSummary, _filters: &AdvisoryFilters) -> Option<Recommendation> {
        let mean = risk.rain_risk.mean?;
        match risk.rain_risk.level? {
            RiskLevel::Low => None,
            RiskLevel::Moderate => Some(
                Recommendation::new(self.id(), Severity::Advisory)
                    .with_action(format!(
                        "Moderate rainfall risk ({:.0}/100): clear drainage channels before the wetter days",
                        mean
                    ))
                    .with_action("Time fertilizer application between rain spells"),
            ),
            RiskLevel::High => {
                let severity = if risk.total_precipitation_mm >= FLOOD_TOTAL_MM {
                    Severity::Critical
                } else {
                    Severity::Warning
                };
                Some(
                    Recommendation::new(self.id(), severity)
                        .with_action(format!(
                            "High rainfall risk ({:.0}/100, {:.0} mm expected): improve field drainage with channels or raised beds",
                            mean, risk.total_precipitation_mm
                        ))
                        .with_action("Postpone fertilizer and pesticide application until the rain passes")
                        .with_action("Monitor for fungal diseases that thrive in waterlogged conditions"),
                )
            }
        }
    }
}
