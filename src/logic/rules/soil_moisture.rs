use super::Rule;
use crate::models::{
    AdvisoryFilters, MoistureLevel, Recommendation, RiskLevel, RiskSummary, Severity,
};

/// Soil moisture rule - irrigation on dry soil, drainage on saturated soil
pub struct SoilMoistureRule;

impl Rule for SoilMoistureRule {
    fn id(&self) -> &'static str {
        "soil_moisture"
    }

    fn name(&self) -> &'static str {
        "Soil Moisture"
    }

    fn evaluate(&self, risk: &RiskSummary, _filters: &AdvisoryFilters) -> Option<Recommendation> {
        let mean = risk.soil_moisture.mean?;
        match risk.moisture_level? {
            MoistureLevel::Optimal => None,
            MoistureLevel::Dry => Some(
                Recommendation::new(self.id(), Severity::Warning)
                    .with_action(format!(
                        "Soil moisture is low ({:.0}%): schedule irrigation, drip where available",
                        mean
                    ))
                    .with_action("Apply mulch to retain soil moisture and reduce evaporation")
                    .with_action("Irrigate in the early morning or late evening to limit losses"),
            ),
            MoistureLevel::Saturated => {
                // More rain on already saturated soil means standing water
                let severity = if risk.rain_risk.level == Some(RiskLevel::High) {
                    Severity::Warning
                } else {
                    Severity::Advisory
                };
                Some(
                    Recommendation::new(self.id(), severity)
                        .with_action(format!(
                            "Soil is saturated ({:.0}%): hold irrigation until levels normalize",
                            mean
                        ))
                        .with_action("Check low-lying plots for waterlogging"),
                )
            }
        }
    }
}
