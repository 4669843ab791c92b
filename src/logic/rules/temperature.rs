use super::Rule;
use crate::models::{AdvisoryFilters, Recommendation, RiskLevel, RiskSummary, Severity};

/// Temperature extremes rule
///
/// Heat or cold advice is picked by comparing the window mean temperature
/// with the midpoint of the crop's optimal band.
pub struct TemperatureRule;

impl Rule for TemperatureRule {
    fn id(&self) -> &'static str {
        "temperature"
    }

    fn name(&self) -> &'static str {
        "Temperature Extremes"
    }

    fn evaluate(&self, risk: &RiskSummary, filters: &AdvisoryFilters) -> Option<Recommendation> {
        let mean = risk.temp_extreme.mean?;
        let severity = match risk.temp_extreme.level? {
            RiskLevel::Low => return None,
            RiskLevel::Moderate => Severity::Advisory,
            RiskLevel::High => Severity::Warning,
        };

        let (opt_min, opt_max) = filters.crop.optimal_temp_c();
        let midpoint = (opt_min + opt_max) / 2.0;

        let rec = Recommendation::new(self.id(), severity);
        let rec = match risk.mean_temperature_c {
            Some(t) if t < midpoint => rec
                .with_action(format!(
                    "Cold stress risk ({:.0}/100, mean {:.1}°C vs {:.0}-{:.0}°C optimal for {}): use row covers on sensitive plots",
                    mean, t, opt_min, opt_max, filters.crop
                ))
                .with_action("Irrigate lightly before cold nights to moderate soil temperature")
                .with_action("Avoid fertilizing ahead of the cold spell"),
            Some(t) => rec
                .with_action(format!(
                    "Heat stress risk ({:.0}/100, mean {:.1}°C vs {:.0}-{:.0}°C optimal for {}): increase irrigation frequency",
                    mean, t, opt_min, opt_max, filters.crop
                ))
                .with_action("Mulch to keep soil temperatures down")
                .with_action("Schedule field work for early morning or late evening"),
            None => rec.with_action(format!(
                "Temperature extreme risk {:.0}/100: watch crops for heat or cold stress",
                mean
            )),
        };
        Some(rec)
    }
}
