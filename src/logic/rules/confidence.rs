use super::Rule;
use crate::models::{AdvisoryFilters, Recommendation, RiskSummary, Severity};

/// Mean confidence below which the advisory tells the user to re-check
pub const LOW_CONFIDENCE: f64 = 0.6;

/// Forecast reliability notes: low mean confidence, a short series, or
/// upstream confidence that had to be repaired.
pub struct ConfidenceRule;

impl Rule for ConfidenceRule {
    fn id(&self) -> &'static str {
        "forecast_confidence"
    }

    fn name(&self) -> &'static str {
        "Forecast Confidence"
    }

    fn evaluate(&self, risk: &RiskSummary, _filters: &AdvisoryFilters) -> Option<Recommendation> {
        let low = risk.mean_confidence.is_some_and(|c| c < LOW_CONFIDENCE);
        if !low && !risk.reduced_window && !risk.confidence_adjusted {
            return None;
        }

        let severity = if low {
            Severity::Advisory
        } else {
            Severity::Info
        };
        let mut rec = Recommendation::new(self.id(), severity);

        if let Some(c) = risk.mean_confidence.filter(|_| low) {
            rec = rec.with_action(format!(
                "Forecast confidence is low ({:.0}%): re-check the forecast before committing inputs",
                c * 100.0
            ));
        }
        if risk.reduced_window {
            rec = rec.with_action(format!(
                "Only {} of {} requested days available: advisory confidence is reduced",
                risk.window_days, risk.requested_window
            ));
        }
        if risk.confidence_adjusted {
            rec = rec.with_action(
                "Upstream confidence rose with lead time and was capped to the running minimum",
            );
        }
        Some(rec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::rules::fixtures::*;

    #[test]
    fn confident_full_window_is_silent() {
        assert!(ConfidenceRule
            .evaluate(&calm(), &AdvisoryFilters::default())
            .is_none());
    }

    #[test]
    fn reduced_window_is_noted() {
        let mut risk = calm();
        risk.reduced_window = true;
        risk.window_days = 3;
        let rec = ConfidenceRule
            .evaluate(&risk, &AdvisoryFilters::default())
            .unwrap();
        assert_eq!(rec.severity, Severity::Info);
        assert_eq!(
            rec.actions,
            vec!["Only 3 of 7 requested days available: advisory confidence is reduced"]
        );
    }

    #[test]
    fn low_confidence_is_advisory() {
        let mut risk = calm();
        risk.mean_confidence = Some(0.5);
        risk.confidence_adjusted = true;
        let rec = ConfidenceRule
            .evaluate(&risk, &AdvisoryFilters::default())
            .unwrap();
        assert_eq!(rec.severity, Severity::Advisory);
        assert_eq!(rec.actions.len(), 2);
        assert!(rec.actions[0].contains("50%"));
    }
}
