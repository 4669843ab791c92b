use super::Rule;
use crate::models::{
    AdvisoryFilters, MoistureLevel, Recommendation, RiskLevel, RiskSummary, Severity,
};

/// Fires when every metric with data is in its best bucket
pub struct FavorableConditionsRule;

impl Rule for FavorableConditionsRule {
    fn id(&self) -> &'static str {
        "favorable_conditions"
    }

    fn name(&self) -> &'static str {
        "Favorable Conditions"
    }

    fn evaluate(&self, risk: &RiskSummary, _filters: &AdvisoryFilters) -> Option<Recommendation> {
        let any_data = risk.rain_risk.level.is_some()
            || risk.temp_extreme.level.is_some()
            || risk.moisture_level.is_some();
        if !any_data {
            return None;
        }

        let calm = |level: Option<RiskLevel>| level.is_none_or(|l| l == RiskLevel::Low);
        let favorable = calm(risk.rain_risk.level)
            && calm(risk.temp_extreme.level)
            && risk
                .moisture_level
                .is_none_or(|m| m == MoistureLevel::Optimal);

        favorable.then(|| {
            Recommendation::new(self.id(), Severity::Info)
                .with_action("Conditions are favorable: maintain current practices")
                .with_action("Plan upcoming sowing, spraying or harvest work for this window")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::rules::fixtures::*;

    #[test]
    fn calm_week_is_favorable() {
        assert!(FavorableConditionsRule
            .evaluate(&calm(), &AdvisoryFilters::default())
            .is_some());
    }

    #[test]
    fn any_elevated_metric_blocks() {
        let mut risk = calm();
        risk.temp_extreme = metric(30.0);
        assert!(FavorableConditionsRule
            .evaluate(&risk, &AdvisoryFilters::default())
            .is_none());
    }

    #[test]
    fn no_data_is_not_favorable() {
        let mut risk = calm();
        risk.rain_risk = missing();
        risk.temp_extreme = missing();
        risk.soil_moisture = missing();
        risk.moisture_level = None;
        assert!(FavorableConditionsRule
            .evaluate(&risk, &AdvisoryFilters::default())
            .is_none());
    }
}
