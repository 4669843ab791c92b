use super::{
    confidence::ConfidenceRule, favorable::FavorableConditionsRule, rainfall::RainfallRule,
    soil_moisture::SoilMoistureRule, temperature::TemperatureRule, Rule,
};
use crate::models::{AdvisoryFilters, Recommendation, RiskSummary};

pub struct RulesEngine {
    rules: Vec<Box<dyn Rule>>,
}

impl RulesEngine {
    pub fn new() -> Self {
        let rules: Vec<Box<dyn Rule>> = vec![
            Box::new(RainfallRule),
            Box::new(TemperatureRule),
            Box::new(SoilMoistureRule),
            Box::new(ConfidenceRule),
            Box::new(FavorableConditionsRule),
        ];

        Self { rules }
    }

    /// Matching recommendations, most severe first. Equal severities keep
    /// rule registration order.
    pub fn evaluate(&self, risk: &RiskSummary, filters: &AdvisoryFilters) -> Vec<Recommendation> {
        let mut recs: Vec<Recommendation> = self
            .rules
            .iter()
            .filter_map(|rule| rule.evaluate(risk, filters))
            .collect();
        recs.sort_by(|a, b| b.severity.cmp(&a.severity));
        recs
    }

    #[cfg(test)]
    pub fn evaluate_rule(
        &self,
        rule_id: &str,
        risk: &RiskSummary,
        filters: &AdvisoryFilters,
    ) -> Option<Recommendation> {
        self.rules
            .iter()
            .find(|r| r.id() == rule_id)
            .and_then(|rule| rule.evaluate(risk, filters))
    }

    pub fn list_rules(&self) -> Vec<(&'static str, &'static str)> {
        self.rules.iter().map(|r| (r.id(), r.name())).collect()
    }
}

impl Default for RulesEngine {
    fn default() -> Self {
        Self::new()
    }
}
