pub mod confidence;
pub mod engine;
pub mod favorable;
pub mod rainfall;
pub mod soil_moisture;
pub mod temperature;

pub use engine::RulesEngine;

use crate::models::{AdvisoryFilters, Recommendation, RiskSummary};

/// Trait for advisory rules
pub trait Rule: Send + Sync {
    /// Unique identifier for this rule
    fn id(&self) -> &'static str;

    /// Human-readable name
    fn name(&self) -> &'static str;

    /// Evaluate the rule and return a recommendation if conditions are met
    fn evaluate(&self, risk: &RiskSummary, filters: &AdvisoryFilters) -> Option<Recommendation>;
}
