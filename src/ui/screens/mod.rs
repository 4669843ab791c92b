pub mod advisory;
pub mod dashboard;
pub mod forecast_table;
pub mod heatmap;
pub mod settings;

pub use advisory::AdvisoryScreen;
pub use dashboard::DashboardScreen;
pub use forecast_table::ForecastTableScreen;
pub use heatmap::HeatmapScreen;
pub use settings::{SettingsField, SettingsScreen};
