pub mod aggregator;
pub mod export;
pub mod forecast_store;
pub mod heatmap;
pub mod metrics;
pub mod rules;
pub mod table;

pub use aggregator::{RiskAggregator, DEFAULT_WINDOW_DAYS};
pub use export::{export_csv, write_export, CsvExport};
pub use forecast_store::{FetchEvent, ForecastStore};
pub use heatmap::{HeatmapSettings, SpatialHeatmapProjector};
pub use metrics::AgriculturalMetrics;
pub use rules::RulesEngine;
pub use table::{MetricsTableView, SortColumn, SortDirection};
