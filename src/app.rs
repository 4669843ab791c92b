use crate::config::{Config, ProviderKind};
use crate::datasources::ForecastRequest;
use crate::error::Result;
use crate::logic::{
    export_csv, write_export, FetchEvent, MetricsTableView, RiskAggregator, SortColumn,
    SpatialHeatmapProjector, DEFAULT_WINDOW_DAYS,
};
use crate::models::{
    Advisory, AdvisoryFilters, ForecastDay, ForecastSeries, HeatmapSample, Region, RiskMetric,
};
use crate::ui::screens::SettingsField;
use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Dashboard,
    Table,
    Heatmap,
    Advisory,
    Settings,
}

impl Screen {
    pub fn from_key(c: char) -> Option<Self> {
        match c {
            '1' => Some(Screen::Dashboard),
            '2' => Some(Screen::Table),
            '3' => Some(Screen::Heatmap),
            '4' => Some(Screen::Advisory),
            's' | 'S' => Some(Screen::Settings),
            _ => None,
        }
    }
}

/// Where the current forecast stands. Each variant renders differently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Failed(String),
    Empty,
    Ready,
}

pub struct SettingsState {
    pub focused_field: SettingsField,
}

impl SettingsState {
    pub fn new() -> Self {
        Self {
            focused_field: SettingsField::Region,
        }
    }

    pub fn next_field(&mut self) {
        self.focused_field = self.focused_field.next();
    }

    pub fn prev_field(&mut self) {
        self.focused_field = self.focused_field.prev();
    }
}

pub struct App {
    pub screen: Screen,
    pub should_quit: bool,
    pub config: Config,
    pub filters: AdvisoryFilters,
    pub window_days: usize,

    // Data
    pub load_state: LoadState,
    pub series: Option<Arc<ForecastSeries>>,
    /// Region the held series was fetched for
    loaded_region: Option<Region>,
    pub advisory: Option<Advisory>,
    pub advisory_error: Option<String>,

    // Screen states
    pub table: MetricsTableView,
    pub heatmap_metric: RiskMetric,
    pub settings_state: SettingsState,

    // Services
    pub projector: SpatialHeatmapProjector,
    aggregator: RiskAggregator,

    // UI state
    pub status_message: Option<String>,
    pub needs_refresh: bool,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let filters = config.filters()?;
        let projector = SpatialHeatmapProjector::new(config.heatmap.clone());

        Ok(Self {
            screen: Screen::Dashboard,
            should_quit: false,
            config,
            filters,
            window_days: DEFAULT_WINDOW_DAYS,
            load_state: LoadState::Loading,
            series: None,
            loaded_region: None,
            advisory: None,
            advisory_error: None,
            table: MetricsTableView::new(0),
            heatmap_metric: RiskMetric::RainRisk,
            settings_state: SettingsState::new(),
            projector,
            aggregator: RiskAggregator::new(),
            status_message: None,
            needs_refresh: true,
        })
    }

    pub fn switch_screen(&mut self, screen: Screen) {
        self.screen = screen;
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn set_status(&mut self, message: &str) {
        self.status_message = Some(message.to_string());
    }

    pub fn clear_status(&mut self) {
        self.status_message = None;
    }

    pub fn request_refresh(&mut self) {
        self.needs_refresh = true;
        self.set_status("Refreshing forecast...");
    }

    /// The fetch matching the current filters and config
    pub fn forecast_request(&self) -> ForecastRequest {
        ForecastRequest::from_config(&self.config, &self.filters)
    }

    /// Called once a fetch has been handed to the store
    pub fn mark_loading(&mut self) {
        self.needs_refresh = false;
        self.load_state = LoadState::Loading;
    }

    pub fn apply_event(&mut self, event: FetchEvent) {
        match event {
            FetchEvent::Loaded(series) => {
                let previous = self.selected_date();
                self.table.reset(series.len());
                if let Some(index) = previous.and_then(|d| series.position_of(d)) {
                    self.table.select_index(index);
                }
                self.load_state = if series.is_empty() {
                    LoadState::Empty
                } else {
                    LoadState::Ready
                };
                self.series = Some(series);
                self.loaded_region = Some(self.filters.region);
                self.clear_status();
                self.recompute_advisory();
            }
            FetchEvent::Failed(e) => {
                // The last good series stays loaded underneath the error
                self.load_state = LoadState::Failed(e.to_string());
                match self.restore_loaded_region() {
                    Some(region) => self.set_status(&format!(
                        "Fetch failed: {}. Region reset to {}",
                        e,
                        region.as_str()
                    )),
                    None => self.set_status(&format!("Fetch failed: {}", e)),
                }
            }
        }
    }

    /// After a failed region refetch the held series still belongs to the
    /// previous region, so the filters go back to it.
    fn restore_loaded_region(&mut self) -> Option<Region> {
        let loaded = self.loaded_region?;
        self.series.as_ref()?;
        let restored = AdvisoryFilters {
            region: loaded,
            ..self.filters
        };
        if self.config.query_point(&restored) == self.config.query_point(&self.filters) {
            return None;
        }
        self.filters = restored;
        self.recompute_advisory();
        Some(loaded)
    }

    /// Whether the table keys act on the held series. A failed refresh
    /// keeps the last good rows sortable and exportable.
    pub fn table_rows_available(&self) -> bool {
        let has_rows = self.series.as_ref().is_some_and(|s| !s.is_empty());
        match self.load_state {
            LoadState::Ready => true,
            LoadState::Failed(_) => has_rows,
            LoadState::Loading | LoadState::Empty => false,
        }
    }

    pub fn recompute_advisory(&mut self) {
        let Some(series) = self.series.as_ref() else {
            self.advisory = None;
            self.advisory_error = None;
            return;
        };

        match self.aggregator.summarize(series, self.window_days, &self.filters) {
            Ok(advisory) => {
                self.advisory = Some(advisory);
                self.advisory_error = None;
            }
            Err(e) => {
                tracing::debug!("advisory unavailable: {}", e);
                self.advisory = None;
                self.advisory_error = Some(e.to_string());
            }
        }
    }

    /// Grow or shrink the aggregation window, staying within 1..=horizon
    pub fn adjust_window(&mut self, delta: i64) {
        let max = self.config.forecast.horizon_days as i64;
        let next = (self.window_days as i64 + delta).clamp(1, max.max(1));
        if next as usize != self.window_days {
            self.window_days = next as usize;
            self.recompute_advisory();
        }
    }

    /// Step the focused settings field forwards or backwards through its
    /// closed set. Region changes move the query point and so refetch;
    /// crop changes refetch only when scores are derived locally.
    pub fn cycle_filter(&mut self, forward: bool) {
        let before = self.filters;
        match self.settings_state.focused_field {
            SettingsField::Region => {
                self.filters.region = if forward {
                    self.filters.region.next()
                } else {
                    self.filters.region.prev()
                };
            }
            SettingsField::Crop => {
                self.filters.crop = if forward {
                    self.filters.crop.next()
                } else {
                    self.filters.crop.prev()
                };
            }
            SettingsField::Season => {
                self.filters.season = if forward {
                    self.filters.season.next()
                } else {
                    self.filters.season.prev()
                };
            }
        }

        let point_changed =
            self.config.query_point(&before) != self.config.query_point(&self.filters);
        let crop_refetch = before.crop != self.filters.crop
            && self.config.forecast.provider == ProviderKind::OpenWeatherMap;

        if point_changed || crop_refetch {
            self.request_refresh();
        } else {
            self.recompute_advisory();
        }
    }

    pub fn selected_day_index(&self) -> Option<usize> {
        let series = self.series.as_ref()?;
        self.table.selected_index().filter(|&i| i < series.len())
    }

    pub fn selected_day(&self) -> Option<&ForecastDay> {
        let index = self.selected_day_index()?;
        self.series.as_ref()?.day(index)
    }

    fn selected_date(&self) -> Option<chrono::NaiveDate> {
        self.selected_day().map(|d| d.date)
    }

    /// Chronologically next day, independent of table sort
    pub fn next_day(&mut self) {
        let Some(len) = self.series.as_ref().map(|s| s.len()) else {
            return;
        };
        if let Some(i) = self.selected_day_index() {
            if i + 1 < len {
                self.table.select_index(i + 1);
            }
        }
    }

    pub fn prev_day(&mut self) {
        if let Some(i) = self.selected_day_index() {
            if i > 0 {
                self.table.select_index(i - 1);
            }
        }
    }

    /// Re-sort the table keeping the cursor on the same day
    pub fn toggle_sort(&mut self, column: SortColumn) {
        let Some(series) = self.series.clone() else {
            return;
        };
        let selected = self.selected_day_index();
        self.table.toggle_sort(&series, column);
        if let Some(index) = selected {
            self.table.select_index(index);
        }
    }

    pub fn toggle_expand_selected(&mut self) {
        if let Some(date) = self.selected_date() {
            self.table.toggle_expand(date);
        }
    }

    /// Export the loaded series as CSV. The outcome lands in the status
    /// line; failures never leave this function.
    pub fn export_csv(&mut self, dir_override: Option<&PathBuf>) -> Option<PathBuf> {
        let Some(series) = self.series.clone() else {
            self.set_status("Nothing to export yet");
            return None;
        };

        let result = self
            .config
            .export_dir(dir_override)
            .and_then(|dir| export_to(&dir, &series, &self.filters));

        match result {
            Ok(path) => {
                self.set_status(&format!("Exported {}", path.display()));
                Some(path)
            }
            Err(e) => {
                tracing::warn!("export failed: {}", e);
                self.set_status(&e.to_string());
                None
            }
        }
    }

    /// Samples for the heatmap screen. Errors become an empty layer.
    pub fn heatmap_samples(&self) -> Vec<HeatmapSample> {
        let (Some(series), Some(index)) = (self.series.as_ref(), self.selected_day_index()) else {
            return Vec::new();
        };
        match self.projector.project(series, index, self.heatmap_metric) {
            Ok(samples) => samples,
            Err(e) => {
                tracing::debug!("heatmap projection failed: {}", e);
                Vec::new()
            }
        }
    }

    pub fn cycle_heatmap_metric(&mut self) {
        self.heatmap_metric = self.heatmap_metric.next();
    }
}

fn export_to(dir: &Path, series: &ForecastSeries, filters: &AdvisoryFilters) -> Result<PathBuf> {
    let export = export_csv(series, filters.region, Local::now().date_naive())?;
    write_export(dir, &export)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClimaError;
    use crate::models::forecast::fixtures::*;
    use crate::models::{Crop, Region};

    const YAML: &str = r#"
filters:
  region: Pune
  crop: rice
  season: kharif
forecast:
  url: http://127.0.0.1:9/forecast
"#;

    fn app() -> App {
        App::new(Config::parse(YAML).unwrap()).unwrap()
    }

    fn loaded() -> App {
        let mut app = app();
        app.apply_event(FetchEvent::Loaded(Arc::new(ten_day_series())));
        app
    }

    #[test]
    fn starts_loading_and_wants_a_fetch() {
        let app = app();
        assert_eq!(app.load_state, LoadState::Loading);
        assert!(app.needs_refresh);
        assert!(app.advisory.is_none());
    }

    #[test]
    fn loaded_series_produces_advisory() {
        let app = loaded();
        assert_eq!(app.load_state, LoadState::Ready);
        let advisory = app.advisory.as_ref().unwrap();
        assert_eq!(advisory.risk.window_days, 7);
        assert!(app.advisory_error.is_none());
    }

    #[test]
    fn empty_series_is_its_own_state() {
        let mut app = app();
        app.apply_event(FetchEvent::Loaded(Arc::new(series(vec![]))));
        assert_eq!(app.load_state, LoadState::Empty);
        assert!(app.advisory.is_none());
        assert!(app.advisory_error.is_some());
        assert!(app.heatmap_samples().is_empty());
    }

    #[test]
    fn failure_keeps_previous_series() {
        let mut app = loaded();
        app.apply_event(FetchEvent::Failed(ClimaError::ForecastUnavailable(
            "HTTP 500".into(),
        )));
        assert!(matches!(app.load_state, LoadState::Failed(ref m) if m.contains("HTTP 500")));
        assert_eq!(app.series.as_ref().unwrap().len(), 10);
        assert!(app.status_message.is_some());
    }

    #[test]
    fn failed_refresh_keeps_rows_exportable() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = loaded();
        app.apply_event(FetchEvent::Failed(ClimaError::ForecastTimeout(
            std::time::Duration::from_secs(15),
        )));
        assert!(app.table_rows_available());

        let path = app.export_csv(Some(&dir.path().to_path_buf())).unwrap();
        let contents = std::fs::read_to_string(path).unwrap();
        assert_eq!(contents.lines().count(), 11);
    }

    #[test]
    fn failed_first_fetch_has_no_rows() {
        let mut app = app();
        app.apply_event(FetchEvent::Failed(ClimaError::ForecastUnavailable(
            "HTTP 502".into(),
        )));
        assert!(!app.table_rows_available());
        assert_eq!(app.filters.region, Region::Pune);
    }

    #[test]
    fn failed_region_refetch_restores_loaded_region() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = loaded();
        app.settings_state.focused_field = SettingsField::Region;
        app.cycle_filter(true);
        assert_ne!(app.filters.region, Region::Pune);

        app.apply_event(FetchEvent::Failed(ClimaError::ForecastUnavailable(
            "HTTP 500".into(),
        )));
        assert_eq!(app.filters.region, Region::Pune);
        assert_eq!(app.advisory.as_ref().unwrap().filters.region, Region::Pune);
        assert!(app.status_message.as_ref().unwrap().contains("Region reset to"));

        let path = app.export_csv(Some(&dir.path().to_path_buf())).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("climasense_pune_"), "{}", name);
    }

    #[test]
    fn window_adjusts_within_horizon() {
        let mut app = loaded();
        app.adjust_window(-10);
        assert_eq!(app.window_days, 1);
        assert_eq!(app.advisory.as_ref().unwrap().risk.window_days, 1);
        app.adjust_window(100);
        assert_eq!(app.window_days, 10);
        assert_eq!(app.advisory.as_ref().unwrap().risk.window_days, 10);
    }

    #[test]
    fn season_change_recomputes_without_refetch() {
        let mut app = loaded();
        app.needs_refresh = false;
        app.settings_state.focused_field = SettingsField::Season;
        app.cycle_filter(true);
        assert!(!app.needs_refresh);
        let advisory = app.advisory.as_ref().unwrap();
        assert_eq!(advisory.filters.season, app.filters.season);
    }

    #[test]
    fn crop_change_with_graphcast_keeps_series() {
        let mut app = loaded();
        app.needs_refresh = false;
        app.settings_state.focused_field = SettingsField::Crop;
        app.cycle_filter(true);
        assert_ne!(app.filters.crop, Crop::Rice);
        assert!(!app.needs_refresh);
        assert_eq!(app.advisory.as_ref().unwrap().filters.crop, app.filters.crop);
    }

    #[test]
    fn region_change_requests_refetch_for_new_point() {
        let mut app = loaded();
        app.needs_refresh = false;
        app.settings_state.focused_field = SettingsField::Region;
        app.cycle_filter(true);
        assert_ne!(app.filters.region, Region::Pune);
        assert!(app.needs_refresh);
        assert_eq!(
            app.forecast_request().point,
            app.filters.region.reference_point()
        );
    }

    #[test]
    fn day_selection_is_shared_with_table_sort() {
        let mut app = loaded();
        app.next_day();
        app.next_day();
        assert_eq!(app.selected_day_index(), Some(2));

        app.toggle_sort(SortColumn::RainRisk);
        assert_eq!(app.selected_day_index(), Some(2));

        app.prev_day();
        assert_eq!(app.selected_day_index(), Some(1));
    }

    #[test]
    fn day_selection_stops_at_edges() {
        let mut app = loaded();
        app.prev_day();
        assert_eq!(app.selected_day_index(), Some(0));
        for _ in 0..20 {
            app.next_day();
        }
        assert_eq!(app.selected_day_index(), Some(9));
    }

    #[test]
    fn reload_keeps_selected_date() {
        let mut app = loaded();
        app.next_day();
        app.next_day();
        app.next_day();
        app.apply_event(FetchEvent::Loaded(Arc::new(ten_day_series())));
        assert_eq!(app.selected_day_index(), Some(3));
    }

    #[test]
    fn expand_toggles_selected_row() {
        let mut app = loaded();
        app.toggle_expand_selected();
        assert!(app.table.is_expanded(date(0)));
        app.toggle_expand_selected();
        assert!(!app.table.is_expanded(date(0)));
    }

    #[test]
    fn export_writes_file_and_reports_status() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = loaded();
        let out = dir.path().join("exports");
        let path = app.export_csv(Some(&out)).unwrap();
        assert!(path.exists());
        assert!(path.starts_with(&out));
        assert!(app.status_message.as_ref().unwrap().starts_with("Exported"));
    }

    #[test]
    fn export_failure_becomes_status() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let mut app = loaded();

        assert!(app.export_csv(Some(&blocker.join("sub"))).is_none());
        assert!(app
            .status_message
            .as_ref()
            .unwrap()
            .starts_with("Export failed"));
        assert_eq!(app.series.as_ref().unwrap().len(), 10);
    }

    #[test]
    fn export_without_series_is_a_status_message() {
        let mut app = app();
        assert!(app.export_csv(None).is_none());
        assert_eq!(app.status_message.as_deref(), Some("Nothing to export yet"));
    }

    #[test]
    fn heatmap_follows_metric_and_day() {
        let mut app = loaded();
        let rain = app.heatmap_samples();
        assert!(!rain.is_empty());
        app.cycle_heatmap_metric();
        assert_eq!(app.heatmap_metric, RiskMetric::RainRisk.next());
        assert_eq!(app.heatmap_samples().len(), rain.len());
    }
}
