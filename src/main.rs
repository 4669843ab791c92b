mod app;
mod cli;
mod config;
mod datasources;
mod error;
mod logic;
mod models;
mod ui;

use anyhow::Context;
use app::{App, LoadState, Screen};
use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use datasources::{ForecastRequest, ForecastSource};
use logic::{
    export_csv, write_export, FetchEvent, ForecastStore, RiskAggregator, RulesEngine, SortColumn,
};
use models::{AdvisoryFilters, RiskMetric};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use ui::screens::{
    AdvisoryScreen, DashboardScreen, ForecastTableScreen, HeatmapScreen, SettingsScreen,
};

type Tui = Terminal<CrosstermBackend<Stdout>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Commands::Init) => {
            Config::setup_interactive().context("interactive setup failed")?;
            Ok(())
        }
        Some(Commands::Check) => run_check(cli.config).await,
        Some(Commands::Advisory {
            window,
            region,
            crop,
            season,
            json,
        }) => run_advisory(cli.config, window, region, crop, season, json).await,
        Some(Commands::Export { out }) => run_export(cli.config, out).await,
        Some(Commands::Heatmap { day, metric }) => run_heatmap(cli.config, day, &metric).await,
        None => run_tui(cli.config).await,
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = if verbose > 0 {
        EnvFilter::new(format!("climasense={}", default_level))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<Config> {
    Config::load(path).context("could not load configuration")
}

/// Configured filters with any command-line overrides applied
fn resolve_filters(
    config: &Config,
    region: Option<String>,
    crop: Option<String>,
    season: Option<String>,
) -> anyhow::Result<AdvisoryFilters> {
    let mut filters = config.filters()?;
    if let Some(r) = region {
        filters.region = r.parse()?;
    }
    if let Some(c) = crop {
        filters.crop = c.parse()?;
    }
    if let Some(s) = season {
        filters.season = s.parse()?;
    }
    Ok(filters)
}

async fn fetch_once(
    config: &Config,
    filters: &AdvisoryFilters,
) -> anyhow::Result<models::ForecastSeries> {
    let store = ForecastStore::new(ForecastSource::from_config(config)?);
    let request = ForecastRequest::from_config(config, filters);
    let series = store
        .fetch(&request)
        .await
        .with_context(|| format!("fetching forecast from {}", store.source_name()))?;
    Ok(series)
}

async fn run_check(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let filters = config.filters()?;
    println!("Config OK");
    println!(
        "  Filters: {} / {} / {}",
        filters.region, filters.crop, filters.season
    );
    println!("  Query point: {}", config.query_point(&filters));

    let rules: Vec<&str> = RulesEngine::new()
        .list_rules()
        .into_iter()
        .map(|(_, name)| name)
        .collect();
    println!("  Advisory rules: {}", rules.join(", "));

    let source = ForecastSource::from_config(&config)?;
    if let ForecastSource::Api(ref client) = source {
        println!("  Endpoint: {}", client.url());
    }
    let request = ForecastRequest::from_config(&config, &filters);
    match source.test_connection(&request).await {
        Ok(true) => println!("  {}: OK", source.name()),
        Ok(false) => println!("  {}: UNREACHABLE", source.name()),
        Err(e) => println!("  {}: FAILED ({})", source.name(), e),
    }
    Ok(())
}

async fn run_advisory(
    config_path: Option<PathBuf>,
    window: usize,
    region: Option<String>,
    crop: Option<String>,
    season: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let filters = resolve_filters(&config, region, crop, season)?;
    let series = fetch_once(&config, &filters).await?;
    let advisory = RiskAggregator::new().summarize(&series, window, &filters)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&advisory)?);
        return Ok(());
    }

    println!("{}", advisory.summary);
    println!();
    println!("Recommendations:");
    for rec in &advisory.recommendations {
        println!("  - {}", rec);
    }
    let y = &advisory.yield_estimate;
    println!();
    println!(
        "Yield: {:.2} {} (range {:.2} to {:.2})",
        y.predicted, y.unit, y.low, y.high
    );
    Ok(())
}

async fn run_export(config_path: Option<PathBuf>, out: Option<PathBuf>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let filters = config.filters()?;
    let series = fetch_once(&config, &filters).await?;

    let export = export_csv(&series, filters.region, chrono::Local::now().date_naive())?;
    let dir = config.export_dir(out.as_ref())?;
    let path = write_export(&dir, &export)?;
    println!("Exported {} days to {}", series.len(), path.display());
    Ok(())
}

async fn run_heatmap(
    config_path: Option<PathBuf>,
    day: usize,
    metric: &str,
) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let metric: RiskMetric = metric.parse()?;
    let filters = config.filters()?;
    let series = fetch_once(&config, &filters).await?;

    let projector = logic::SpatialHeatmapProjector::new(config.heatmap.clone());
    let samples = projector.project(&series, day, metric)?;
    println!("{}", serde_json::to_string_pretty(&samples)?);
    Ok(())
}

async fn run_tui(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config = if Config::exists(config_path.as_ref()) {
        load_config(config_path)?
    } else {
        let (config, _) = Config::setup_interactive().context("interactive setup failed")?;
        config
    };

    let source = ForecastSource::from_config(&config)?;
    let mut store = ForecastStore::new(source);
    let mut app = App::new(config)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the main loop
    let result = run_app(&mut terminal, &mut app, &mut store);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(terminal: &mut Tui, app: &mut App, store: &mut ForecastStore) -> anyhow::Result<()> {
    loop {
        if let Some(event) = store.poll() {
            app.apply_event(event);
        }

        if app.needs_refresh {
            match store.request(app.forecast_request()) {
                Ok(_) => app.mark_loading(),
                Err(e) => {
                    app.needs_refresh = false;
                    app.apply_event(FetchEvent::Failed(e));
                }
            }
        }

        draw(terminal, app, store.source_name())?;

        // Poll with a timeout so fetch completions are picked up
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') => app.quit(),
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        app.quit();
                    }
                    KeyCode::Esc => app.switch_screen(Screen::Dashboard),
                    KeyCode::Char(c) => {
                        if let Some(screen) = Screen::from_key(c) {
                            app.switch_screen(screen);
                        } else if !handle_screen_input(app, key.code) && c == 'r' {
                            retry_or_refresh(app, store);
                        }
                    }
                    _ => {
                        handle_screen_input(app, key.code);
                    }
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn draw(terminal: &mut Tui, app: &App, source_name: &str) -> io::Result<()> {
    let series = app.series.as_deref();
    let status = app.status_message.as_deref();

    terminal.draw(|f| {
        let area = f.area();

        match app.screen {
            Screen::Dashboard => {
                let screen = DashboardScreen::new(&app.filters, &app.load_state)
                    .with_data(series, app.advisory.as_ref(), app.advisory_error.as_deref())
                    .with_source(source_name)
                    .with_status(status);
                f.render_widget(screen, area);
            }
            Screen::Table => {
                let screen = ForecastTableScreen::new(series, &app.table, &app.load_state)
                    .with_status(status);
                f.render_widget(screen, area);
            }
            Screen::Heatmap => {
                let samples = app.heatmap_samples();
                let settings = app.projector.settings();
                let screen = HeatmapScreen::new(
                    &samples,
                    settings.bounds,
                    settings.step_deg,
                    &app.load_state,
                )
                .with_selection(
                    app.heatmap_metric,
                    app.selected_day(),
                    series.map(|s| s.location()),
                )
                .with_status(status);
                f.render_widget(screen, area);
            }
            Screen::Advisory => {
                let screen = AdvisoryScreen::new(app.advisory.as_ref(), &app.load_state)
                    .with_error(app.advisory_error.as_deref())
                    .with_status(status);
                f.render_widget(screen, area);
            }
            Screen::Settings => {
                let screen = SettingsScreen::new(&app.filters, &app.config)
                    .with_focus(app.settings_state.focused_field)
                    .with_window(app.window_days)
                    .with_status(status);
                f.render_widget(screen, area);
            }
        }
    })?;
    Ok(())
}

/// `r` on the error state re-issues the failed request; anywhere else it
/// refreshes with the current filters.
fn retry_or_refresh(app: &mut App, store: &mut ForecastStore) {
    if store.is_loading() {
        app.set_status("Already fetching...");
        return;
    }
    if !matches!(app.load_state, LoadState::Failed(_)) {
        app.request_refresh();
        return;
    }
    // A restored region no longer matches the failed request
    if store.last_request() != Some(app.forecast_request()) {
        app.request_refresh();
        return;
    }
    match store.retry() {
        Ok(Some(_)) => {
            app.mark_loading();
            if let Some(previous) = store.current() {
                app.set_status(&format!(
                    "Retrying... last good forecast from {} kept",
                    previous.metadata().generated_at.format("%Y-%m-%d %H:%M UTC")
                ));
            } else {
                app.set_status("Retrying...");
            }
        }
        Ok(None) => app.request_refresh(),
        Err(e) => app.apply_event(FetchEvent::Failed(e)),
    }
}

/// Returns true when the key was consumed by the current screen
fn handle_screen_input(app: &mut App, code: KeyCode) -> bool {
    match app.screen {
        Screen::Dashboard => false,
        Screen::Table => handle_table_input(app, code),
        Screen::Heatmap => handle_heatmap_input(app, code),
        Screen::Advisory => handle_advisory_input(app, code),
        Screen::Settings => handle_settings_input(app, code),
    }
}

fn handle_table_input(app: &mut App, code: KeyCode) -> bool {
    if !app.table_rows_available() {
        return false;
    }
    // On the error panel `r` stays retry
    if code == KeyCode::Char('r') && matches!(app.load_state, LoadState::Failed(_)) {
        return false;
    }
    match code {
        KeyCode::Up | KeyCode::Char('k') => app.table.select_previous(),
        KeyCode::Down | KeyCode::Char('j') => app.table.select_next(),
        KeyCode::Enter => app.toggle_expand_selected(),
        KeyCode::Char('d') => app.toggle_sort(SortColumn::Date),
        KeyCode::Char('r') => app.toggle_sort(SortColumn::RainRisk),
        KeyCode::Char('t') => app.toggle_sort(SortColumn::TempExtreme),
        KeyCode::Char('m') => app.toggle_sort(SortColumn::SoilMoisture),
        KeyCode::Char('c') => app.toggle_sort(SortColumn::Confidence),
        KeyCode::Char('e') => {
            app.export_csv(None);
        }
        _ => return false,
    }
    true
}

fn handle_heatmap_input(app: &mut App, code: KeyCode) -> bool {
    match code {
        KeyCode::Left => app.prev_day(),
        KeyCode::Right => app.next_day(),
        KeyCode::Char('m') => app.cycle_heatmap_metric(),
        _ => return false,
    }
    true
}

fn handle_advisory_input(app: &mut App, code: KeyCode) -> bool {
    match code {
        KeyCode::Char('+') | KeyCode::Char('=') => app.adjust_window(1),
        KeyCode::Char('-') => app.adjust_window(-1),
        _ => return false,
    }
    true
}

fn handle_settings_input(app: &mut App, code: KeyCode) -> bool {
    match code {
        KeyCode::Up => app.settings_state.prev_field(),
        KeyCode::Down | KeyCode::Tab => app.settings_state.next_field(),
        KeyCode::Left => app.cycle_filter(false),
        KeyCode::Right | KeyCode::Enter => app.cycle_filter(true),
        _ => return false,
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClimaError;
    use crate::models::forecast::fixtures::ten_day_series;
    use std::sync::Arc;

    fn failed_app(export_dir: &std::path::Path) -> App {
        let yaml = format!(
            "filters:\n  region: Pune\n  crop: rice\n  season: kharif\nforecast:\n  url: http://127.0.0.1:9/forecast\nexport:\n  dir: {}\n",
            export_dir.display()
        );
        let mut app = App::new(Config::parse(&yaml).unwrap()).unwrap();
        app.apply_event(FetchEvent::Loaded(Arc::new(ten_day_series())));
        app.apply_event(FetchEvent::Failed(ClimaError::ForecastUnavailable(
            "HTTP 503".into(),
        )));
        app
    }

    #[test]
    fn export_key_works_after_failed_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = failed_app(dir.path());
        app.switch_screen(Screen::Table);

        assert!(handle_screen_input(&mut app, KeyCode::Char('e')));
        assert!(app.status_message.as_ref().unwrap().starts_with("Exported"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn retry_key_is_not_a_sort_on_the_error_panel() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = failed_app(dir.path());
        app.switch_screen(Screen::Table);

        assert!(!handle_screen_input(&mut app, KeyCode::Char('r')));
        assert!(handle_screen_input(&mut app, KeyCode::Char('t')));
    }

    #[test]
    fn table_keys_ignored_while_first_fetch_loads() {
        let yaml = "filters:\n  region: Pune\n  crop: rice\n  season: kharif\nforecast:\n  url: http://127.0.0.1:9/forecast\n";
        let mut app = App::new(Config::parse(yaml).unwrap()).unwrap();
        app.switch_screen(Screen::Table);
        assert!(!handle_screen_input(&mut app, KeyCode::Char('e')));
    }
}
