use crate::app::LoadState;
use crate::logic::{MetricsTableView, SortColumn};
use crate::models::{ForecastDay, ForecastSeries};
use crate::ui::components::{render_load_state, render_nav, render_status_message, risk_bar};
use crate::ui::Theme;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Paragraph, Row, StatefulWidget, Table, TableState, Widget},
};

const BAR_WIDTH: usize = 10;

pub struct ForecastTableScreen<'a> {
    pub series: Option<&'a ForecastSeries>,
    pub view: &'a MetricsTableView,
    pub load_state: &'a LoadState,
    pub status_message: Option<&'a str>,
}

impl<'a> ForecastTableScreen<'a> {
    pub fn new(
        series: Option<&'a ForecastSeries>,
        view: &'a MetricsTableView,
        load_state: &'a LoadState,
    ) -> Self {
        Self {
            series,
            view,
            load_state,
            status_message: None,
        }
    }

    pub fn with_status(mut self, status: Option<&'a str>) -> Self {
        self.status_message = status;
        self
    }
}

impl Widget for ForecastTableScreen<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2), // Header
                Constraint::Min(8),    // Table
                Constraint::Length(1), // Status message
                Constraint::Length(1), // Nav
            ])
            .split(area);

        self.render_header(chunks[0], buf);

        if !render_load_state(chunks[1], buf, self.load_state) {
            if let Some(series) = self.series {
                self.render_table(series, chunks[1], buf);
            }
        }

        render_status_message(chunks[2], buf, self.status_message);
        render_nav(
            chunks[3],
            buf,
            &[
                ("[d/r/t/m/c]", "Sort "),
                ("[Enter]", "Expand "),
                ("[e]", "Export "),
            ],
        );
    }
}

impl ForecastTableScreen<'_> {
    fn render_header(&self, area: Rect, buf: &mut Buffer) {
        let sort = match self.view.sort_state() {
            Some((column, direction)) => format!("sorted by {} {}", column.title(), direction.arrow()),
            None => "chronological".to_string(),
        };
        let days = self.series.map(|s| s.len()).unwrap_or(0);

        let block = Block::default()
            .title(Span::styled("Forecast Table", Theme::title()))
            .borders(Borders::BOTTOM)
            .border_style(Theme::border());
        let info = Line::from(vec![
            Span::styled(format!("{} days", days), Theme::dim()),
            Span::styled(format!(", {}", sort), Theme::dim()),
        ]);
        Paragraph::new(info).block(block).render(area, buf);
    }

    fn render_table(&self, series: &ForecastSeries, area: Rect, buf: &mut Buffer) {
        let header_cells = SortColumn::ALL
            .iter()
            .map(|column| {
                let title = match self.view.sort_state() {
                    Some((c, dir)) if c == *column => format!("{} {}", column.title(), dir.arrow()),
                    _ => column.title().to_string(),
                };
                Cell::from(title).style(Theme::header())
            })
            .chain(std::iter::once(Cell::from("Weather").style(Theme::header())));
        let header = Row::new(header_cells).height(1);

        let rows: Vec<Row> = self
            .view
            .rows(series)
            .into_iter()
            .map(|day| {
                if self.view.is_expanded(day.date) {
                    expanded_row(day)
                } else {
                    compact_row(day)
                }
            })
            .collect();

        let widths = [
            Constraint::Length(BAR_WIDTH as u16 + 8),
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Length(10),
            Constraint::Length(8),
            Constraint::Min(24),
        ];

        let table = Table::new(rows, widths)
            .header(header)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Theme::border()),
            )
            .row_highlight_style(Theme::selected());

        let mut state = TableState::default();
        state.select(Some(self.view.selected()));
        StatefulWidget::render(table, area, buf, &mut state);
    }
}

fn score_cell(score: f64) -> Cell<'static> {
    let text = if score.is_finite() {
        format!("{:.1}", score.clamp(0.0, 100.0))
    } else {
        "-".to_string()
    };
    Cell::from(text).style(Style::default().fg(Theme::risk_color(score)))
}

fn moisture_cell(moisture: f64) -> Cell<'static> {
    let text = if moisture.is_finite() {
        format!("{:.1}", moisture.clamp(0.0, 100.0))
    } else {
        "-".to_string()
    };
    Cell::from(text).style(Style::default().fg(Theme::moisture_color(moisture)))
}

fn confidence_cell(confidence: f64) -> Cell<'static> {
    if !confidence.is_finite() {
        return Cell::from("-").style(Theme::dim());
    }
    Cell::from(format!("{:.0}%", (confidence.clamp(0.0, 1.0) * 100.0).round()))
        .style(Style::default().fg(Theme::confidence_color(confidence)))
}

fn weather_summary(day: &ForecastDay) -> String {
    let w = &day.raw_weather;
    format!(
        "{:.1} mm, {:.0}-{:.0}°C",
        w.precipitation_mm, w.temp_min_c, w.temp_max_c
    )
}

fn compact_row(day: &ForecastDay) -> Row<'static> {
    Row::new(vec![
        Cell::from(day.date.format("%a %d %b").to_string()),
        score_cell(day.rain_risk),
        score_cell(day.temp_extreme),
        moisture_cell(day.soil_moisture_proxy),
        confidence_cell(day.confidence_score),
        Cell::from(weather_summary(day)).style(Theme::dim()),
    ])
}

/// Adds raw weather and per-score bars beneath the compact values
fn expanded_row(day: &ForecastDay) -> Row<'static> {
    let w = &day.raw_weather;
    let bar_line = |label: &'static str, score: f64| {
        Line::from(vec![
            Span::styled(label, Theme::dim()),
            risk_bar(score, BAR_WIDTH),
        ])
    };

    let date_cell = Text::from(vec![
        Line::from(Span::styled(
            format!("▾ {}", day.date.format("%a %d %b")),
            Theme::highlight(),
        )),
        bar_line(" rain ", day.rain_risk),
        bar_line(" temp ", day.temp_extreme),
        // Dry soil is the risk, so the bar is inverted
        bar_line(" dry  ", 100.0 - day.soil_moisture_proxy),
    ]);

    let wind = w
        .wind_speed_ms
        .map(|v| format!("{:.1} m/s", v))
        .unwrap_or_else(|| "n/a".to_string());
    let weather_cell = Text::from(vec![
        Line::from(Span::styled(weather_summary(day), Theme::normal())),
        Line::from(Span::styled(
            format!("precip {:.1} mm", w.precipitation_mm),
            Theme::dim(),
        )),
        Line::from(Span::styled(
            format!("humidity {:.0}%", w.humidity_percent),
            Theme::dim(),
        )),
        Line::from(Span::styled(format!("wind {}", wind), Theme::dim())),
    ]);

    Row::new(vec![
        Cell::from(date_cell),
        score_cell(day.rain_risk),
        score_cell(day.temp_extreme),
        moisture_cell(day.soil_moisture_proxy),
        confidence_cell(day.confidence_score),
        Cell::from(weather_cell),
    ])
    .height(4)
}
