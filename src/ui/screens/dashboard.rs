use crate::app::LoadState;
use crate::models::{Advisory, AdvisoryFilters, ForecastSeries};
use crate::ui::components::{
    confidence_gauge, moisture_gauge, render_load_state, render_nav, render_status_message,
    risk_gauge,
};
use crate::ui::Theme;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

pub struct DashboardScreen<'a> {
    pub filters: &'a AdvisoryFilters,
    pub series: Option<&'a ForecastSeries>,
    pub advisory: Option<&'a Advisory>,
    pub advisory_error: Option<&'a str>,
    pub load_state: &'a LoadState,
    pub source_name: &'a str,
    pub status_message: Option<&'a str>,
}

impl<'a> DashboardScreen<'a> {
    pub fn new(filters: &'a AdvisoryFilters, load_state: &'a LoadState) -> Self {
        Self {
            filters,
            series: None,
            advisory: None,
            advisory_error: None,
            load_state,
            source_name: "",
            status_message: None,
        }
    }

    pub fn with_data(
        mut self,
        series: Option<&'a ForecastSeries>,
        advisory: Option<&'a Advisory>,
        advisory_error: Option<&'a str>,
    ) -> Self {
        self.series = series;
        self.advisory = advisory;
        self.advisory_error = advisory_error;
        self
    }

    pub fn with_source(mut self, source_name: &'a str) -> Self {
        self.source_name = source_name;
        self
    }

    pub fn with_status(mut self, status: Option<&'a str>) -> Self {
        self.status_message = status;
        self
    }
}

impl Widget for DashboardScreen<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4), // Header
                Constraint::Length(5), // Gauges row
                Constraint::Min(6),    // Summary
                Constraint::Length(1), // Status message
                Constraint::Length(1), // Nav bar
            ])
            .split(area);

        self.render_header(chunks[0], buf);

        let body = Rect {
            height: chunks[1].height + chunks[2].height,
            ..chunks[1]
        };
        if !render_load_state(body, buf, self.load_state) {
            self.render_gauges(chunks[1], buf);
            self.render_summary(chunks[2], buf);
        }

        render_status_message(chunks[3], buf, self.status_message);
        render_nav(chunks[4], buf, &[]);
    }
}

impl DashboardScreen<'_> {
    fn render_header(&self, area: Rect, buf: &mut Buffer) {
        let title = format!(
            "ClimaSense - {} ({}, {})",
            self.filters.region, self.filters.crop, self.filters.season
        );

        let block = Block::default()
            .title(Span::styled(title, Theme::title()))
            .borders(Borders::BOTTOM)
            .border_style(Theme::border());

        let lines = match self.series {
            Some(series) => {
                let loc = series.location();
                let meta = series.metadata();
                vec![
                    Line::from(vec![
                        Span::styled(loc.region.as_str(), Theme::normal()),
                        Span::styled(
                            format!(" ({:.4}, {:.4})", loc.latitude, loc.longitude),
                            Theme::dim(),
                        ),
                        Span::styled(format!("  via {}", self.source_name), Theme::dim()),
                    ]),
                    Line::from(Span::styled(
                        format!(
                            "Model {} | generated {} | cache {} | {} ms",
                            meta.model_version,
                            meta.generated_at.format("%Y-%m-%d %H:%M UTC"),
                            if meta.cache_hit { "hit" } else { "miss" },
                            meta.inference_time_ms
                        ),
                        Theme::dim(),
                    )),
                ]
            }
            None => vec![Line::from(Span::styled("No forecast loaded", Theme::dim()))],
        };

        Paragraph::new(lines).block(block).render(area, buf);
    }

    fn render_gauges(&self, area: Rect, buf: &mut Buffer) {
        let gauge_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(25),
                Constraint::Percentage(25),
                Constraint::Percentage(25),
                Constraint::Percentage(25),
            ])
            .split(area);

        let risk = self.advisory.map(|a| &a.risk);

        let rain = risk.and_then(|r| r.rain_risk.mean);
        let rain_level = risk.and_then(|r| r.rain_risk.level).map(|l| l.label());
        risk_gauge("Rain Risk", rain, rain_level).render(gauge_chunks[0], buf);

        let temp = risk.and_then(|r| r.temp_extreme.mean);
        let temp_level = risk.and_then(|r| r.temp_extreme.level).map(|l| l.label());
        risk_gauge("Temp Extreme", temp, temp_level).render(gauge_chunks[1], buf);

        let moisture = risk.and_then(|r| r.soil_moisture.mean);
        let moisture_level = risk.and_then(|r| r.moisture_level).map(|l| l.as_str());
        moisture_gauge("Soil Moisture", moisture, moisture_level).render(gauge_chunks[2], buf);

        let confidence = risk.and_then(|r| r.mean_confidence);
        confidence_gauge("Confidence", confidence).render(gauge_chunks[3], buf);
    }

    fn render_summary(&self, area: Rect, buf: &mut Buffer) {
        let title = match self.advisory {
            Some(a) => format!("{}-day Outlook", a.risk.window_days),
            None => "Outlook".to_string(),
        };
        let block = Block::default()
            .title(Span::styled(title, Theme::header()))
            .borders(Borders::ALL)
            .border_style(Theme::border());

        let lines = match (self.advisory, self.advisory_error) {
            (Some(advisory), _) => {
                let y = &advisory.yield_estimate;
                vec![
                    Line::from(Span::styled(advisory.summary.as_str(), Theme::normal())),
                    Line::from(""),
                    Line::from(vec![
                        Span::styled("Yield ", Theme::dim()),
                        Span::styled(
                            format!("{:.2} {}", y.predicted, y.unit),
                            Theme::highlight(),
                        ),
                        Span::styled(
                            format!(" (range {:.2}-{:.2})", y.low, y.high),
                            Theme::dim(),
                        ),
                    ]),
                ]
            }
            (None, Some(err)) => vec![Line::from(Span::styled(err, Theme::warning()))],
            (None, None) => vec![Line::from(Span::styled("No advisory", Theme::dim()))],
        };

        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: true })
            .render(area, buf);
    }
}
