use crate::app::LoadState;
use crate::models::{BoundingBox, ForecastDay, HeatmapSample, Location, RiskMetric};
use crate::ui::components::{render_load_state, render_nav, render_status_message};
use crate::ui::Theme;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

pub struct HeatmapScreen<'a> {
    pub samples: &'a [HeatmapSample],
    pub bounds: BoundingBox,
    pub step_deg: f64,
    pub metric: RiskMetric,
    pub day: Option<&'a ForecastDay>,
    pub location: Option<&'a Location>,
    pub load_state: &'a LoadState,
    pub status_message: Option<&'a str>,
}

impl<'a> HeatmapScreen<'a> {
    pub fn new(
        samples: &'a [HeatmapSample],
        bounds: BoundingBox,
        step_deg: f64,
        load_state: &'a LoadState,
    ) -> Self {
        Self {
            samples,
            bounds,
            step_deg,
            metric: RiskMetric::RainRisk,
            day: None,
            location: None,
            load_state,
            status_message: None,
        }
    }

    pub fn with_selection(
        mut self,
        metric: RiskMetric,
        day: Option<&'a ForecastDay>,
        location: Option<&'a Location>,
    ) -> Self {
        self.metric = metric;
        self.day = day;
        self.location = location;
        self
    }

    pub fn with_status(mut self, status: Option<&'a str>) -> Self {
        self.status_message = status;
        self
    }
}

impl Widget for HeatmapScreen<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2), // Header
                Constraint::Min(8),    // Map
                Constraint::Length(1), // Legend
                Constraint::Length(1), // Status message
                Constraint::Length(1), // Nav
            ])
            .split(area);

        self.render_header(chunks[0], buf);

        if !render_load_state(chunks[1], buf, self.load_state) {
            self.render_map(chunks[1], buf);
            render_legend(chunks[2], buf);
        }

        render_status_message(chunks[3], buf, self.status_message);
        render_nav(
            chunks[4],
            buf,
            &[("[←→]", "Day "), ("[m]", "Metric ")],
        );
    }
}

impl HeatmapScreen<'_> {
    fn render_header(&self, area: Rect, buf: &mut Buffer) {
        let day = self
            .day
            .map(|d| d.date.format("%a %d %b %Y").to_string())
            .unwrap_or_else(|| "-".to_string());

        let block = Block::default()
            .title(Span::styled("Risk Heatmap", Theme::title()))
            .borders(Borders::BOTTOM)
            .border_style(Theme::border());
        let info = Line::from(vec![
            Span::styled(self.metric.as_str(), Theme::highlight()),
            Span::styled(format!("  {}", day), Theme::normal()),
            Span::styled("  (illustrative shading, single-point forecast)", Theme::dim()),
        ]);
        Paragraph::new(info).block(block).render(area, buf);
    }

    fn render_map(&self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Theme::border());
        let inner = block.inner(area);
        block.render(area, buf);

        if inner.width == 0 || inner.height == 0 {
            return;
        }
        if self.samples.is_empty() {
            Paragraph::new(Span::styled("No data for this day", Theme::dim())).render(inner, buf);
            return;
        }

        let cells = map_cells(self.samples, &self.bounds, self.step_deg, inner.width, inner.height);
        for (row, line) in cells.iter().enumerate() {
            for (col, intensity) in line.iter().enumerate() {
                let x = inner.x + col as u16;
                let y = inner.y + row as u16;
                match intensity {
                    Some(i) => {
                        buf[(x, y)]
                            .set_char('█')
                            .set_style(Style::default().fg(Theme::intensity_color(*i)));
                    }
                    None => {
                        buf[(x, y)].set_char('·').set_style(Theme::dim());
                    }
                }
            }
        }

        if let Some(loc) = self.location {
            if let Some((col, row)) = to_cell(&self.bounds, loc.latitude, loc.longitude, inner.width, inner.height) {
                buf[(inner.x + col, inner.y + row)]
                    .set_char('◉')
                    .set_style(Theme::header());
            }
        }
    }
}

fn render_legend(area: Rect, buf: &mut Buffer) {
    let mut spans = vec![Span::styled("low ", Theme::dim())];
    for i in [0.1, 0.3, 0.5, 0.7, 0.9] {
        spans.push(Span::styled(
            "██",
            Style::default().fg(Theme::intensity_color(i)),
        ));
    }
    spans.push(Span::styled(" high", Theme::dim()));
    Paragraph::new(Line::from(spans)).render(area, buf);
}

/// Terminal cell for a coordinate, north at the top
fn to_cell(bounds: &BoundingBox, latitude: f64, longitude: f64, width: u16, height: u16) -> Option<(u16, u16)> {
    if !bounds.contains(latitude, longitude) || width == 0 || height == 0 {
        return None;
    }
    let fx = (longitude - bounds.lon_min) / (bounds.lon_max - bounds.lon_min);
    let fy = (bounds.lat_max - latitude) / (bounds.lat_max - bounds.lat_min);
    let col = ((fx * width as f64) as u16).min(width - 1);
    let row = ((fy * height as f64) as u16).min(height - 1);
    Some((col, row))
}

/// Rasterize samples onto a `width` x `height` grid covering `bounds`.
/// Each cell takes the nearest sample in reach, or stays empty.
pub fn map_cells(
    samples: &[HeatmapSample],
    bounds: &BoundingBox,
    step_deg: f64,
    width: u16,
    height: u16,
) -> Vec<Vec<Option<f64>>> {
    let lat_span = bounds.lat_max - bounds.lat_min;
    let lon_span = bounds.lon_max - bounds.lon_min;
    // A sample covers half a grid step, or half a cell when cells are coarser
    let lat_reach = (step_deg / 2.0).max(lat_span / height as f64 / 2.0);
    let lon_reach = (step_deg / 2.0).max(lon_span / width as f64 / 2.0);

    (0..height)
        .map(|row| {
            let latitude = bounds.lat_max - (row as f64 + 0.5) / height as f64 * lat_span;
            (0..width)
                .map(|col| {
                    let longitude = bounds.lon_min + (col as f64 + 0.5) / width as f64 * lon_span;
                    samples
                        .iter()
                        .filter(|s| {
                            (s.latitude - latitude).abs() <= lat_reach
                                && (s.longitude - longitude).abs() <= lon_reach
                        })
                        .min_by(|a, b| {
                            let da = (a.latitude - latitude).hypot(a.longitude - longitude);
                            let db = (b.latitude - latitude).hypot(b.longitude - longitude);
                            da.total_cmp(&db)
                        })
                        .map(|s| s.intensity)
                })
                .collect()
        })
        .collect()
}
