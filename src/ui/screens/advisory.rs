use crate::app::LoadState;
use crate::models::{Advisory, MetricSummary};
use crate::ui::components::{render_load_state, render_nav, render_status_message, risk_bar};
use crate::ui::Theme;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Widget, Wrap},
};

pub struct AdvisoryScreen<'a> {
    pub advisory: Option<&'a Advisory>,
    pub advisory_error: Option<&'a str>,
    pub load_state: &'a LoadState,
    pub status_message: Option<&'a str>,
}

impl<'a> AdvisoryScreen<'a> {
    pub fn new(advisory: Option<&'a Advisory>, load_state: &'a LoadState) -> Self {
        Self {
            advisory,
            advisory_error: None,
            load_state,
            status_message: None,
        }
    }

    pub fn with_error(mut self, error: Option<&'a str>) -> Self {
        self.advisory_error = error;
        self
    }

    pub fn with_status(mut self, status: Option<&'a str>) -> Self {
        self.status_message = status;
        self
    }
}

impl Widget for AdvisoryScreen<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Title
                Constraint::Min(10),   // Content
                Constraint::Length(1), // Status message
                Constraint::Length(1), // Nav
            ])
            .split(area);

        let mut title = vec![Span::styled("Advisory", Theme::title())];
        if let Some(a) = self.advisory {
            title.push(Span::styled(
                format!(
                    " - {} / {} / {}",
                    a.filters.region, a.filters.crop, a.filters.season
                ),
                Theme::dim(),
            ));
        }
        Paragraph::new(Line::from(title)).render(chunks[0], buf);

        if !render_load_state(chunks[1], buf, self.load_state) {
            match self.advisory {
                Some(advisory) => {
                    let content = Layout::default()
                        .direction(Direction::Horizontal)
                        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
                        .split(chunks[1]);
                    render_recommendations(advisory, content[0], buf);
                    render_details(advisory, content[1], buf);
                }
                None => {
                    let msg = self.advisory_error.unwrap_or("No advisory available");
                    Paragraph::new(Span::styled(msg, Theme::warning()))
                        .block(
                            Block::default()
                                .borders(Borders::ALL)
                                .border_style(Theme::border()),
                        )
                        .render(chunks[1], buf);
                }
            }
        }

        render_status_message(chunks[2], buf, self.status_message);
        render_nav(chunks[3], buf, &[("[+/-]", "Window ")]);
    }
}

fn render_recommendations(advisory: &Advisory, area: Rect, buf: &mut Buffer) {
    let block = Block::default()
        .title("Recommendations")
        .borders(Borders::ALL)
        .border_style(Theme::border());

    let inner = block.inner(area);
    block.render(area, buf);

    let width = inner.width.saturating_sub(2).max(10) as usize;
    let items: Vec<ListItem> = advisory
        .recommendations
        .iter()
        .map(|rec| {
            // Wrap by hand; List items do not wrap
            let lines: Vec<Line> = wrap_words(rec, width)
                .into_iter()
                .enumerate()
                .map(|(i, text)| {
                    let prefix = if i == 0 { "• " } else { "  " };
                    Line::from(vec![
                        Span::styled(prefix, Theme::success()),
                        Span::styled(text, Theme::normal()),
                    ])
                })
                .collect();
            ListItem::new(lines)
        })
        .collect();

    List::new(items).render(inner, buf);
}

fn render_details(advisory: &Advisory, area: Rect, buf: &mut Buffer) {
    let block = Block::default()
        .title("Outlook")
        .borders(Borders::ALL)
        .border_style(Theme::border());

    let inner = block.inner(area);
    block.render(area, buf);

    let risk = &advisory.risk;
    let y = &advisory.yield_estimate;
    let f = &advisory.factors;

    let mut lines = vec![
        metric_line("Rain ", &risk.rain_risk),
        metric_line("Temp ", &risk.temp_extreme),
        metric_line("Soil ", &risk.soil_moisture),
        Line::from(vec![
            Span::styled("Confidence ", Theme::dim()),
            match risk.mean_confidence {
                Some(c) => Span::styled(
                    format!("{:.0}%", c * 100.0),
                    Style::default().fg(Theme::confidence_color(c)),
                ),
                None => Span::styled("n/a", Theme::dim()),
            },
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("Yield ", Theme::dim()),
            Span::styled(format!("{:.2} {}", y.predicted, y.unit), Theme::highlight()),
        ]),
        Line::from(Span::styled(
            format!("  range {:.2} to {:.2}", y.low, y.high),
            Theme::dim(),
        )),
        Line::from(Span::styled(
            format!(
                "  factors rain {:.2} x temp {:.2} x moisture {:.2}",
                f.rain, f.temperature, f.moisture
            ),
            Theme::dim(),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!(
                "{:.1} mm over {} days",
                risk.total_precipitation_mm, risk.window_days
            ),
            Theme::normal(),
        )),
    ];

    if risk.reduced_window {
        lines.push(Line::from(Span::styled(
            format!(
                "Only {} of {} requested days available",
                risk.window_days, risk.requested_window
            ),
            Theme::warning(),
        )));
    }
    if risk.confidence_adjusted {
        lines.push(Line::from(Span::styled(
            "Upstream confidence rose with lead time and was capped",
            Theme::warning(),
        )));
    }

    Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .render(inner, buf);
}

fn metric_line(label: &'static str, metric: &MetricSummary) -> Line<'static> {
    let level = metric
        .level
        .map(|l| l.label().to_string())
        .unwrap_or_else(|| "no data".to_string());
    Line::from(vec![
        Span::styled(label, Theme::dim()),
        risk_bar(metric.mean.unwrap_or(f64::NAN), 10),
        Span::styled(format!(" {}", level), Theme::normal()),
    ])
}

/// Greedy word wrap to `width` columns
fn wrap_words(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
