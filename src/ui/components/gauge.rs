use crate::models::{HIGH_THRESHOLD, MODERATE_THRESHOLD};
use crate::ui::Theme;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

pub struct GaugeWidget<'a> {
    title: &'a str,
    value: Option<f64>,
    unit: &'a str,
    min: f64,
    max: f64,
    thresholds: Vec<(f64, Color)>,
    precision: usize,
    caption: Option<&'a str>,
}

impl<'a> GaugeWidget<'a> {
    pub fn new(title: &'a str, value: Option<f64>, unit: &'a str) -> Self {
        Self {
            title,
            value: value.filter(|v| v.is_finite()),
            unit,
            min: 0.0,
            max: 100.0,
            thresholds: Vec::new(),
            precision: 1,
            caption: None,
        }
    }

    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn thresholds(mut self, thresholds: Vec<(f64, Color)>) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    /// Short label shown after the value, e.g. the risk bucket
    pub fn caption(mut self, caption: Option<&'a str>) -> Self {
        self.caption = caption;
        self
    }

    fn get_color(&self, value: f64) -> Color {
        for (threshold, color) in self.thresholds.iter().rev() {
            if value >= *threshold {
                return *color;
            }
        }
        Theme::FG
    }
}

impl Widget for GaugeWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height < 3 || area.width < 10 {
            return;
        }

        let block = Block::default()
            .title(self.title)
            .borders(Borders::ALL)
            .border_style(Theme::border());

        let inner = block.inner(area);
        block.render(area, buf);

        match self.value {
            Some(value) => {
                let value = value.clamp(self.min, self.max);
                let color = self.get_color(value);
                let value_str = format!("{:.prec$}{}", value, self.unit, prec = self.precision);

                let mut spans = vec![Span::styled(value_str, Style::default().fg(color))];
                if let Some(caption) = self.caption {
                    spans.push(Span::styled(format!(" {}", caption), Theme::dim()));
                }
                Paragraph::new(Line::from(spans)).render(inner, buf);

                if inner.height >= 2 {
                    let bar_area = Rect {
                        x: inner.x,
                        y: inner.y + 1,
                        width: inner.width,
                        height: 1,
                    };
                    render_bar(bar_area, buf, (value - self.min) / (self.max - self.min), color);
                }
            }
            None => {
                let na_line = Line::from(vec![Span::styled("No data", Theme::dim())]);
                Paragraph::new(na_line).render(inner, buf);
            }
        }
    }
}

/// One-row block bar filled to `ratio` of the area width
pub fn render_bar(area: Rect, buf: &mut Buffer, ratio: f64, color: Color) {
    let ratio = if ratio.is_finite() {
        ratio.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let filled = (area.width as f64 * ratio) as u16;

    for x in area.x..area.x + area.width {
        let ch = if x < area.x + filled { '█' } else { '░' };
        buf[(x, area.y)].set_char(ch).set_fg(color);
    }
}

/// Text bar for inline use in tables and lists
pub fn risk_bar(score: f64, width: usize) -> Span<'static> {
    if !score.is_finite() {
        return Span::styled("-".repeat(width), Theme::dim());
    }
    let ratio = score.clamp(0.0, 100.0) / 100.0;
    let filled = (width as f64 * ratio).round() as usize;
    let bar = format!("{}{}", "█".repeat(filled), "░".repeat(width - filled));
    Span::styled(bar, Style::default().fg(Theme::risk_color(score)))
}

pub fn risk_gauge<'a>(title: &'a str, value: Option<f64>, caption: Option<&'a str>) -> GaugeWidget<'a> {
    GaugeWidget::new(title, value, "")
        .precision(0)
        .caption(caption)
        .thresholds(vec![
            (0.0, Theme::RISK_LOW),
            (MODERATE_THRESHOLD, Theme::RISK_MODERATE),
            (HIGH_THRESHOLD, Theme::RISK_HIGH),
        ])
}

pub fn moisture_gauge<'a>(title: &'a str, value: Option<f64>, caption: Option<&'a str>) -> GaugeWidget<'a> {
    GaugeWidget::new(title, value, "%")
        .range(0.0, 100.0)
        .precision(0)
        .caption(caption)
        .thresholds(vec![
            (0.0, Theme::MOISTURE_DRY),
            (30.0, Theme::MOISTURE_OK),
            (80.0, Theme::MOISTURE_WET),
        ])
}

pub fn confidence_gauge(title: &str, value: Option<f64>) -> GaugeWidget<'_> {
    GaugeWidget::new(title, value.map(|c| c * 100.0), "%")
        .precision(0)
        .thresholds(vec![
            (0.0, Theme::ERROR),
            (60.0, Theme::WARNING),
            (80.0, Theme::SUCCESS),
        ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_bar_width_is_constant() {
        for score in [-10.0, 0.0, 33.0, 100.0, 400.0] {
            let span = risk_bar(score, 10);
            assert_eq!(span.content.chars().count(), 10);
        }
        assert_eq!(risk_bar(f64::NAN, 4).content, "----");
        assert_eq!(risk_bar(50.0, 4).content, "██░░");
    }

    #[test]
    fn gauge_renders_no_data() {
        let area = Rect::new(0, 0, 20, 4);
        let mut buf = Buffer::empty(area);
        risk_gauge("Rain", Some(f64::NAN), None).render(area, &mut buf);
        let text: String = (0..area.width)
            .map(|x| buf[(x, 1)].symbol().to_string())
            .collect();
        assert!(text.contains("No data"));
    }
}
