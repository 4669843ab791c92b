use crate::config::Config;
use crate::models::{AdvisoryFilters, Crop, Region, Season};
use crate::ui::components::{render_nav, render_status_message};
use crate::ui::Theme;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    Region,
    Crop,
    Season,
}

impl SettingsField {
    pub fn all() -> &'static [SettingsField] {
        &[SettingsField::Region, SettingsField::Crop, SettingsField::Season]
    }

    pub fn label(&self) -> &'static str {
        match self {
            SettingsField::Region => "Region",
            SettingsField::Crop => "Crop",
            SettingsField::Season => "Season",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            SettingsField::Region => SettingsField::Crop,
            SettingsField::Crop => SettingsField::Season,
            SettingsField::Season => SettingsField::Region,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            SettingsField::Region => SettingsField::Season,
            SettingsField::Crop => SettingsField::Region,
            SettingsField::Season => SettingsField::Crop,
        }
    }
}

pub struct SettingsScreen<'a> {
    pub filters: &'a AdvisoryFilters,
    pub config: &'a Config,
    pub window_days: usize,
    pub focused_field: SettingsField,
    pub status_message: Option<&'a str>,
}

impl<'a> SettingsScreen<'a> {
    pub fn new(filters: &'a AdvisoryFilters, config: &'a Config) -> Self {
        Self {
            filters,
            config,
            window_days: 0,
            focused_field: SettingsField::Region,
            status_message: None,
        }
    }

    pub fn with_focus(mut self, field: SettingsField) -> Self {
        self.focused_field = field;
        self
    }

    pub fn with_window(mut self, window_days: usize) -> Self {
        self.window_days = window_days;
        self
    }

    pub fn with_status(mut self, status: Option<&'a str>) -> Self {
        self.status_message = status;
        self
    }

    fn get_field_value(&self, field: SettingsField) -> &'static str {
        match field {
            SettingsField::Region => self.filters.region.as_str(),
            SettingsField::Crop => self.filters.crop.as_str(),
            SettingsField::Season => self.filters.season.as_str(),
        }
    }

    fn options(field: SettingsField) -> Vec<&'static str> {
        match field {
            SettingsField::Region => Region::ALL.iter().map(|r| r.as_str()).collect(),
            SettingsField::Crop => Crop::ALL.iter().map(|c| c.as_str()).collect(),
            SettingsField::Season => Season::ALL.iter().map(|s| s.as_str()).collect(),
        }
    }
}

impl Widget for SettingsScreen<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Title
                Constraint::Length(11), // Form (3 fields * 3 lines + borders)
                Constraint::Min(6),    // Help and forecast source
                Constraint::Length(1), // Status message
                Constraint::Length(1), // Nav
            ])
            .split(area);

        let title = Line::from(vec![
            Span::styled("Settings", Theme::title()),
            Span::styled(" - Advisory Filters", Theme::dim()),
        ]);
        Paragraph::new(title).render(chunks[0], buf);

        self.render_form(chunks[1], buf);
        self.render_help(chunks[2], buf);

        render_status_message(chunks[3], buf, self.status_message);
        render_nav(
            chunks[4],
            buf,
            &[("[↑↓]", "Field "), ("[←→]", "Change "), ("[Esc]", "Back ")],
        );
    }
}

impl SettingsScreen<'_> {
    fn render_form(&self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title("Filters")
            .borders(Borders::ALL)
            .border_style(Theme::border());

        let inner = block.inner(area);
        block.render(area, buf);

        let constraints: Vec<Constraint> = SettingsField::all()
            .iter()
            .map(|_| Constraint::Length(3))
            .collect();
        let field_areas = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(inner);

        for (i, field) in SettingsField::all().iter().enumerate() {
            let is_focused = *field == self.focused_field;

            let (border_style, value_style) = if is_focused {
                (Theme::border_focused(), Theme::selected())
            } else {
                (Theme::border(), Theme::normal())
            };

            let field_block = Block::default()
                .title(field.label())
                .borders(Borders::ALL)
                .border_style(border_style);
            let field_inner = field_block.inner(field_areas[i]);
            field_block.render(field_areas[i], buf);

            let value = if is_focused {
                format!("◀ {} ▶", self.get_field_value(*field))
            } else {
                self.get_field_value(*field).to_string()
            };
            Paragraph::new(Span::styled(value, value_style)).render(field_inner, buf);
        }
    }

    fn render_help(&self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title("Field Options")
            .borders(Borders::ALL)
            .border_style(Theme::border());

        let inner = block.inner(area);
        block.render(area, buf);

        let point = self.config.query_point(self.filters);
        let refetch_note = match self.focused_field {
            SettingsField::Region if self.config.location.is_none() => {
                "Changing region re-fetches the forecast for its district."
            }
            SettingsField::Region => "A fixed location is configured; region only labels the advisory.",
            _ => "Changing this recomputes the advisory from the loaded forecast.",
        };

        let lines = vec![
            Line::from(Span::styled(
                format!("Options: {}", Self::options(self.focused_field).join(", ")),
                Theme::normal(),
            )),
            Line::from(Span::styled(refetch_note, Theme::dim())),
            Line::from(""),
            Line::from(vec![
                Span::styled("Query point ", Theme::dim()),
                Span::styled(point.to_string(), Theme::normal()),
                Span::styled(
                    format!(
                        "  horizon {} days, window {} days",
                        self.config.forecast.horizon_days, self.window_days
                    ),
                    Theme::dim(),
                ),
            ]),
        ];

        Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .render(inner, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_cycle_wraps_both_ways() {
        for field in SettingsField::all() {
            assert_eq!(field.next().prev(), *field);
        }
        assert_eq!(SettingsField::Season.next(), SettingsField::Region);
    }
}
