use crate::app::LoadState;
use crate::ui::Theme;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

/// Bottom key hint bar. Screen-specific keys come first, the global ones
/// are appended.
pub fn render_nav(area: Rect, buf: &mut Buffer, keys: &[(&str, &str)]) {
    let global = [
        ("[1-4]", "Screens "),
        ("[s]", "Settings "),
        ("[r]", "Refresh "),
        ("[q]", "Quit"),
    ];
    let spans: Vec<Span> = keys
        .iter()
        .chain(global.iter())
        .flat_map(|(key, label)| {
            [
                Span::styled(*key, Theme::nav_key()),
                Span::styled(*label, Theme::nav_label()),
            ]
        })
        .collect();
    Paragraph::new(Line::from(spans)).render(area, buf);
}

pub fn render_status_message(area: Rect, buf: &mut Buffer, message: Option<&str>) {
    if let Some(msg) = message {
        let lower = msg.to_lowercase();
        let style = if lower.contains("failed") || lower.contains("timed out") {
            Theme::warning()
        } else {
            Theme::success()
        };
        Paragraph::new(Span::styled(msg, style)).render(area, buf);
    }
}

/// Draw the placeholder for any state other than `Ready`. Returns false
/// when the caller should draw its content instead.
pub fn render_load_state(area: Rect, buf: &mut Buffer, state: &LoadState) -> bool {
    let lines = match state {
        LoadState::Ready => return false,
        LoadState::Loading => vec![Line::from(Span::styled(
            "Loading forecast...",
            Theme::highlight(),
        ))],
        LoadState::Empty => vec![
            Line::from(Span::styled("No forecast data", Theme::header())),
            Line::from(Span::styled(
                "The forecast service returned zero days for this location.",
                Theme::dim(),
            )),
        ],
        LoadState::Failed(message) => vec![
            Line::from(Span::styled("Could not load forecast", Theme::error())),
            Line::from(Span::styled(message.as_str(), Theme::normal())),
            Line::from(""),
            Line::from(vec![
                Span::styled("[r]", Theme::nav_key()),
                Span::styled(" Try again", Theme::nav_label()),
            ]),
        ],
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Theme::border());
    Paragraph::new(lines)
        .block(block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(area, buf);
    true
}
