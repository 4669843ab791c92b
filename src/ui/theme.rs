use crate::models::{MoistureLevel, RiskLevel};
use ratatui::style::{Color, Modifier, Style};

pub struct Theme;

impl Theme {
    // Base colors
    pub const FG: Color = Color::White;
    pub const DIM: Color = Color::DarkGray;
    pub const ACCENT: Color = Color::Green;
    pub const HIGHLIGHT: Color = Color::Cyan;

    // Status colors
    pub const SUCCESS: Color = Color::Green;
    pub const WARNING: Color = Color::Yellow;
    pub const ERROR: Color = Color::Red;

    // Risk colors
    pub const RISK_LOW: Color = Color::Green;
    pub const RISK_MODERATE: Color = Color::Yellow;
    pub const RISK_HIGH: Color = Color::Red;
    pub const MOISTURE_DRY: Color = Color::Yellow;
    pub const MOISTURE_OK: Color = Color::Green;
    pub const MOISTURE_WET: Color = Color::LightBlue;

    // Styles
    pub fn title() -> Style {
        Style::default()
            .fg(Self::ACCENT)
            .add_modifier(Modifier::BOLD)
    }

    pub fn header() -> Style {
        Style::default().fg(Self::FG).add_modifier(Modifier::BOLD)
    }

    pub fn normal() -> Style {
        Style::default().fg(Self::FG)
    }

    pub fn dim() -> Style {
        Style::default().fg(Self::DIM)
    }

    pub fn highlight() -> Style {
        Style::default()
            .fg(Self::HIGHLIGHT)
            .add_modifier(Modifier::BOLD)
    }

    pub fn selected() -> Style {
        Style::default()
            .bg(Color::DarkGray)
            .fg(Self::FG)
            .add_modifier(Modifier::BOLD)
    }

    pub fn success() -> Style {
        Style::default().fg(Self::SUCCESS)
    }

    pub fn warning() -> Style {
        Style::default().fg(Self::WARNING)
    }

    pub fn error() -> Style {
        Style::default().fg(Self::ERROR).add_modifier(Modifier::BOLD)
    }

    /// Color for a 0-100 risk score; grey when there is no data
    pub fn risk_color(score: f64) -> Color {
        RiskLevel::from_score(score)
            .map(|level| level.color())
            .unwrap_or(Self::DIM)
    }

    pub fn moisture_color(moisture: f64) -> Color {
        match MoistureLevel::from_proxy(moisture) {
            Some(MoistureLevel::Dry) => Self::MOISTURE_DRY,
            Some(MoistureLevel::Optimal) => Self::MOISTURE_OK,
            Some(MoistureLevel::Saturated) => Self::MOISTURE_WET,
            None => Self::DIM,
        }
    }

    pub fn confidence_color(confidence: f64) -> Color {
        if confidence >= 0.8 {
            Self::SUCCESS
        } else if confidence >= 0.6 {
            Self::WARNING
        } else {
            Self::ERROR
        }
    }

    /// Heatmap cell color, cool to hot
    pub fn intensity_color(intensity: f64) -> Color {
        let i = intensity.clamp(0.0, 1.0);
        if i < 0.2 {
            Color::Blue
        } else if i < 0.4 {
            Color::Cyan
        } else if i < 0.6 {
            Color::Green
        } else if i < 0.8 {
            Color::Yellow
        } else {
            Color::Red
        }
    }

    pub fn nav_key() -> Style {
        Style::default()
            .fg(Self::ACCENT)
            .add_modifier(Modifier::BOLD)
    }

    pub fn nav_label() -> Style {
        Style::default().fg(Self::DIM)
    }

    pub fn border() -> Style {
        Style::default().fg(Self::DIM)
    }

    pub fn border_focused() -> Style {
        Style::default().fg(Self::ACCENT)
    }
}
