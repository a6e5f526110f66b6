use ratatui::{style::Color, widgets::BorderType};

/// Style configuration for every view the terminal front-end draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub border_type: BorderType,
    pub accent: Color,
    pub warning: Color,
    pub error: Color,
    /// Paint the now playing view with the colors extracted from the
    /// artwork. Otherwise the terminal's own colors and `accent` are used.
    pub use_palette: bool,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            border_type: BorderType::Rounded,
            accent: Color::Blue,
            warning: Color::Yellow,
            error: Color::Red,
            use_palette: true,
        }
    }
}
