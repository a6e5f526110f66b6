use crate::{theme::Theme, ui::block};
use nowplaying_controls::models::{PlaybackState, Rgb};
use ratatui::{layout::Flex, prelude::*, widgets::*};
use ratatui_image::{StatefulImage, protocol::StatefulProtocol};

struct Colors {
    background: Color,
    foreground: Color,
    secondary: Color,
    gauge: Color,
}

impl Colors {
    fn new(state: &PlaybackState, theme: &Theme) -> Self {
        if !theme.use_palette {
            return Self {
                background: Color::Reset,
                foreground: Color::Reset,
                secondary: Color::DarkGray,
                gauge: theme.accent,
            };
        }

        let palette = state.palette;
        Self {
            background: color(palette.background),
            foreground: color(palette.foreground),
            secondary: color(palette.secondary_foreground),
            gauge: color(palette.foreground),
        }
    }
}

pub(crate) fn color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.r, rgb.g, rgb.b)
}

pub(crate) fn render(
    frame: &mut Frame,
    area: Rect,
    state: &PlaybackState,
    artwork: Option<&mut StatefulProtocol>,
    theme: &Theme,
) {
    let colors = Colors::new(state, theme);

    let title = status(state.is_playing);
    let total = Line::from(format!(" {} ", state.total_label())).right_aligned();
    let block = block(title, theme)
        .title_bottom(total)
        .style(Style::new().fg(colors.foreground).bg(colors.background))
        .border_style(Style::new().fg(colors.secondary));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    // Terminal cells are about twice as tall as wide.
    let artwork_width = inner.height.saturating_mul(2).min(inner.width / 2);
    let [artwork_area, info_area] =
        Layout::horizontal([Constraint::Length(artwork_width), Constraint::Min(1)])
            .spacing(1)
            .areas(inner);

    match artwork {
        Some(protocol) => {
            frame.render_stateful_widget(StatefulImage::default(), artwork_area, protocol)
        }
        None => render_placeholder(frame, artwork_area, colors.secondary),
    }

    let [text_area, gauge_area] =
        Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(info_area);

    let mut lines =
        vec![Line::from(state.title.clone()).style(Style::new().fg(colors.foreground).bold())];

    if let Some(artist) = &state.artist {
        lines.push(Line::from(artist.clone()).style(Style::new().fg(colors.secondary)));
    }

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), text_area);

    let label = format!("{} / {}", state.elapsed_label(), state.remaining_label());

    let gauge = Gauge::default()
        .ratio(state.progress())
        .gauge_style(Style::new().fg(colors.gauge).bg(colors.background))
        .label(label);

    frame.render_widget(gauge, gauge_area);
}

fn render_placeholder(frame: &mut Frame, area: Rect, color: Color) {
    if area.width < 3 || area.height < 3 {
        return;
    }

    let block = Block::bordered()
        .border_type(BorderType::Plain)
        .border_style(Style::new().fg(color));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let note = Paragraph::new("♪")
        .alignment(Alignment::Center)
        .style(Style::new().fg(color));
    let [middle] = Layout::vertical([Constraint::Length(1)])
        .flex(Flex::Center)
        .areas(inner);
    frame.render_widget(note, middle);
}

fn status(is_playing: bool) -> &'static str {
    match is_playing {
        true => "Playing ⏵",
        false => "Paused ⏸",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nowplaying_controls::models::Palette;
    use ratatui::backend::TestBackend;

    fn state() -> PlaybackState {
        PlaybackState {
            entry_id: "a".to_string(),
            title: "Harbour Lights".to_string(),
            artist: Some("The Quiet Tides".to_string()),
            is_playing: true,
            elapsed_seconds: 45.0,
            total_seconds: 180.0,
            artwork: None,
            palette: Palette {
                background: Rgb::new(20, 30, 40),
                foreground: Rgb::new(240, 200, 10),
                secondary_foreground: Rgb::WHITE,
            },
        }
    }

    fn draw(state: &PlaybackState, theme: &Theme) -> Terminal<TestBackend> {
        let mut terminal = Terminal::new(TestBackend::new(60, 10)).unwrap();
        terminal
            .draw(|frame| render(frame, frame.area(), state, None, theme))
            .unwrap();
        terminal
    }

    fn text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn shows_metadata_and_countdown() {
        let terminal = draw(&state(), &Theme::default());
        let text = text(&terminal);

        assert!(text.contains("Playing"));
        assert!(text.contains("Harbour Lights"));
        assert!(text.contains("The Quiet Tides"));
        assert!(text.contains("00:45 / -02:15"));
        assert!(text.contains(" 03:00 "));
    }

    #[test]
    fn paints_with_the_palette() {
        let terminal = draw(&state(), &Theme::default());
        let buffer = terminal.backend().buffer();

        assert_eq!(buffer.cell((1, 1)).unwrap().bg, Color::Rgb(20, 30, 40));
        assert_eq!(buffer.cell((0, 0)).unwrap().fg, Color::Rgb(255, 255, 255));
    }

    #[test]
    fn plain_theme_ignores_the_palette() {
        let theme = Theme {
            use_palette: false,
            ..Theme::default()
        };
        let terminal = draw(&state(), &theme);
        let buffer = terminal.backend().buffer();

        assert_eq!(buffer.cell((1, 1)).unwrap().bg, Color::Reset);
    }

    #[test]
    fn paused_and_unknown_duration() {
        let state = PlaybackState {
            is_playing: false,
            elapsed_seconds: 12.0,
            total_seconds: 0.0,
            artist: None,
            ..state()
        };

        let text = text(&draw(&state, &Theme::default()));

        assert!(text.contains("Paused"));
        assert!(text.contains("00:12 / 00:00"));
        assert!(!text.contains("The Quiet Tides"));
    }
}
