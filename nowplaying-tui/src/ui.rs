use nowplaying_controls::notification::Notification;
use ratatui::{layout::Flex, prelude::*, widgets::*};

use crate::{app::App, authorization, now_playing, theme::Theme};

const KEY_HINTS: &str = "space play/pause   n next   p previous   q quit";

impl App {
    pub(crate) fn render(&mut self, frame: &mut Frame) {
        let [main, footer] =
            Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(frame.area());

        let theme = self.theme;
        let gate = *self.gate.borrow();
        let playback = self.playback.borrow().clone();

        match (gate.player_visible, playback) {
            (false, _) => authorization::render(frame, main, gate.status, &theme),
            (true, Some(state)) => {
                let artwork = self.artwork_for(&state);
                now_playing::render(frame, main, &state, artwork, &theme)
            }
            (true, None) => render_idle(frame, main, &theme),
        }

        render_footer(
            frame,
            footer,
            self.notification.as_ref().map(|(notification, _)| notification),
            &theme,
        );
    }
}

fn render_idle(frame: &mut Frame, area: Rect, theme: &Theme) {
    let area = center(area, Constraint::Length(34), Constraint::Length(3));
    let paragraph = Paragraph::new("Nothing playing")
        .alignment(Alignment::Center)
        .block(block("nowplaying", theme));

    frame.render_widget(paragraph, area);
}

fn render_footer(
    frame: &mut Frame,
    area: Rect,
    notification: Option<&Notification>,
    theme: &Theme,
) {
    let line = match notification {
        Some(Notification::Error(message)) => {
            Line::from(message.as_str()).style(Style::new().fg(theme.error))
        }
        Some(Notification::Warning(message)) => {
            Line::from(message.as_str()).style(Style::new().fg(theme.warning))
        }
        Some(Notification::Info(message)) => Line::from(message.as_str()),
        None => Line::from(KEY_HINTS).style(Style::new().dim()),
    };

    frame.render_widget(Paragraph::new(line).alignment(Alignment::Center), area);
}

pub(crate) fn center(area: Rect, horizontal: Constraint, vertical: Constraint) -> Rect {
    let [area] = Layout::horizontal([horizontal])
        .flex(Flex::Center)
        .areas(area);
    let [area] = Layout::vertical([vertical]).flex(Flex::Center).areas(area);
    area
}

pub(crate) fn block<'a>(title: &str, theme: &Theme) -> Block<'a> {
    Block::bordered()
        .title(format!(" {title} "))
        .title_alignment(Alignment::Center)
        .border_type(theme.border_type)
}
