use nowplaying_controls::GateStatus;
use ratatui::{prelude::*, widgets::*};

use crate::{
    theme::Theme,
    ui::{block, center},
};

pub(crate) fn render(frame: &mut Frame, area: Rect, status: GateStatus, theme: &Theme) {
    let style = match status {
        GateStatus::Pending => Style::new(),
        GateStatus::Denied | GateStatus::Restricted => Style::new().fg(theme.error),
        GateStatus::Authorized => Style::new().fg(theme.accent).bold(),
    };

    let area = center(area, Constraint::Length(34), Constraint::Length(3));
    let paragraph = Paragraph::new(status.to_string())
        .style(style)
        .alignment(Alignment::Center)
        .block(block("nowplaying", theme));

    frame.render_widget(Clear, area);
    frame.render_widget(paragraph, area);
}
