use ratatui::{prelude::*, widgets::Paragraph};

use crate::app::App;
use crate::engine::SessionState;

pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(3),
        Constraint::Fill(1),
        Constraint::Length(1),
    ])
    .margin(1)
    .split(area);

    let (title, detail, color) = match app.snapshot().state {
        SessionState::Unavailable => (
            "QUIZ UNAVAILABLE",
            "The quiz could not be loaded. Try again later.",
            Color::Red,
        ),
        SessionState::Waiting => (
            "WAITING",
            "No questions have been released yet.",
            Color::Yellow,
        ),
        _ => ("LOADING", "Fetching questions...", Color::Cyan),
    };

    let content = vec![
        Line::from(Span::styled(title, Style::default().fg(color).bold())),
        Line::from(""),
        Line::from(Span::styled(detail, Style::default().fg(Color::Gray))),
    ];
    frame.render_widget(
        Paragraph::new(content).alignment(Alignment::Center),
        chunks[1],
    );

    let controls = Paragraph::new("q quit")
        .alignment(Alignment::Center)
        .fg(Color::DarkGray);
    frame.render_widget(controls, chunks[3]);
}
