use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Padding, Paragraph},
};

use crate::app::App;
use crate::engine::{PersistenceStatus, SessionSnapshot};
use crate::models::Summary;

const QUESTION_PREVIEW_LENGTH: usize = 55;

pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let snapshot = app.snapshot();
    let Some(summary) = &snapshot.summary else {
        return;
    };

    let chunks = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(7),
        Constraint::Fill(1),
        Constraint::Length(1),
        Constraint::Length(2),
    ])
    .margin(1)
    .split(area);

    render_score_summary(frame, chunks[1], summary);
    render_question_breakdown(frame, chunks[2], snapshot, summary, app.result_scroll());
    render_persistence(frame, chunks[3], &snapshot.persistence);
    render_controls(frame, chunks[4], &snapshot.persistence);
}

fn grade_color(percentage: u32) -> Color {
    match percentage {
        90.. => Color::Green,
        70..=89 => Color::Cyan,
        50..=69 => Color::Yellow,
        _ => Color::Red,
    }
}

fn render_score_summary(frame: &mut Frame, area: Rect, summary: &Summary) {
    let percentage = summary.percentage();
    let color = grade_color(percentage);

    let content = vec![
        Line::from(""),
        Line::from(Span::styled(
            "RESULTS",
            Style::default().fg(Color::Cyan).bold(),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!("{} / {}  ({percentage}%)", summary.correct, summary.total),
            Style::default().fg(color).bold(),
        )),
        Line::from(Span::styled(
            summary.rating().label(),
            Style::default().fg(color),
        )),
        Line::from(""),
    ];

    let widget = Paragraph::new(content).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Color::DarkGray),
    );
    frame.render_widget(widget, area);
}

fn render_question_breakdown(
    frame: &mut Frame,
    area: Rect,
    snapshot: &SessionSnapshot,
    summary: &Summary,
    scroll: usize,
) {
    let lines: Vec<Line> = snapshot
        .questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let correct = summary.correctness.get(&question.id).copied().unwrap_or(false);
            let (symbol, color) = if correct {
                ("+", Color::Green)
            } else {
                ("-", Color::Red)
            };
            let answered = summary.answers.contains_key(&question.id);

            let mut spans = vec![
                Span::styled(format!(" {symbol} "), Style::default().fg(color)),
                Span::styled(
                    format!("{:2}. ", index + 1),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(truncate_question(&question.title), Style::default().fg(Color::Gray)),
            ];
            if !answered {
                spans.push(Span::styled(
                    "  (no answer)",
                    Style::default().fg(Color::DarkGray),
                ));
            }
            Line::from(spans)
        })
        .collect();

    let widget = Paragraph::new(lines)
        .block(Block::default().padding(Padding::horizontal(1)))
        .scroll((scroll as u16, 0));
    frame.render_widget(widget, area);
}

fn truncate_question(text: &str) -> String {
    if text.chars().count() > QUESTION_PREVIEW_LENGTH {
        let truncated: String = text.chars().take(QUESTION_PREVIEW_LENGTH).collect();
        format!("{truncated}...")
    } else {
        text.to_string()
    }
}

fn render_persistence(frame: &mut Frame, area: Rect, status: &PersistenceStatus) {
    let (text, color) = match status {
        PersistenceStatus::NotStarted | PersistenceStatus::Pending => {
            ("Saving result...".to_string(), Color::Yellow)
        }
        PersistenceStatus::Confirmed => ("Result saved".to_string(), Color::Green),
        PersistenceStatus::Failed(reason) => {
            (format!("Could not save result: {reason}"), Color::Red)
        }
    };
    let widget = Paragraph::new(text)
        .alignment(Alignment::Center)
        .fg(color);
    frame.render_widget(widget, area);
}

fn render_controls(frame: &mut Frame, area: Rect, status: &PersistenceStatus) {
    let text = if matches!(status, PersistenceStatus::Failed(_)) {
        "j/k scroll  ·  r retry save  ·  q quit"
    } else {
        "j/k scroll  ·  q quit"
    };
    let widget = Paragraph::new(text)
        .alignment(Alignment::Center)
        .fg(Color::DarkGray);
    frame.render_widget(widget, area);
}
