use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::app::App;
use crate::engine::{AnswerMode, Progress, Resolution, ResolutionTrigger};
use crate::models::AnswerOption;

const URGENT_SECONDS: u32 = 3;

pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let snapshot = app.snapshot();
    let Some(question) = snapshot.question() else {
        return;
    };

    let chunks = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(4),
        Constraint::Fill(1),
        Constraint::Length(2),
        Constraint::Length(1),
    ])
    .margin(2)
    .split(area);

    if let Some(progress) = snapshot.progress {
        render_progress(frame, chunks[0], progress, snapshot.remaining);
    }
    render_question_text(frame, chunks[1], &question.title);
    render_options(
        frame,
        chunks[2],
        &question.options,
        app.cursor(),
        snapshot.pending.as_ref().map(|key| key.canonical()),
    );
    if let Some(resolution) = app.feedback() {
        render_feedback(frame, chunks[3], resolution);
    }
    render_controls(frame, chunks[4], snapshot.mode);
}

fn render_progress(frame: &mut Frame, area: Rect, progress: Progress, remaining: Option<u32>) {
    let halves = Layout::horizontal([Constraint::Fill(1), Constraint::Fill(1)]).split(area);

    let position = Paragraph::new(format!(
        "Question {} of {}  ·  {} correct",
        progress.current, progress.total, progress.correct
    ))
    .fg(Color::DarkGray);
    frame.render_widget(position, halves[0]);

    let seconds = remaining.unwrap_or(0);
    let color = if seconds <= URGENT_SECONDS {
        Color::Red
    } else {
        Color::DarkGray
    };
    let timer = Paragraph::new(format!("{seconds}s"))
        .alignment(Alignment::Right)
        .fg(color);
    frame.render_widget(timer, halves[1]);
}

fn render_question_text(frame: &mut Frame, area: Rect, text: &str) {
    let widget = Paragraph::new(text)
        .wrap(Wrap { trim: true })
        .fg(Color::White)
        .bold();
    frame.render_widget(widget, area);
}

fn render_options(
    frame: &mut Frame,
    area: Rect,
    options: &[AnswerOption],
    cursor: usize,
    pending: Option<String>,
) {
    let mut lines: Vec<Line> = Vec::with_capacity(options.len() * 2);

    for (index, option) in options.iter().enumerate() {
        let is_cursor = index == cursor;
        let is_pending = pending.as_deref() == Some(option.key.canonical().as_str());
        let style = if is_pending {
            Style::default().fg(Color::Green).bold()
        } else if is_cursor {
            Style::default().fg(Color::Cyan).bold()
        } else {
            Style::default().fg(Color::Gray)
        };
        let marker = match (is_cursor, is_pending) {
            (_, true) => "*",
            (true, false) => ">",
            (false, false) => " ",
        };

        lines.push(Line::from(vec![
            Span::styled(format!(" {marker} "), style),
            Span::styled(format!("{}. ", index + 1), style),
            Span::styled(option.text.as_str(), style),
        ]));
        lines.push(Line::from(""));
    }

    frame.render_widget(Paragraph::new(lines), area);
}

fn render_feedback(frame: &mut Frame, area: Rect, resolution: &Resolution) {
    let (text, color) = if resolution.correct {
        (format!("Question {}: correct!", resolution.index), Color::Green)
    } else {
        let answer = resolution
            .correct_text
            .as_deref()
            .unwrap_or(resolution.correct_key.as_str());
        let prefix = match (resolution.trigger, &resolution.choice) {
            (ResolutionTrigger::Timeout, None) => "time's up",
            _ => "wrong",
        };
        (
            format!(
                "Question {}: {prefix}, the answer was {answer}",
                resolution.index
            ),
            Color::Red,
        )
    };

    let widget = Paragraph::new(text)
        .alignment(Alignment::Center)
        .fg(color)
        .block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(Color::DarkGray),
        );
    frame.render_widget(widget, area);
}

fn render_controls(frame: &mut Frame, area: Rect, mode: AnswerMode) {
    let text = match mode {
        AnswerMode::Timed => "j/k navigate  ·  enter select  ·  q quit",
        AnswerMode::Confirm => "j/k navigate  ·  enter select, again to confirm  ·  q quit",
    };
    let widget = Paragraph::new(text)
        .alignment(Alignment::Center)
        .fg(Color::DarkGray);
    frame.render_widget(widget, area);
}
