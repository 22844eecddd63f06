mod quiz;
mod result;
mod waiting;

use ratatui::{prelude::*, widgets::Block};

use crate::app::App;
use crate::engine::SessionState;

pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();
    frame.render_widget(Block::default().bg(Color::Reset), area);

    match app.snapshot().state {
        SessionState::InProgress { .. } | SessionState::Resolving { .. } => {
            quiz::render(frame, area, app)
        }
        SessionState::Finished => result::render(frame, area, app),
        SessionState::Loading | SessionState::Waiting | SessionState::Unavailable => {
            waiting::render(frame, area, app)
        }
    }
}
