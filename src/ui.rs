use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Gauge, Paragraph, Widget, Wrap},
};
use time_humanize::HumanTime;
use unicode_width::UnicodeWidthStr;
use versetype::books;
use versetype::engine::EngineState;

use crate::{App, Screen};

const HORIZONTAL_MARGIN: u16 = 5;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match &self.screen {
            Screen::Typing => render_typing(self, area, buf),
            Screen::Browse => render_browse(self, area, buf),
            Screen::Notes { .. } => render_notes(self, area, buf),
            Screen::Summary => render_summary(self, area, buf),
        }
    }
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

fn render_typing(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(1)
        .constraints(
            [
                Constraint::Length(2),
                Constraint::Min(3),
                Constraint::Length(1),
                Constraint::Length(2),
            ]
            .as_ref(),
        )
        .split(area);

    let title = match &app.chapter {
        Some(chapter) => {
            let mut spans = vec![Span::styled(chapter.reference.to_string(), bold())];
            if app.engine.state() == EngineState::Paused {
                spans.push(Span::styled(
                    "  [paused]",
                    Style::default().fg(Color::Yellow).patch(bold()),
                ));
            }
            Line::from(spans)
        }
        None => Line::from(Span::styled("no chapter loaded", dim())),
    };
    Paragraph::new(title)
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    if let Some(chapter) = &app.chapter {
        let lines = verse_lines(app, &chapter.verses);
        Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .render(chunks[1], buf);
    }

    let n = app.engine.token_count();
    let done = app.engine.cursor().sequence_index;
    Gauge::default()
        .gauge_style(Style::default().fg(Color::Green).bg(Color::DarkGray))
        .ratio(app.engine.progress_fraction())
        .label(format!("{}/{} words", done, n))
        .render(chunks[2], buf);

    let stats = app.engine.stats();
    let mut status = format!(
        "{}   {:.0} wpm   {:.0}% acc   {} misses   tab browse · f2 notes · esc quit",
        app.config.typing_mode,
        stats.tokens_per_min,
        stats.accuracy(),
        stats.incorrect_inputs,
    );
    if let Some(message) = &app.status {
        status = message.clone();
    }
    while status.width() > area.width as usize && status.pop().is_some() {}
    Paragraph::new(Span::styled(status, dim()))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);
}

/// Builds one styled line per verse. The word walk mirrors the tokenizer's
/// filter so token indices line up without the renderer touching engine
/// internals: words with no letter are shown but never styled as typeable.
fn verse_lines<'a>(app: &'a App, verses: &'a [String]) -> Vec<Line<'a>> {
    let cursor = app.engine.cursor();
    let mut token_index = 0usize;
    let mut lines = Vec::with_capacity(verses.len());

    for verse in verses {
        let mut spans: Vec<Span> = Vec::new();
        for word in verse.split_whitespace() {
            if !spans.is_empty() {
                spans.push(Span::raw(" "));
            }
            if !word.chars().any(|c| c.is_alphabetic()) {
                spans.push(Span::styled(word, dim().add_modifier(Modifier::ITALIC)));
                continue;
            }

            let style = if token_index < cursor.sequence_index {
                Style::default().fg(Color::Green)
            } else if token_index == cursor.sequence_index {
                if app.last_mismatch.is_some() {
                    Style::default()
                        .fg(Color::Red)
                        .patch(bold())
                        .add_modifier(Modifier::UNDERLINED)
                } else {
                    bold().add_modifier(Modifier::UNDERLINED)
                }
            } else {
                dim()
            };
            spans.push(Span::styled(word, style));
            token_index += 1;
        }

        lines.push(Line::from(spans));
    }
    lines
}

fn render_browse(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(1)
        .constraints([Constraint::Length(2), Constraint::Min(3), Constraint::Length(2)].as_ref())
        .split(area);

    let book = books::BOOKS[app.browse.book_idx];
    Paragraph::new(Line::from(vec![
        Span::styled("browse  ", dim()),
        Span::styled(
            format!("{} — chapter {}/{}", book.name, app.browse.chapter, book.chapters),
            bold(),
        ),
    ]))
    .alignment(Alignment::Center)
    .render(chunks[0], buf);

    let visible = chunks[1].height as usize;
    let half = visible / 2;
    let start = app.browse.book_idx.saturating_sub(half);
    let mut lines = Vec::new();
    for (idx, book) in books::BOOKS.iter().enumerate().skip(start).take(visible) {
        let label = format!("{} ({})", book.name, book.chapters);
        let style = if idx == app.browse.book_idx {
            Style::default().fg(Color::Green).patch(bold())
        } else {
            dim()
        };
        lines.push(Line::from(Span::styled(label, style)));
    }
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    Paragraph::new(Span::styled(
        "↑/↓ book · ←/→ chapter · enter start · esc back",
        dim(),
    ))
    .alignment(Alignment::Center)
    .render(chunks[2], buf);
}

fn render_notes(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(1)
        .constraints([Constraint::Length(2), Constraint::Min(3), Constraint::Length(2)].as_ref())
        .split(area);

    let heading = match &app.chapter {
        Some(chapter) => format!("notes — {}", chapter.reference),
        None => "notes".to_string(),
    };
    Paragraph::new(Span::styled(heading, bold()))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    let body = format!("{}_", app.note_draft);
    Paragraph::new(body)
        .wrap(Wrap { trim: false })
        .render(chunks[1], buf);

    Paragraph::new(Span::styled("enter save · esc discard", dim()))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);
}

fn render_summary(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(1)
        .constraints([Constraint::Length(2), Constraint::Min(3), Constraint::Length(2)].as_ref())
        .split(area);

    let heading = match &app.chapter {
        Some(chapter) => format!("{} — complete", chapter.reference),
        None => "chapter complete".to_string(),
    };
    Paragraph::new(Span::styled(heading, Style::default().fg(Color::Green).patch(bold())))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    let mut lines = Vec::new();
    if let Some(summary) = &app.last_summary {
        lines.push(stat_line(
            "words typed",
            summary.tokens_typed.to_string(),
        ));
        lines.push(stat_line(
            "duration",
            format!("{:.0}s", summary.duration_secs),
        ));
        lines.push(stat_line(
            "pace",
            format!("{:.0} words/min", summary.tokens_per_min),
        ));
        lines.push(stat_line(
            "accuracy",
            format!("{:.0}%", app.engine.stats().accuracy()),
        ));
        if let Some(sd) = std_dev(&app.rate_samples) {
            lines.push(stat_line("pace swing", format!("{:.1}", sd)));
        }
        if let Some(count) = app.chapter_completions {
            lines.push(stat_line("times finished", count.to_string()));
        }
    }
    if let Some(cumulative) = &app.cumulative {
        lines.push(Line::from(""));
        lines.push(stat_line(
            "total words",
            cumulative.total_tokens.to_string(),
        ));
        lines.push(stat_line(
            "chapters done",
            cumulative.completions.to_string(),
        ));
        lines.push(stat_line(
            "day streak",
            cumulative.day_streak.to_string(),
        ));
        if let Some(last) = cumulative.last_completed {
            let elapsed = chrono::Local::now()
                .signed_duration_since(last)
                .num_seconds();
            lines.push(stat_line(
                "last finished",
                HumanTime::from(-elapsed).to_string(),
            ));
        }
    }
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    Paragraph::new(Span::styled(
        "n next · ← previous · r repeat · e export csv · esc quit",
        dim(),
    ))
    .alignment(Alignment::Center)
    .render(chunks[2], buf);
}

fn stat_line(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label}: "), dim()),
        Span::styled(value, bold()),
    ])
}

/// Population standard deviation of the per-word pace samples.
fn std_dev(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    let mean = data.iter().sum::<f64>() / data.len() as f64;
    let variance = data
        .iter()
        .map(|value| {
            let diff = mean - *value;
            diff * diff
        })
        .sum::<f64>()
        / data.len() as f64;
    Some(variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_std_dev() {
        assert_eq!(
            std_dev(&[100., 120., 90., 102., 94.]),
            Some(10.322790320451151)
        );
        assert_eq!(std_dev(&[5.0, 5.0, 5.0]), Some(0.0));
        assert_eq!(std_dev(&[]), None);
    }
}
