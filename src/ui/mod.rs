use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use time::macros::format_description;
use time::OffsetDateTime;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::app::state::{AppState, Prompt, PromptKind, CHECKBOX_WIDTH, INDEX_WIDTH};
use crate::reminder::LocalClock;
use crate::reorder::Phase;
use crate::store::ItemId;
use crate::sync::DisplayRow;

const HELP: &str = "a add • space done • d delete • r remind • K/J move • drag to reorder • q quit";

/// What the list pane shows for one frame.
pub struct ListFrame<'a> {
    /// Rows in drawing order. While dragging this is the preview order.
    pub rows: Vec<&'a DisplayRow>,
    pub active: Option<&'a ItemId>,
    pub phase: Phase,
    pub clock: LocalClock,
}

/// Draws the whole screen and returns the inner area of the list, which
/// mouse hit testing is measured against.
pub fn draw_app(
    frame: &mut Frame,
    list: &ListFrame<'_>,
    state: &AppState,
    list_state: &mut ListState,
) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(2)])
        .split(frame.size());

    let border_style = match list.phase {
        Phase::Dragging | Phase::Committing => Style::default().fg(Color::Yellow),
        Phase::Armed => Style::default().fg(Color::Cyan),
        Phase::Idle => Style::default(),
    };
    let block = Block::default()
        .title("To-do")
        .borders(Borders::ALL)
        .border_style(border_style);
    let inner = block.inner(vertical[0]);

    if list.rows.is_empty() {
        let empty = Paragraph::new(Span::styled(
            "Nothing to do. Press 'a' to add an item.",
            Style::default().fg(Color::Gray),
        ))
        .block(block);
        frame.render_widget(empty, vertical[0]);
    } else {
        let width = usize::from(inner.width);
        let items: Vec<ListItem> = list
            .rows
            .iter()
            .map(|row| {
                let line = row_line(row, &list.clock, width);
                let item = ListItem::new(line);
                if Some(&row.id) == list.active {
                    item.style(active_style(list.phase))
                } else {
                    item
                }
            })
            .collect();
        let widget = List::new(items)
            .block(block)
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
        frame.render_stateful_widget(widget, vertical[0], list_state);
    }

    let status = build_status_line(list, state);
    let status_paragraph = Paragraph::new(status).style(Style::default().fg(Color::Gray));
    frame.render_widget(status_paragraph, vertical[1]);

    if let Some(prompt) = state.prompt() {
        render_prompt(frame, prompt);
    }
    inner
}

fn active_style(phase: Phase) -> Style {
    match phase {
        Phase::Dragging | Phase::Committing => Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
        Phase::Armed => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        Phase::Idle => Style::default().add_modifier(Modifier::DIM),
    }
}

/// `" 3. [x] text  ⏰ 18:30"`, with the text cut to fit `width` columns.
fn row_line(row: &DisplayRow, clock: &LocalClock, width: usize) -> Line<'static> {
    let index = format!("{:>3}. ", row.index);
    let (checkbox, checkbox_style) = if row.done {
        ("[x]", Style::default().fg(Color::Green))
    } else {
        ("[ ]", Style::default())
    };
    let reminder = row
        .notify_time
        .map(|at| format!("  ⏰ {}", reminder_label(clock.localize(at))));

    let fixed = usize::from(INDEX_WIDTH + CHECKBOX_WIDTH) + 1
        + reminder.as_deref().map(|label| label.width()).unwrap_or(0);
    let text = truncate_to_width(&row.text, width.saturating_sub(fixed));
    let text_style = if row.done {
        Style::default()
            .fg(Color::Gray)
            .add_modifier(Modifier::CROSSED_OUT)
    } else {
        Style::default()
    };

    let mut spans = vec![
        Span::styled(index, Style::default().fg(Color::Gray)),
        Span::styled(checkbox, checkbox_style),
        Span::raw(" "),
        Span::styled(text, text_style),
    ];
    if let Some(reminder) = reminder {
        spans.push(Span::styled(reminder, Style::default().fg(Color::Magenta)));
    }
    Line::from(spans)
}

fn reminder_label(at: OffsetDateTime) -> String {
    at.format(format_description!("[hour]:[minute]"))
        .unwrap_or_else(|_| at.to_string())
}

fn truncate_to_width(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for grapheme in text.graphemes(true) {
        let w = grapheme.width();
        if used + w + 1 > max {
            break;
        }
        out.push_str(grapheme);
        used += w;
    }
    out.push('…');
    out
}

fn build_status_line(list: &ListFrame<'_>, state: &AppState) -> Text<'static> {
    let total = list.rows.len();
    let position = if total == 0 {
        "0/0".to_string()
    } else {
        format!("{}/{}", state.selected() + 1, total)
    };
    let mut spans = vec![
        Span::raw(format!("Items: {total}")),
        Span::raw(" | Selected: "),
        Span::styled(position, Style::default().add_modifier(Modifier::BOLD)),
    ];
    if list.phase != Phase::Idle {
        spans.push(Span::raw(" | Reorder: "));
        spans.push(Span::styled(
            list.phase.to_string(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ));
    }
    let second = match state.status() {
        Some(message) => Line::from(Span::styled(
            message.to_string(),
            Style::default().fg(Color::White),
        )),
        None => Line::from(HELP),
    };
    Text::from(vec![Line::from(spans), second])
}

fn render_prompt(frame: &mut Frame, prompt: &Prompt) {
    let area = centered_rect(60, 30, frame.size());
    frame.render_widget(Clear, area);
    let mut buffer = prompt.buffer.clone();
    buffer.push('▌');
    let hint = match prompt.kind {
        PromptKind::NewItem => "Enter to add • Esc to cancel",
        PromptKind::Reminder { .. } => "24-hour time, e.g. 18:30 • Enter to set • Esc to cancel",
    };
    let paragraph = Paragraph::new(vec![
        Line::from(Span::styled(
            prompt.title(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(buffer),
        Line::from(""),
        Line::from(Span::styled(hint, Style::default().fg(Color::Gray))),
    ])
    .block(
        Block::default()
            .title(match prompt.kind {
                PromptKind::NewItem => "New item",
                PromptKind::Reminder { .. } => "Reminder",
            })
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    )
    .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use time::macros::{datetime, offset};

    fn line_text(line: &Line<'_>) -> String {
        line.spans
            .iter()
            .map(|span| span.content.as_ref())
            .collect()
    }

    fn row(index: usize, text: &str, done: bool) -> DisplayRow {
        DisplayRow {
            id: ItemId::from(text),
            text: text.to_string(),
            done,
            index,
            notify_time: None,
        }
    }

    #[test]
    fn row_line_shows_index_checkbox_and_local_reminder() {
        let clock = LocalClock::with_offset(offset!(+7));
        let mut reminded = row(2, "call mum", true);
        reminded.notify_time = Some(datetime!(2026-10-18 11:30 UTC));
        assert_eq!(line_text(&row_line(&reminded, &clock, 80)), "  2. [x] call mum  ⏰ 18:30");
        assert_eq!(line_text(&row_line(&row(12, "milk", false), &clock, 80)), " 12. [ ] milk");
    }

    #[test]
    fn checkbox_sits_where_hit_testing_expects_it() {
        let clock = LocalClock::with_offset(offset!(UTC));
        let text = line_text(&row_line(&row(1, "a", false), &clock, 40));
        let start = usize::from(INDEX_WIDTH);
        assert_eq!(&text[start..start + usize::from(CHECKBOX_WIDTH)], "[ ]");
    }

    #[test]
    fn long_text_is_cut_by_display_width() {
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("abcdefgh", 5), "abcd…");
        assert_eq!(truncate_to_width("日本語テキスト", 7), "日本語…");
        assert_eq!(truncate_to_width("abc", 0), "");
    }

    #[test]
    fn draw_reports_list_inner_area() -> anyhow::Result<()> {
        let mut terminal = Terminal::new(TestBackend::new(40, 12))?;
        let rows = [row(1, "a", false), row(2, "b", true)];
        let list = ListFrame {
            rows: rows.iter().collect(),
            active: None,
            phase: Phase::Idle,
            clock: LocalClock::with_offset(offset!(UTC)),
        };
        let state = AppState::default();
        let mut list_state = ListState::default();
        let mut inner = Rect::default();
        terminal.draw(|frame| {
            inner = draw_app(frame, &list, &state, &mut list_state);
        })?;
        assert_eq!(inner, Rect::new(1, 1, 38, 8));
        Ok(())
    }
}
