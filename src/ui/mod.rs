//! Terminal UI composition.
//!
//! The frame is the main document area plus one bottom row that shows the
//! status line, or the prompt while search entry is active. Drawing reads
//! the viewport's precomputed visible plan; the only per-draw work is
//! horizontal clipping, row styling, and evaluating search matches for the
//! documents on screen.

pub mod prompt;
pub mod status;
pub mod viewport;

use std::collections::HashMap;

use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use unicode_width::UnicodeWidthChar;

use crate::app::Model;

/// Row highlight, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowHighlight {
    Cursor,
    Matched,
    Marked,
    Plain,
}

fn highlight_style(highlight: RowHighlight) -> Style {
    match highlight {
        RowHighlight::Cursor => Style::default().fg(Color::Black).bg(Color::Yellow),
        RowHighlight::Matched => Style::default().fg(Color::Black).bg(Color::LightGreen),
        RowHighlight::Marked => Style::default().fg(Color::Black).bg(Color::LightBlue),
        RowHighlight::Plain => Style::default(),
    }
}

/// Render the complete UI.
pub fn render(model: &Model, frame: &mut Frame) {
    let area = frame.area();
    let main_area = Rect {
        height: area.height.saturating_sub(1),
        ..area
    };
    let bottom_area = Rect {
        y: area.y + area.height.saturating_sub(1),
        height: area.height.min(1),
        ..area
    };

    render_main_lines(model, frame, main_area);

    if let Some(prompt_state) = &model.prompt {
        prompt::render_prompt(prompt_state, frame, bottom_area);
    } else {
        status::render_status_bar(model, frame, bottom_area);
    }
}

fn render_main_lines(model: &Model, frame: &mut Frame, area: Rect) {
    let vp = &model.viewport;
    let width = area.width as usize;
    let start_col = vp.start_col();

    // Evaluate the retained search once per visible document.
    let mut matched: HashMap<usize, bool> = HashMap::new();
    if let Some(search) = model.last_search.as_ref().filter(|s| s.is_valid()) {
        for row in vp.rows() {
            matched.entry(row.doc).or_insert_with(|| {
                model.cache.get(row.doc).is_some_and(|doc| {
                    search.matches(doc, vp.render_mode(), vp.json_flavor())
                })
            });
        }
    }

    let mut lines: Vec<Line> = Vec::with_capacity(area.height as usize);
    for screen_row in 0..area.height as usize {
        let Some(row) = vp.rows().get(screen_row) else {
            lines.push(Line::raw("~"));
            continue;
        };
        let highlight = if screen_row == vp.cursor_line() {
            RowHighlight::Cursor
        } else if matched.get(&row.doc).copied().unwrap_or(false) {
            RowHighlight::Matched
        } else if vp.is_marked(row.doc) {
            RowHighlight::Marked
        } else {
            RowHighlight::Plain
        };

        let mut text = clip_columns(&row.text, start_col, width);
        if highlight != RowHighlight::Plain {
            // pad so the highlight covers the whole row
            let pad = width.saturating_sub(text.chars().count());
            text.extend(std::iter::repeat(' ').take(pad));
        }
        lines.push(Line::styled(text, highlight_style(highlight)));
    }

    frame.render_widget(Paragraph::new(lines), area);
}

/// Horizontal window of `text`: display columns `[start_col, start_col +
/// width)`, with a `<` sentinel in the first column when scrolled and a `>`
/// sentinel in the last when the sub-line continues past the right edge.
pub fn clip_columns(text: &str, start_col: usize, width: usize) -> String {
    if width == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut col = 0usize;
    let mut shown = 0usize;
    let mut clipped_right = false;

    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if col + w <= start_col {
            col += w;
            continue;
        }
        if shown + w > width {
            clipped_right = true;
            break;
        }
        out.push(ch);
        col += w;
        shown += w;
    }

    if start_col > 0 {
        let rest: String = out.chars().skip(1).collect();
        out = format!("<{rest}");
    }
    if clipped_right {
        let head: String = {
            let chars: Vec<char> = out.chars().collect();
            chars[..chars.len().saturating_sub(1)].iter().collect()
        };
        out = format!("{head}>");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{model_over, model_with_cache};
    use crate::app::{update, Message};
    use bson::doc;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn draw(model: &Model, width: u16, height: u16) -> Vec<String> {
        let backend = TestBackend::new(width, height);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| render(model, frame)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        (0..height)
            .map(|y| {
                (0..width)
                    .map(|x| buffer.cell((x, y)).unwrap().symbol().to_string())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .collect()
    }

    #[test]
    fn test_clip_no_scroll_short_line() {
        assert_eq!(clip_columns("abc", 0, 10), "abc");
    }

    #[test]
    fn test_clip_right_edge_sentinel() {
        assert_eq!(clip_columns("abcdefgh", 0, 5), "abcd>");
    }

    #[test]
    fn test_clip_left_sentinel() {
        assert_eq!(clip_columns("abcdefgh", 3, 10), "<efgh");
    }

    #[test]
    fn test_clip_both_sentinels() {
        assert_eq!(clip_columns("abcdefghij", 2, 5), "<defg>");
    }

    #[test]
    fn test_clip_past_end_keeps_scroll_sentinel() {
        assert_eq!(clip_columns("ab", 5, 10), "<");
    }

    #[test]
    fn test_clip_zero_width() {
        assert_eq!(clip_columns("ab", 0, 0), "");
    }

    #[test]
    fn test_draw_shows_documents_and_tilde_rows() {
        let model = model_over(3, 40, 8);
        let rows = draw(&model, 40, 8);
        assert!(rows[0].starts_with(r#"{"a":0}"#));
        assert!(rows[2].starts_with(r#"{"a":2}"#));
        assert!(rows[3].starts_with('~'));
        assert!(rows[6].starts_with('~'));
    }

    #[test]
    fn test_draw_status_line_on_bottom_row() {
        let model = model_over(3, 80, 8);
        let rows = draw(&model, 80, 8);
        assert!(rows[7].contains("[docs 0-2/3 (END)]"), "got: {}", rows[7]);
    }

    #[test]
    fn test_draw_prompt_replaces_status() {
        let mut model = model_over(3, 40, 8);
        model = update(model, Message::OpenPrompt { initial: "{".into() }).unwrap();
        let rows = draw(&model, 40, 8);
        assert!(rows[7].starts_with("/{"), "got: {}", rows[7]);
    }

    #[test]
    fn test_draw_wide_document_gets_right_sentinel() {
        let docs = vec![doc! { "message": "x".repeat(100) }];
        let cache = crate::cache::DocumentCache::new(crate::cache::stream(&docs)).unwrap();
        let model = model_with_cache(cache, 40, 8);
        let rows = draw(&model, 40, 8);
        assert!(rows[0].ends_with('>'), "got: {}", rows[0]);
    }

    #[test]
    fn test_draw_scrolled_right_gets_left_sentinel() {
        let docs = vec![doc! { "message": "x".repeat(100) }];
        let cache = crate::cache::DocumentCache::new(crate::cache::stream(&docs)).unwrap();
        let mut model = model_with_cache(cache, 40, 8);
        model = update(model, Message::MoveRight).unwrap();
        let rows = draw(&model, 40, 8);
        assert!(rows[0].starts_with('<'), "got: {}", rows[0]);
    }

    #[test]
    fn test_cursor_row_highlight_beats_mark() {
        let mut model = model_over(5, 40, 8);
        model = update(model, Message::ToggleMark).unwrap();

        let backend = TestBackend::new(40, 8);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| render(&model, frame)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        // cursor on row 0 of the marked doc: cursor style wins
        assert_eq!(buffer.cell((0, 0)).unwrap().bg, Color::Yellow);
    }

    #[test]
    fn test_marked_row_highlight() {
        let mut model = model_over(5, 40, 8);
        model = update(model, Message::ToggleMark).unwrap();
        // move the cursor off the marked doc
        model = update(model, Message::CursorBottom).unwrap();

        let backend = TestBackend::new(40, 8);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| render(&model, frame)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        assert_eq!(buffer.cell((0, 0)).unwrap().bg, Color::LightBlue);
    }

    #[test]
    fn test_matched_row_highlight() {
        let mut model = model_over(5, 40, 8);
        model.last_search = Some(crate::search::Search::parse(r#"{"a": 2}"#));
        model = update(model, Message::CursorBottom).unwrap();

        let backend = TestBackend::new(40, 8);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| render(&model, frame)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        assert_eq!(buffer.cell((0, 2)).unwrap().bg, Color::LightGreen);
        assert_eq!(buffer.cell((0, 1)).unwrap().bg, Color::Reset);
    }
}
