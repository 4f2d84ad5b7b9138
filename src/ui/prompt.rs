//! Single-line prompt editor.
//!
//! A one-row editable text field with a visible cursor, used for search
//! entry. The state machine here only edits the buffer; commit and cancel
//! are decided by the caller from the key stream.

use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use unicode_width::UnicodeWidthStr;

/// Editor state for the prompt row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptState {
    prompt: String,
    text: String,
    /// Cursor position in characters.
    cursor: usize,
}

impl PromptState {
    pub fn new(prompt: impl Into<String>, initial: impl Into<String>) -> Self {
        let text: String = initial.into();
        let cursor = text.chars().count();
        Self {
            prompt: prompt.into(),
            text,
            cursor,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn byte_index(&self, chars: usize) -> usize {
        self.text
            .char_indices()
            .nth(chars)
            .map_or(self.text.len(), |(idx, _)| idx)
    }

    pub fn insert(&mut self, ch: char) {
        let at = self.byte_index(self.cursor);
        self.text.insert(at, ch);
        self.cursor += 1;
    }

    /// Delete before the cursor. Returns false when there was nothing to
    /// delete; the caller cancels the prompt on backspace over an empty
    /// buffer.
    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let at = self.byte_index(self.cursor - 1);
        self.text.remove(at);
        self.cursor -= 1;
        true
    }

    /// Delete at the cursor.
    pub fn delete(&mut self) {
        if self.cursor < self.text.chars().count() {
            let at = self.byte_index(self.cursor);
            self.text.remove(at);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.text.chars().count() {
            self.cursor += 1;
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.text.chars().count();
    }

    /// Kill everything before the cursor.
    pub fn kill_to_start(&mut self) {
        let at = self.byte_index(self.cursor);
        self.text = self.text[at..].to_string();
        self.cursor = 0;
    }
}

pub fn render_prompt(state: &PromptState, frame: &mut Frame, area: Rect) {
    let line = Line::from(vec![
        Span::styled(
            state.prompt.clone(),
            Style::default().add_modifier(Modifier::REVERSED),
        ),
        Span::raw(state.text.clone()),
    ]);
    frame.render_widget(Paragraph::new(line), area);

    let typed: String = state.text.chars().take(state.cursor).collect();
    let cursor_x = area.x + (state.prompt.width() + typed.width()) as u16;
    frame.set_cursor_position((cursor_x.min(area.x + area.width.saturating_sub(1)), area.y));
}
