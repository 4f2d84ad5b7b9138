use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

use crate::app::{App, Message, Model};
use crate::render::RenderMode;

impl App {
    pub(super) fn handle_event(&self, event: Event, model: &Model) -> Option<Message> {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => {
                if model.prompt.is_some() {
                    Self::handle_prompt_key(key)
                } else {
                    Self::handle_key(key)
                }
            }
            Event::Mouse(mouse) => Self::handle_mouse(mouse),
            Event::Resize(width, height) => Some(Message::Resize(width, height)),
            _ => None,
        }
    }

    /// The prompt owns the keyboard while it is open.
    fn handle_prompt_key(key: KeyEvent) -> Option<Message> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => Some(Message::PromptCancel),
            KeyCode::Enter => Some(Message::PromptConfirm),
            KeyCode::Backspace => Some(Message::PromptBackspace),
            KeyCode::Delete => Some(Message::PromptDelete),
            KeyCode::Left => Some(Message::PromptLeft),
            KeyCode::Right => Some(Message::PromptRight),
            KeyCode::Home => Some(Message::PromptHome),
            KeyCode::End => Some(Message::PromptEnd),
            KeyCode::Char('a') if ctrl => Some(Message::PromptHome),
            KeyCode::Char('e') if ctrl => Some(Message::PromptEnd),
            KeyCode::Char('u') if ctrl => Some(Message::PromptKillToStart),
            // Up/Down are reserved for search history
            KeyCode::Up | KeyCode::Down => None,
            KeyCode::Char(ch) if !ctrl && !key.modifiers.contains(KeyModifiers::ALT) => {
                Some(Message::PromptInput(ch))
            }
            _ => None,
        }
    }

    fn handle_key(key: KeyEvent) -> Option<Message> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('f') if ctrl => Some(Message::PageDown),
            KeyCode::Char('b') if ctrl => Some(Message::PageUp),
            KeyCode::Char(_) if ctrl => None,

            KeyCode::Char('q' | 'Q') => Some(Message::Quit),

            KeyCode::Char('1') => Some(Message::SetRenderMode(RenderMode::JsonOneline)),
            KeyCode::Char('2') => Some(Message::SetRenderMode(RenderMode::JsonPretty)),
            KeyCode::Char('3') => Some(Message::SetRenderMode(RenderMode::ToString)),
            KeyCode::Char('4') => Some(Message::SetRenderMode(RenderMode::TextLogs)),
            KeyCode::Char('s') => Some(Message::ToggleJsonFlavor),

            KeyCode::Char('h') | KeyCode::Left => Some(Message::MoveLeft),
            KeyCode::Char('l') | KeyCode::Right => Some(Message::MoveRight),
            KeyCode::Char('^' | '0') => Some(Message::JumpLeft),
            KeyCode::Char('$') => Some(Message::JumpRight),

            KeyCode::Char('j') | KeyCode::Down => Some(Message::MoveCursorDown),
            KeyCode::Char('k') | KeyCode::Up => Some(Message::MoveCursorUp),

            KeyCode::Char('g') | KeyCode::Home => Some(Message::JumpTop),
            KeyCode::Char('G') | KeyCode::End => Some(Message::JumpBottom),

            KeyCode::Char('H') => Some(Message::CursorTop),
            KeyCode::Char('M') => Some(Message::CursorMiddle),
            KeyCode::Char('L') => Some(Message::CursorBottom),

            KeyCode::PageDown | KeyCode::Char(' ') => Some(Message::PageDown),
            KeyCode::PageUp => Some(Message::PageUp),

            KeyCode::Enter => Some(Message::ToggleMark),
            KeyCode::Tab => Some(Message::JumpNextMarked),
            KeyCode::BackTab => Some(Message::JumpPrevMarked),

            KeyCode::Char('/') => Some(Message::OpenPrompt {
                initial: String::new(),
            }),
            KeyCode::Char('{') => Some(Message::OpenPrompt {
                initial: "{".to_string(),
            }),
            KeyCode::Char('n') => Some(Message::RepeatSearch),

            _ => None,
        }
    }

    /// Button 1 drives the drag-mark state machine on the row under the
    /// pointer; the wheel scrolls by one sub-line.
    fn handle_mouse(mouse: MouseEvent) -> Option<Message> {
        match mouse.kind {
            MouseEventKind::ScrollDown => Some(Message::ScrollDown),
            MouseEventKind::ScrollUp => Some(Message::ScrollUp),
            MouseEventKind::Down(MouseButton::Left) => Some(Message::DragStart(mouse.row)),
            MouseEventKind::Drag(MouseButton::Left) => Some(Message::DragUpdate(mouse.row)),
            MouseEventKind::Up(MouseButton::Left) => Some(Message::DragEnd(mouse.row)),
            _ => None,
        }
    }
}
