use crate::app::Model;
use crate::cache::CacheError;
use crate::render::RenderMode;
use crate::search::{self, Search};
use crate::ui::prompt::PromptState;

/// All possible events and actions in the application.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    // Horizontal motion
    /// Scroll left one column
    MoveLeft,
    /// Scroll right one column
    MoveRight,
    /// Scroll to column 0
    JumpLeft,
    /// Scroll to the longest line's last column
    JumpRight,

    // Cursor motion
    /// Cursor to the top row
    CursorTop,
    /// Cursor to the middle row
    CursorMiddle,
    /// Cursor to the bottom row
    CursorBottom,
    /// Cursor up, scrolling at the top edge
    MoveCursorUp,
    /// Cursor down, scrolling at the bottom edge
    MoveCursorDown,

    // Scrolling
    /// Scroll up one sub-line (mouse wheel)
    ScrollUp,
    /// Scroll down one sub-line (mouse wheel)
    ScrollDown,
    /// Jump to the top of the file
    JumpTop,
    /// Jump to the end of the file (deferred while loading)
    JumpBottom,
    /// Scroll up one page
    PageUp,
    /// Scroll down one page
    PageDown,

    // Rendering
    /// Switch document render mode
    SetRenderMode(RenderMode),
    /// Toggle strict/extended JSON flavor
    ToggleJsonFlavor,

    // Marks
    /// Toggle the mark on the document under the cursor
    ToggleMark,
    /// Jump to the next marked document, wrapping
    JumpNextMarked,
    /// Jump to the previous marked document, wrapping
    JumpPrevMarked,
    /// Mouse press on a screen row starts a drag selection
    DragStart(u16),
    /// Mouse drag over a screen row
    DragUpdate(u16),
    /// Mouse release commits the drag selection
    DragEnd(u16),

    // Search prompt
    /// Open the search prompt, optionally pre-filled
    OpenPrompt { initial: String },
    /// Insert a character into the prompt buffer
    PromptInput(char),
    /// Delete before the prompt cursor; cancels on an empty buffer
    PromptBackspace,
    /// Delete at the prompt cursor
    PromptDelete,
    PromptLeft,
    PromptRight,
    PromptHome,
    PromptEnd,
    /// Kill everything before the prompt cursor
    PromptKillToStart,
    /// Dismiss the prompt
    PromptCancel,
    /// Commit the prompt text as a search
    PromptConfirm,
    /// Repeat the retained search (`n`)
    RepeatSearch,
    /// Execute the retained search; runs deferred, after a paint
    RunSearch,

    // Window
    /// Terminal resized
    Resize(u16, u16),

    // Application
    /// Quit the application
    Quit,
}

/// Messages that arrive from the main key surface clear the transient
/// status message; prompt editing, mouse motion, and internal messages keep
/// it.
fn clears_status_extra(msg: &Message) -> bool {
    !matches!(
        msg,
        Message::RunSearch
            | Message::Resize(_, _)
            | Message::ScrollUp
            | Message::ScrollDown
            | Message::DragStart(_)
            | Message::DragUpdate(_)
            | Message::DragEnd(_)
            | Message::PromptInput(_)
            | Message::PromptBackspace
            | Message::PromptDelete
            | Message::PromptLeft
            | Message::PromptRight
            | Message::PromptHome
            | Message::PromptEnd
            | Message::PromptKillToStart
    )
}

/// State transition for one message.
///
/// Viewport operations can force cache loads, so a malformed record anywhere
/// in the motion path surfaces here as a fatal error.
pub fn update(mut model: Model, msg: Message) -> Result<Model, CacheError> {
    if clears_status_extra(&msg) {
        model.status_extra.clear();
    }

    match msg {
        // Horizontal motion
        Message::MoveLeft => model.viewport.move_left(&mut model.cache)?,
        Message::MoveRight => model.viewport.move_right(&mut model.cache)?,
        Message::JumpLeft => model.viewport.jump_left(&mut model.cache)?,
        Message::JumpRight => model.viewport.jump_right(&mut model.cache)?,

        // Cursor motion
        Message::CursorTop => model.viewport.cursor_top(&mut model.cache)?,
        Message::CursorMiddle => model.viewport.cursor_middle(&mut model.cache)?,
        Message::CursorBottom => model.viewport.cursor_bottom(&mut model.cache)?,
        Message::MoveCursorUp => model.viewport.move_cursor_up(&mut model.cache)?,
        Message::MoveCursorDown => model.viewport.move_cursor_down(&mut model.cache)?,

        // Scrolling
        Message::ScrollUp => model.viewport.move_up(&mut model.cache)?,
        Message::ScrollDown => model.viewport.move_down(&mut model.cache)?,
        Message::JumpTop => model.viewport.jump_up(&mut model.cache)?,
        Message::JumpBottom => model.viewport.jump_down(&mut model.cache)?,
        Message::PageUp => model.viewport.page_up(&mut model.cache)?,
        Message::PageDown => model.viewport.page_down(&mut model.cache)?,

        // Rendering
        Message::SetRenderMode(mode) => model.viewport.set_render_mode(&mut model.cache, mode)?,
        Message::ToggleJsonFlavor => model.viewport.toggle_extended_json(&mut model.cache)?,

        // Marks
        Message::ToggleMark => model.viewport.toggle_mark_at_cursor(),
        Message::JumpNextMarked => model.viewport.jump_next_marked(&mut model.cache)?,
        Message::JumpPrevMarked => model.viewport.jump_prev_marked(&mut model.cache)?,
        Message::DragStart(row) => {
            if let Some(doc) = model.viewport.doc_for_row(row as usize) {
                model.viewport.drag_start(doc);
            }
        }
        Message::DragUpdate(row) => {
            if let Some(doc) = model.viewport.doc_for_row(row as usize) {
                model.viewport.drag_update(doc);
            }
        }
        Message::DragEnd(row) => {
            if let Some(doc) = model.viewport.doc_for_row(row as usize) {
                model.viewport.drag_end(doc);
            }
        }

        // Search prompt
        Message::OpenPrompt { initial } => {
            model.prompt = Some(PromptState::new("/", initial));
        }
        Message::PromptInput(ch) => {
            if let Some(prompt) = &mut model.prompt {
                prompt.insert(ch);
            }
        }
        Message::PromptBackspace => {
            if let Some(prompt) = &mut model.prompt {
                if !prompt.backspace() && prompt.text().is_empty() {
                    model.prompt = None;
                }
            }
        }
        Message::PromptDelete => {
            if let Some(prompt) = &mut model.prompt {
                prompt.delete();
            }
        }
        Message::PromptLeft => {
            if let Some(prompt) = &mut model.prompt {
                prompt.move_left();
            }
        }
        Message::PromptRight => {
            if let Some(prompt) = &mut model.prompt {
                prompt.move_right();
            }
        }
        Message::PromptHome => {
            if let Some(prompt) = &mut model.prompt {
                prompt.move_home();
            }
        }
        Message::PromptEnd => {
            if let Some(prompt) = &mut model.prompt {
                prompt.move_end();
            }
        }
        Message::PromptKillToStart => {
            if let Some(prompt) = &mut model.prompt {
                prompt.kill_to_start();
            }
        }
        Message::PromptCancel => {
            model.prompt = None;
        }
        Message::PromptConfirm => {
            if let Some(prompt) = model.prompt.take() {
                let text = prompt.text().to_string();
                if text.is_empty() {
                    model.status_extra = "No search pattern".to_string();
                } else {
                    model.last_search = Some(Search::parse(&text));
                    model.status_extra = "Searching...".to_string();
                    model.deferred.push_back(Message::RunSearch);
                }
            }
        }
        Message::RepeatSearch => {
            if model.last_search.is_some() {
                model.status_extra = "Searching...".to_string();
                model.deferred.push_back(Message::RunSearch);
            } else {
                model.status_extra = "No previous search".to_string();
            }
        }
        Message::RunSearch => run_search(&mut model)?,

        // Window
        Message::Resize(width, height) => {
            model
                .viewport
                .update_dimensions(&mut model.cache, width, height.saturating_sub(1))?;
        }

        // Application
        Message::Quit => {
            model.should_quit = true;
        }
    }

    Ok(model)
}

fn run_search(model: &mut Model) -> Result<(), CacheError> {
    match &model.last_search {
        None => {
            model.status_extra = "No search pattern".to_string();
        }
        Some(search) if !search.is_valid() => {
            model.status_extra = "Invalid search pattern".to_string();
        }
        Some(search) => {
            let hit = search::search_forward(
                &model.cache,
                model.viewport.cursor_doc(),
                search,
                model.viewport.render_mode(),
                model.viewport.json_flavor(),
            );
            tracing::debug!(query = search.text(), ?hit, "search finished");
            match hit {
                Some(doc) => {
                    model.status_extra.clear();
                    model.viewport.jump_to_doc(&mut model.cache, doc)?;
                }
                None => {
                    model.status_extra = "Pattern not found".to_string();
                }
            }
        }
    }
    Ok(())
}
