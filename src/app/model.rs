use std::collections::VecDeque;
use std::path::PathBuf;

use crate::cache::{CacheError, DocumentCache};
use crate::search::Search;
use crate::ui::prompt::PromptState;
use crate::ui::viewport::Viewport;

use super::update::Message;

/// The complete application state.
///
/// All state lives here - no global or scattered state. The viewport and
/// cache compose instead of pointing at each other; operations that need
/// both borrow the two fields disjointly.
pub struct Model {
    /// The document cache over the mapped input bytes.
    pub cache: DocumentCache,
    /// Viewport state machine and visible plan.
    pub viewport: Viewport,
    /// Path to the input file, shown in the status line.
    pub file_path: PathBuf,
    /// Active search prompt, if any. While set, the bottom row shows the
    /// prompt instead of the status line and keys edit the buffer.
    pub prompt: Option<PromptState>,
    /// The retained search driven by `/` and repeated by `n`.
    pub last_search: Option<Search>,
    /// Transient message in the status line's `[extra]` field.
    pub status_extra: String,
    /// Run-after-next-paint queue, drained by the event loop after a draw.
    pub deferred: VecDeque<Message>,
    /// Whether the app should quit.
    pub should_quit: bool,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("file_path", &self.file_path)
            .field("cache", &self.cache)
            .field("status_extra", &self.status_extra)
            .field("should_quit", &self.should_quit)
            .finish_non_exhaustive()
    }
}

impl Model {
    /// Create a model over an initialized cache and compute the first
    /// visible plan (which may force-load up to one screen of documents).
    ///
    /// `terminal_size` is the full terminal; the bottom row is reserved for
    /// the status line.
    pub fn new(
        file_path: PathBuf,
        cache: DocumentCache,
        terminal_size: (u16, u16),
    ) -> Result<Self, CacheError> {
        let mut model = Self {
            cache,
            viewport: Viewport::new(terminal_size.0, terminal_size.1.saturating_sub(1)),
            file_path,
            prompt: None,
            last_search: None,
            status_extra: String::new(),
            deferred: VecDeque::new(),
            should_quit: false,
        };
        model.viewport.compute_visible(&mut model.cache)?;
        Ok(model)
    }
}

// Default exists to allow std::mem::take in the event loop; the placeholder
// is never rendered.
impl Default for Model {
    fn default() -> Self {
        Self {
            cache: DocumentCache::default(),
            viewport: Viewport::default(),
            file_path: PathBuf::new(),
            prompt: None,
            last_search: None,
            status_extra: String::new(),
            deferred: VecDeque::new(),
            should_quit: false,
        }
    }
}
