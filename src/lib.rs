#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::cast_lossless,
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::match_same_arms,
    clippy::collapsible_if,
    clippy::collapsible_else_if,
    clippy::missing_const_for_fn,
    clippy::uninlined_format_args
)]

//! # bv
//!
//! An interactive, less(1)-like terminal viewer for files containing a
//! contiguous stream of length-prefixed BSON records.
//!
//! The input file is mapped read-only and parsed lazily: idle event-loop
//! turns walk the length prefixes and extend an append-only document index,
//! so files larger than memory page smoothly. Documents are rendered on
//! demand as one-line JSON, pretty JSON, a per-field diagnostic form, or a
//! text-log projection; the viewport tracks position in (document,
//! sub-line) space, supports marking documents (including by mouse drag),
//! and searches either literally over rendered text or structurally with a
//! query document.
//!
//! ## Architecture
//!
//! The app uses The Elm Architecture (TEA) pattern:
//! - **Model**: Application state
//! - **Message**: Events and actions
//! - **Update**: State transitions
//! - **View**: Render to terminal
//!
//! ## Modules
//!
//! - [`app`]: Main application loop and state
//! - [`cache`]: Lazy incremental document cache over the mapped bytes
//! - [`render`]: Document-to-text rendering modes
//! - [`search`]: Literal and structured search
//! - [`query`]: Structured query filter
//! - [`ui`]: Terminal UI: viewport, prompt, status line, frame composition
//! - [`file`]: Input file mapping

pub mod app;
pub mod cache;
pub mod file;
pub mod query;
pub mod render;
pub mod search;
pub mod ui;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::app::{App, Message, Model};
    pub use crate::cache::DocumentCache;
    pub use crate::render::{JsonFlavor, RenderMode};
    pub use crate::ui::viewport::Viewport;
}
