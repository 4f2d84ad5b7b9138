//! Status line.

use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::app::Model;

const MIB: f64 = 1_048_576.0;

/// Format the status line:
/// `<path> [doc N] [docs S-L/T+ (END)] [loaded P% M/T MiB] [extra]`
///
/// `+` marks a cache that is still loading, `(END)` appears only when the
/// cache is complete and the last document is on screen, and `[extra]`
/// carries transient messages.
pub fn status_text(model: &Model) -> String {
    let cache = &model.cache;
    let vp = &model.viewport;

    let plus = if cache.is_complete() { "" } else { "+" };
    let end = if cache.is_complete() && vp.last_displayed_doc() + 1 == cache.num_docs() {
        " (END)"
    } else {
        ""
    };
    let extra = if model.status_extra.is_empty() {
        String::new()
    } else {
        format!(" [{}]", model.status_extra)
    };

    format!(
        "{} [doc {}] [docs {}-{}/{}{}{}] [loaded {:.0}% {:.0}/{:.0} MiB]{}",
        model.file_path.display(),
        vp.cursor_doc(),
        vp.start_doc(),
        vp.last_displayed_doc(),
        cache.num_docs(),
        plus,
        end,
        cache.perc_of_file_seen(),
        cache.size_of_file_seen() as f64 / MIB,
        cache.size_of_file() as f64 / MIB,
        extra,
    )
}

pub fn render_status_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let bar = Paragraph::new(status_text(model))
        .style(Style::default().add_modifier(Modifier::REVERSED));
    frame.render_widget(bar, area);
}
