//! Viewport state machine.
//!
//! The [`Viewport`] owns everything about what is on screen: which document
//! starts the frame and how many of its leading sub-lines are hidden, the
//! cursor row, horizontal scroll, the mark set and drag selection, and the
//! per-frame visible plan. Motion operations mutate the state and recompute
//! the plan; drawing only reads the plan and never repeats the sub-line
//! walk.
//!
//! Every operation that can advance the cache takes `&mut DocumentCache` and
//! propagates parse errors; a malformed record anywhere in the scroll path
//! is fatal to the viewer.

use std::collections::BTreeSet;

use unicode_width::UnicodeWidthStr;

use crate::cache::{CacheError, DocumentCache};
use crate::render::{self, JsonFlavor, RenderMode};

/// One visible screen row: the owning document and the full sub-line text
/// (horizontal clipping happens at draw time).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub doc: usize,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Drag {
    first: usize,
    last: usize,
    /// Polarity fixed at drag-start: true selects, false deselects.
    marking: bool,
}

#[derive(Debug)]
pub struct Viewport {
    render_mode: RenderMode,
    json_flavor: JsonFlavor,

    /// First document with any sub-line on screen.
    start_doc: usize,
    /// Leading sub-lines of `start_doc` hidden above the top of the screen.
    start_line: usize,
    /// Screen row of the cursor.
    cursor_line: usize,
    /// Document under the cursor, derived from the plan.
    cursor_doc: usize,
    /// Horizontal scroll in display columns.
    start_col: usize,

    /// Visible plan: sub-line counts per on-screen document (the first entry
    /// includes the hidden `start_line` sub-lines), the rows themselves, and
    /// the last document touched by the walk.
    doc_lines: Vec<usize>,
    rows: Vec<Row>,
    last_displayed_doc: usize,
    longest_line_start_col: usize,

    main_lines: usize,
    main_cols: usize,

    marks: BTreeSet<usize>,
    drag: Option<Drag>,

    /// Set when the user asks for the end of a still-loading file; the
    /// loader finishes the jump once the cache completes.
    jump_to_end_after_load: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(80, 24)
    }
}

impl Viewport {
    pub fn new(cols: u16, lines: u16) -> Self {
        Self {
            render_mode: RenderMode::JsonOneline,
            json_flavor: JsonFlavor::Strict,
            start_doc: 0,
            start_line: 0,
            cursor_line: 0,
            cursor_doc: 0,
            start_col: 0,
            doc_lines: Vec::new(),
            rows: Vec::new(),
            last_displayed_doc: 0,
            longest_line_start_col: 0,
            main_lines: lines as usize,
            main_cols: cols as usize,
            marks: BTreeSet::new(),
            drag: None,
            jump_to_end_after_load: false,
        }
    }

    pub fn start_doc(&self) -> usize {
        self.start_doc
    }

    pub fn start_line(&self) -> usize {
        self.start_line
    }

    pub fn cursor_line(&self) -> usize {
        self.cursor_line
    }

    pub fn cursor_doc(&self) -> usize {
        self.cursor_doc
    }

    pub fn start_col(&self) -> usize {
        self.start_col
    }

    pub fn longest_line_start_col(&self) -> usize {
        self.longest_line_start_col
    }

    pub fn last_displayed_doc(&self) -> usize {
        self.last_displayed_doc
    }

    pub fn last_displayed_line(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }

    pub fn doc_lines(&self) -> &[usize] {
        &self.doc_lines
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn main_lines(&self) -> usize {
        self.main_lines
    }

    pub fn main_cols(&self) -> usize {
        self.main_cols
    }

    pub fn render_mode(&self) -> RenderMode {
        self.render_mode
    }

    pub fn json_flavor(&self) -> JsonFlavor {
        self.json_flavor
    }

    pub fn jump_to_end_after_load(&self) -> bool {
        self.jump_to_end_after_load
    }

    fn render_doc(&self, cache: &mut DocumentCache, doc: usize) -> Result<String, CacheError> {
        let raw = cache.index(doc)?;
        Ok(render::render(raw, self.render_mode, self.json_flavor))
    }

    /// Full rendered sub-line count of one document.
    fn doc_line_count(&self, cache: &mut DocumentCache, doc: usize) -> Result<usize, CacheError> {
        Ok(self.render_doc(cache, doc)?.split('\n').count())
    }

    /// Rebuild the visible plan from `(start_doc, start_line)`.
    ///
    /// Walks documents forward, splitting each rendering on `\n`, skipping
    /// the first `start_line` sub-lines, until the screen is full or the
    /// (complete) cache runs out of documents. Forces loads as it goes.
    /// Afterwards the cursor is clamped into the plan and `cursor_doc`
    /// re-derived.
    pub fn compute_visible(&mut self, cache: &mut DocumentCache) -> Result<(), CacheError> {
        self.rows.clear();
        self.doc_lines.clear();
        self.last_displayed_doc = self.start_doc;

        let mut longest = 0usize;
        let mut doc = self.start_doc;
        let mut skip = self.start_line;
        let mut line = 0usize;

        while line < self.main_lines && (!cache.is_complete() || doc < cache.num_docs()) {
            let text = self.render_doc(cache, doc)?;
            let mut this_doc_lines = 0usize;
            for sub in text.split('\n') {
                if line >= self.main_lines {
                    break;
                }
                if skip > 0 {
                    skip -= 1;
                } else {
                    longest = longest.max(sub.width());
                    self.rows.push(Row {
                        doc,
                        text: sub.to_string(),
                    });
                    line += 1;
                }
                this_doc_lines += 1;
            }
            self.doc_lines.push(this_doc_lines);
            self.last_displayed_doc = doc;
            doc += 1;
        }

        self.longest_line_start_col = longest.saturating_sub(self.main_cols);
        self.start_col = self.start_col.min(self.longest_line_start_col);
        self.cursor_line = self.cursor_line.min(self.last_displayed_line());
        self.sync_cursor_doc();
        Ok(())
    }

    fn sync_cursor_doc(&mut self) {
        self.cursor_doc = self
            .rows
            .get(self.cursor_line)
            .map_or(self.start_doc, |row| row.doc);
    }

    /// Document shown on screen row `row`, if any.
    pub fn doc_for_row(&self, row: usize) -> Option<usize> {
        self.rows.get(row).map(|r| r.doc)
    }

    // --- horizontal motion -------------------------------------------------

    pub fn move_left(&mut self, cache: &mut DocumentCache) -> Result<(), CacheError> {
        if self.start_col > 0 {
            self.start_col -= 1;
            self.compute_visible(cache)?;
        }
        Ok(())
    }

    pub fn move_right(&mut self, cache: &mut DocumentCache) -> Result<(), CacheError> {
        if self.start_col < self.longest_line_start_col {
            self.start_col += 1;
            self.compute_visible(cache)?;
        }
        Ok(())
    }

    pub fn jump_left(&mut self, cache: &mut DocumentCache) -> Result<(), CacheError> {
        if self.start_col != 0 {
            self.start_col = 0;
            self.compute_visible(cache)?;
        }
        Ok(())
    }

    pub fn jump_right(&mut self, cache: &mut DocumentCache) -> Result<(), CacheError> {
        if self.start_col != self.longest_line_start_col {
            self.start_col = self.longest_line_start_col;
            self.compute_visible(cache)?;
        }
        Ok(())
    }

    // --- cursor motion within the screen -----------------------------------

    pub fn cursor_top(&mut self, cache: &mut DocumentCache) -> Result<(), CacheError> {
        self.cursor_line = 0;
        self.compute_visible(cache)
    }

    pub fn cursor_middle(&mut self, cache: &mut DocumentCache) -> Result<(), CacheError> {
        self.cursor_line = (self.main_lines / 2).min(self.last_displayed_line());
        self.compute_visible(cache)
    }

    pub fn cursor_bottom(&mut self, cache: &mut DocumentCache) -> Result<(), CacheError> {
        self.cursor_line = self
            .main_lines
            .saturating_sub(1)
            .min(self.last_displayed_line());
        self.compute_visible(cache)
    }

    pub fn cursor_up(&mut self, cache: &mut DocumentCache) -> Result<(), CacheError> {
        if self.cursor_line > 0 {
            self.cursor_line -= 1;
            self.compute_visible(cache)?;
        }
        Ok(())
    }

    pub fn cursor_down(&mut self, cache: &mut DocumentCache) -> Result<(), CacheError> {
        if self.cursor_line + 1 < self.main_lines && self.cursor_line < self.last_displayed_line() {
            self.cursor_line += 1;
            self.compute_visible(cache)?;
        }
        Ok(())
    }

    /// Cursor up; pushing against the top edge scrolls by one sub-line.
    pub fn move_cursor_up(&mut self, cache: &mut DocumentCache) -> Result<(), CacheError> {
        if self.cursor_line == 0 {
            self.move_up(cache)?;
        }
        self.cursor_up(cache)
    }

    /// Cursor down; pushing against the bottom edge scrolls by one sub-line.
    pub fn move_cursor_down(&mut self, cache: &mut DocumentCache) -> Result<(), CacheError> {
        if self.main_lines > 0 && self.cursor_line + 1 == self.main_lines {
            self.move_down(cache)?;
        }
        self.cursor_down(cache)
    }

    // --- scrolling ----------------------------------------------------------

    fn advance_doc(&mut self, cache: &DocumentCache) -> bool {
        if !cache.is_complete() || self.start_doc + 1 < cache.num_docs() {
            self.start_doc += 1;
            self.start_line = 0;
            true
        } else {
            false
        }
    }

    /// Scroll down one sub-line. The cursor is compensated upward so it
    /// stays over the same content where possible.
    pub fn move_down(&mut self, cache: &mut DocumentCache) -> Result<(), CacheError> {
        self.compute_visible(cache)?;
        let Some(&first) = self.doc_lines.first() else {
            return Ok(());
        };
        if self.start_line + 1 >= first {
            // at the last sub-line of the leading document
            if !self.advance_doc(cache) {
                return Ok(());
            }
        } else {
            self.start_line += 1;
        }
        self.cursor_line = self.cursor_line.saturating_sub(1);
        self.compute_visible(cache)
    }

    /// Scroll up one sub-line, stepping onto the previous document's last
    /// sub-line at a boundary. The cursor is compensated downward.
    pub fn move_up(&mut self, cache: &mut DocumentCache) -> Result<(), CacheError> {
        self.compute_visible(cache)?;
        if self.start_line == 0 {
            if self.start_doc == 0 {
                return Ok(());
            }
            self.start_doc -= 1;
            self.start_line = self.doc_line_count(cache, self.start_doc)?.saturating_sub(1);
        } else {
            self.start_line -= 1;
        }
        if self.cursor_line + 1 < self.main_lines {
            self.cursor_line += 1;
        }
        self.compute_visible(cache)
    }

    pub fn move_next_doc(&mut self, cache: &mut DocumentCache) -> Result<(), CacheError> {
        if self.advance_doc(cache) {
            self.compute_visible(cache)?;
        }
        Ok(())
    }

    pub fn move_prev_doc(&mut self, cache: &mut DocumentCache) -> Result<(), CacheError> {
        if self.start_doc > 0 {
            self.start_doc -= 1;
            self.start_line = 0;
            self.compute_visible(cache)?;
        }
        Ok(())
    }

    /// One backward sub-line step of the start position, ignoring the cursor.
    fn step_up(&mut self, cache: &mut DocumentCache) -> Result<(), CacheError> {
        if self.start_line > 0 {
            self.start_line -= 1;
        } else {
            self.start_doc -= 1;
            self.start_line = self.doc_line_count(cache, self.start_doc)?.saturating_sub(1);
        }
        Ok(())
    }

    /// Scroll up one page. Post-condition: the previous top sub-line, and
    /// with it the previous `start_doc`, sits on the last screen row. If the
    /// walk reaches the top of the file first, the cursor is compensated
    /// downward by the distance actually scrolled.
    pub fn page_up(&mut self, cache: &mut DocumentCache) -> Result<(), CacheError> {
        if self.start_doc == 0 && self.start_line == 0 {
            return self.cursor_top(cache);
        }
        let target = self.main_lines.saturating_sub(1);
        let mut scrolled = 0usize;
        while scrolled < target && !(self.start_doc == 0 && self.start_line == 0) {
            self.step_up(cache)?;
            scrolled += 1;
        }
        self.compute_visible(cache)?;
        if scrolled < target {
            self.cursor_line = (self.cursor_line + scrolled).min(self.last_displayed_line());
        } else {
            self.cursor_line = self.last_displayed_line();
        }
        self.sync_cursor_doc();
        Ok(())
    }

    /// Scroll down one page: the previous `last_displayed_doc` becomes the
    /// new `start_doc`, skipping the sub-lines of it that were already
    /// shown. Landing on the final partial page re-anchors to the end of the
    /// file with the cursor pinned where the partial content began.
    pub fn page_down(&mut self, cache: &mut DocumentCache) -> Result<(), CacheError> {
        self.compute_visible(cache)?;
        if self.rows.len() < self.main_lines {
            // already on the last page
            self.cursor_line = self.last_displayed_line();
            self.sync_cursor_doc();
            return Ok(());
        }

        let shown = self.doc_lines.last().copied().unwrap_or(0);
        self.start_doc = self.last_displayed_doc;
        self.start_line = shown;

        let total = self.doc_line_count(cache, self.start_doc)?;
        if self.start_line >= total {
            // the document ended exactly at the bottom of the old screen
            if !cache.is_complete() || self.start_doc + 1 < cache.num_docs() {
                self.start_doc += 1;
                self.start_line = 0;
            } else {
                self.start_line = total.saturating_sub(1);
            }
        }

        self.cursor_line = 0;
        self.compute_visible(cache)?;

        if cache.is_complete()
            && self.last_displayed_doc + 1 == cache.num_docs()
            && self.rows.len() < self.main_lines
        {
            let empty = self.main_lines - self.rows.len();
            self.jump_down(cache)?;
            self.cursor_line = empty.min(self.last_displayed_line());
            self.sync_cursor_doc();
        }
        Ok(())
    }

    /// Jump to the top of the file, cursor on the first row.
    pub fn jump_up(&mut self, cache: &mut DocumentCache) -> Result<(), CacheError> {
        self.start_doc = 0;
        self.start_line = 0;
        self.cursor_line = 0;
        self.compute_visible(cache)
    }

    /// Jump to the end of the file: the last document's last sub-line on the
    /// bottom row, cursor at the bottom. On an incomplete cache this only
    /// arms `jump_to_end_after_load`; the loader finishes the jump.
    pub fn jump_down(&mut self, cache: &mut DocumentCache) -> Result<(), CacheError> {
        if !cache.is_complete() {
            self.jump_to_end_after_load = true;
            return Ok(());
        }

        // Fill the screen backward from the last document.
        let mut doc = cache.num_docs().saturating_sub(1);
        let mut total = self.doc_line_count(cache, doc)?;
        while total < self.main_lines && doc > 0 {
            doc -= 1;
            total += self.doc_line_count(cache, doc)?;
        }
        self.start_doc = doc;
        self.start_line = total.saturating_sub(self.main_lines);
        self.compute_visible(cache)?;
        self.cursor_line = self.last_displayed_line();
        self.sync_cursor_doc();
        self.jump_to_end_after_load = false;
        Ok(())
    }

    /// Bring `doc` into view. Off-screen targets are placed near the
    /// one-quarter mark of the screen; on-screen targets only move the
    /// cursor.
    pub fn jump_to_doc(&mut self, cache: &mut DocumentCache, doc: usize) -> Result<(), CacheError> {
        let backwards = doc < self.start_doc || (doc == self.start_doc && self.start_line > 0);
        if backwards || doc > self.last_displayed_doc {
            self.start_doc = doc;
            self.start_line = 0;
            self.cursor_line = 0;
            let target = self.main_lines / 4;
            if target == 0 {
                return self.compute_visible(cache);
            }
            for _ in 0..target {
                self.move_up(cache)?;
            }
            Ok(())
        } else {
            self.cursor_line = self
                .rows
                .iter()
                .position(|row| row.doc == doc)
                .unwrap_or(0);
            self.sync_cursor_doc();
            Ok(())
        }
    }

    // --- render settings ----------------------------------------------------

    pub fn set_render_mode(
        &mut self,
        cache: &mut DocumentCache,
        mode: RenderMode,
    ) -> Result<(), CacheError> {
        self.render_mode = mode;
        self.start_col = 0;
        self.clamp_start_line(cache)?;
        self.compute_visible(cache)
    }

    pub fn toggle_extended_json(&mut self, cache: &mut DocumentCache) -> Result<(), CacheError> {
        self.json_flavor = self.json_flavor.toggled();
        self.clamp_start_line(cache)?;
        self.compute_visible(cache)
    }

    /// Changing render mode or flavor changes sub-line counts; keep
    /// `start_line` inside the leading document's new rendering.
    fn clamp_start_line(&mut self, cache: &mut DocumentCache) -> Result<(), CacheError> {
        if self.start_line > 0 {
            let total = self.doc_line_count(cache, self.start_doc)?;
            self.start_line = self.start_line.min(total.saturating_sub(1));
        }
        Ok(())
    }

    pub fn update_dimensions(
        &mut self,
        cache: &mut DocumentCache,
        cols: u16,
        lines: u16,
    ) -> Result<(), CacheError> {
        let (cols, lines) = (cols as usize, lines as usize);
        if cols != self.main_cols || lines != self.main_lines {
            self.main_cols = cols;
            self.main_lines = lines;
            self.compute_visible(cache)?;
        }
        Ok(())
    }

    // --- marks and drag selection --------------------------------------------

    /// Marked either persistently or by the active drag range with the
    /// drag's fixed polarity.
    pub fn is_marked(&self, doc: usize) -> bool {
        if let Some(drag) = &self.drag {
            let (lo, hi) = if drag.first <= drag.last {
                (drag.first, drag.last)
            } else {
                (drag.last, drag.first)
            };
            if (lo..=hi).contains(&doc) {
                return drag.marking;
            }
        }
        self.marks.contains(&doc)
    }

    pub fn mark_doc(&mut self, doc: usize) {
        self.marks.insert(doc);
    }

    pub fn unmark_doc(&mut self, doc: usize) {
        self.marks.remove(&doc);
    }

    pub fn toggle_mark(&mut self, doc: usize) {
        if self.is_marked(doc) {
            self.unmark_doc(doc);
        } else {
            self.mark_doc(doc);
        }
    }

    pub fn toggle_mark_at_cursor(&mut self) {
        self.toggle_mark(self.cursor_doc);
    }

    /// Strict successor in the mark set, wrapping to the front.
    pub fn next_marked(&self, doc: usize) -> Option<usize> {
        if self.marks.is_empty() {
            return None;
        }
        self.marks
            .range(doc + 1..)
            .next()
            .or_else(|| self.marks.iter().next())
            .copied()
    }

    /// Strict predecessor in the mark set, wrapping to the back.
    pub fn prev_marked(&self, doc: usize) -> Option<usize> {
        if self.marks.is_empty() {
            return None;
        }
        self.marks
            .range(..doc)
            .next_back()
            .or_else(|| self.marks.iter().next_back())
            .copied()
    }

    pub fn jump_next_marked(&mut self, cache: &mut DocumentCache) -> Result<(), CacheError> {
        if let Some(target) = self.next_marked(self.cursor_doc) {
            self.jump_to_doc(cache, target)?;
        }
        Ok(())
    }

    pub fn jump_prev_marked(&mut self, cache: &mut DocumentCache) -> Result<(), CacheError> {
        if let Some(target) = self.prev_marked(self.cursor_doc) {
            self.jump_to_doc(cache, target)?;
        }
        Ok(())
    }

    pub fn drag_start(&mut self, doc: usize) {
        self.drag = Some(Drag {
            first: doc,
            last: doc,
            marking: !self.is_marked(doc),
        });
    }

    pub fn drag_update(&mut self, doc: usize) {
        if let Some(drag) = &mut self.drag {
            drag.last = doc;
        }
    }

    /// Commit the drag: apply the fixed polarity to every document in the
    /// inclusive range.
    pub fn drag_end(&mut self, doc: usize) {
        let Some(mut drag) = self.drag.take() else {
            return;
        };
        drag.last = doc;
        let (lo, hi) = if drag.first <= drag.last {
            (drag.first, drag.last)
        } else {
            (drag.last, drag.first)
        };
        for target in lo..=hi {
            if drag.marking {
                self.mark_doc(target);
            } else {
                self.unmark_doc(target);
            }
        }
    }

    pub fn drag_active(&self) -> bool {
        self.drag.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::stream;
    use bson::doc;

    /// `n` documents rendering to one sub-line each in oneline mode.
    fn oneline_cache(n: i32) -> DocumentCache {
        let docs: Vec<bson::Document> = (0..n).map(|i| doc! { "a": i }).collect();
        let mut cache = DocumentCache::new(stream(&docs)).unwrap();
        cache.load_some(usize::MAX).unwrap();
        cache
    }

    /// Viewport over an 80x10 screen in oneline mode, plan computed.
    fn viewport(cache: &mut DocumentCache) -> Viewport {
        let mut vp = Viewport::new(80, 10);
        vp.compute_visible(cache).unwrap();
        vp
    }

    /// Pretty mode: each `{a: i}` document renders as 3 sub-lines.
    fn pretty_viewport(cache: &mut DocumentCache) -> Viewport {
        let mut vp = Viewport::new(80, 10);
        vp.set_render_mode(cache, RenderMode::JsonPretty).unwrap();
        vp
    }

    fn assert_invariants(vp: &Viewport, cache: &DocumentCache) {
        if !vp.rows().is_empty() {
            assert!(vp.start_line() < vp.doc_lines()[0], "start_line in first doc");
            assert!(vp.cursor_line() <= vp.last_displayed_line());
            assert!(vp.last_displayed_line() <= vp.main_lines().saturating_sub(1));
            assert_eq!(
                vp.doc_for_row(vp.cursor_line()),
                Some(vp.cursor_doc()),
                "cursor_doc derived from plan"
            );
        }
        assert!(vp.start_col() <= vp.longest_line_start_col());
        assert!(vp.start_doc() < cache.num_docs().max(1));
    }

    #[test]
    fn test_plan_fills_screen_from_start_doc() {
        let mut cache = oneline_cache(20);
        let vp = viewport(&mut cache);
        assert_eq!(vp.rows().len(), 10);
        assert_eq!(vp.start_doc(), 0);
        assert_eq!(vp.last_displayed_doc(), 9);
        assert_eq!(vp.last_displayed_line(), 9);
        assert_eq!(vp.doc_lines(), &[1; 10]);
    }

    #[test]
    fn test_plan_short_file_leaves_rows_unused() {
        let mut cache = oneline_cache(4);
        let vp = viewport(&mut cache);
        assert_eq!(vp.rows().len(), 4);
        assert_eq!(vp.last_displayed_doc(), 3);
    }

    #[test]
    fn test_pretty_mode_multi_line_accounting() {
        let mut cache = oneline_cache(20);
        let vp = pretty_viewport(&mut cache);
        // 3 sub-lines per document; 10 rows = 3 docs + 1 truncated
        assert_eq!(vp.rows().len(), 10);
        assert_eq!(vp.doc_lines(), &[3, 3, 3, 1]);
        assert_eq!(vp.last_displayed_doc(), 3);
    }

    #[test]
    fn test_move_down_then_up_round_trips() {
        let mut cache = oneline_cache(30);
        let mut vp = pretty_viewport(&mut cache);
        vp.move_down(&mut cache).unwrap();
        let mid = (vp.start_doc(), vp.start_line());
        assert_eq!(mid, (0, 1));
        vp.move_up(&mut cache).unwrap();
        assert_eq!((vp.start_doc(), vp.start_line()), (0, 0));
    }

    #[test]
    fn test_move_down_crosses_document_boundary() {
        let mut cache = oneline_cache(30);
        let mut vp = pretty_viewport(&mut cache);
        vp.move_down(&mut cache).unwrap();
        vp.move_down(&mut cache).unwrap();
        assert_eq!((vp.start_doc(), vp.start_line()), (0, 2));
        vp.move_down(&mut cache).unwrap();
        assert_eq!((vp.start_doc(), vp.start_line()), (1, 0));
        vp.move_up(&mut cache).unwrap();
        assert_eq!((vp.start_doc(), vp.start_line()), (0, 2));
    }

    #[test]
    fn test_move_up_at_top_is_noop() {
        let mut cache = oneline_cache(5);
        let mut vp = viewport(&mut cache);
        vp.move_up(&mut cache).unwrap();
        assert_eq!((vp.start_doc(), vp.start_line()), (0, 0));
    }

    #[test]
    fn test_move_down_stops_at_last_document() {
        let mut cache = oneline_cache(3);
        let mut vp = viewport(&mut cache);
        for _ in 0..10 {
            vp.move_down(&mut cache).unwrap();
        }
        // the last document's last sub-line can reach the top, no further
        assert_eq!(vp.start_doc(), 2);
        assert_invariants(&vp, &cache);
    }

    #[test]
    fn test_cursor_motion_clamps_to_content() {
        let mut cache = oneline_cache(4);
        let mut vp = viewport(&mut cache);
        vp.cursor_bottom(&mut cache).unwrap();
        assert_eq!(vp.cursor_line(), 3);
        assert_eq!(vp.cursor_doc(), 3);
        vp.cursor_down(&mut cache).unwrap();
        assert_eq!(vp.cursor_line(), 3);
        vp.cursor_top(&mut cache).unwrap();
        assert_eq!(vp.cursor_line(), 0);
        vp.cursor_up(&mut cache).unwrap();
        assert_eq!(vp.cursor_line(), 0);
    }

    #[test]
    fn test_cursor_middle_on_full_screen() {
        let mut cache = oneline_cache(30);
        let mut vp = viewport(&mut cache);
        vp.cursor_middle(&mut cache).unwrap();
        assert_eq!(vp.cursor_line(), 5);
        assert_eq!(vp.cursor_doc(), 5);
    }

    #[test]
    fn test_move_cursor_down_scrolls_at_bottom_edge() {
        let mut cache = oneline_cache(30);
        let mut vp = viewport(&mut cache);
        vp.cursor_bottom(&mut cache).unwrap();
        vp.move_cursor_down(&mut cache).unwrap();
        assert_eq!(vp.start_doc(), 1);
        assert_eq!(vp.cursor_line(), 9);
        assert_eq!(vp.cursor_doc(), 10);
    }

    #[test]
    fn test_move_cursor_up_scrolls_at_top_edge() {
        let mut cache = oneline_cache(30);
        let mut vp = viewport(&mut cache);
        vp.move_next_doc(&mut cache).unwrap();
        assert_eq!(vp.start_doc(), 1);
        vp.move_cursor_up(&mut cache).unwrap();
        assert_eq!(vp.start_doc(), 0);
        assert_eq!(vp.cursor_line(), 0);
    }

    #[test]
    fn test_page_down_starts_at_partially_shown_last_doc() {
        let mut cache = oneline_cache(40);
        let mut vp = pretty_viewport(&mut cache);
        // plan: docs 0-3, doc 3 truncated after 1 of its 3 sub-lines
        let old_last = vp.last_displayed_doc();
        vp.page_down(&mut cache).unwrap();
        assert_eq!(vp.start_doc(), old_last);
        assert_eq!(vp.start_line(), 1);
        assert_eq!(vp.cursor_line(), 0);
        assert_invariants(&vp, &cache);
    }

    #[test]
    fn test_page_down_skips_fully_shown_last_doc() {
        let mut cache = oneline_cache(40);
        let mut vp = viewport(&mut cache);
        // doc 9 was fully displayed on the old screen, so the new page
        // starts just past it
        vp.page_down(&mut cache).unwrap();
        assert_eq!((vp.start_doc(), vp.start_line()), (10, 0));
        assert_eq!(vp.cursor_line(), 0);
        assert_invariants(&vp, &cache);
    }

    #[test]
    fn test_page_down_on_last_page_pins_cursor_bottom() {
        let mut cache = oneline_cache(5);
        let mut vp = viewport(&mut cache);
        vp.page_down(&mut cache).unwrap();
        assert_eq!(vp.start_doc(), 0);
        assert_eq!(vp.cursor_line(), 4);
    }

    #[test]
    fn test_page_down_into_final_partial_page() {
        let mut cache = oneline_cache(14);
        let mut vp = viewport(&mut cache);
        vp.page_down(&mut cache).unwrap();
        // 14 docs on a 10-row screen: the end is re-anchored so the last
        // document sits on the bottom row
        assert_eq!(vp.last_displayed_doc(), 13);
        assert_eq!(vp.last_displayed_line(), 9);
        // the partial page showed docs 10-13 on four rows; after the
        // re-anchor its first document sits at row 6, and so does the cursor
        assert_eq!(vp.cursor_line(), 6);
        assert_eq!(vp.cursor_doc(), 10);
        assert_invariants(&vp, &cache);
    }

    #[test]
    fn test_page_up_post_condition() {
        let mut cache = oneline_cache(40);
        let mut vp = viewport(&mut cache);
        vp.page_down(&mut cache).unwrap();
        vp.page_down(&mut cache).unwrap();
        let old_start = vp.start_doc();
        vp.page_up(&mut cache).unwrap();
        assert_eq!(vp.last_displayed_doc(), old_start);
        assert_eq!(vp.cursor_line(), vp.last_displayed_line());
        assert_invariants(&vp, &cache);
    }

    #[test]
    fn test_page_up_crashing_into_top_compensates_cursor() {
        let mut cache = oneline_cache(40);
        let mut vp = viewport(&mut cache);
        // scroll down 3 sub-lines, cursor at top
        for _ in 0..3 {
            vp.move_down(&mut cache).unwrap();
        }
        vp.cursor_top(&mut cache).unwrap();
        vp.page_up(&mut cache).unwrap();
        assert_eq!((vp.start_doc(), vp.start_line()), (0, 0));
        // only 3 rows were scrolled; cursor moved down by the same distance
        assert_eq!(vp.cursor_line(), 3);
        assert_eq!(vp.cursor_doc(), 3);
    }

    #[test]
    fn test_page_up_at_top_homes_cursor() {
        let mut cache = oneline_cache(40);
        let mut vp = viewport(&mut cache);
        vp.cursor_middle(&mut cache).unwrap();
        vp.page_up(&mut cache).unwrap();
        assert_eq!(vp.cursor_line(), 0);
        assert_eq!(vp.start_doc(), 0);
    }

    #[test]
    fn test_jump_up_is_idempotent() {
        let mut cache = oneline_cache(40);
        let mut vp = viewport(&mut cache);
        vp.page_down(&mut cache).unwrap();
        vp.jump_up(&mut cache).unwrap();
        let snapshot = (vp.start_doc(), vp.start_line(), vp.cursor_line());
        vp.jump_up(&mut cache).unwrap();
        assert_eq!((vp.start_doc(), vp.start_line(), vp.cursor_line()), snapshot);
        assert_eq!(snapshot, (0, 0, 0));
    }

    #[test]
    fn test_jump_down_places_last_line_on_bottom_row() {
        let mut cache = oneline_cache(40);
        let mut vp = viewport(&mut cache);
        vp.jump_down(&mut cache).unwrap();
        assert_eq!(vp.last_displayed_doc(), 39);
        assert_eq!(vp.last_displayed_line(), 9);
        assert_eq!(vp.cursor_line(), 9);
        assert_eq!(vp.cursor_doc(), 39);
        assert_eq!(vp.start_doc(), 30);
    }

    #[test]
    fn test_jump_down_is_idempotent() {
        let mut cache = oneline_cache(40);
        let mut vp = viewport(&mut cache);
        vp.jump_down(&mut cache).unwrap();
        let snapshot = (vp.start_doc(), vp.start_line(), vp.cursor_line());
        vp.jump_down(&mut cache).unwrap();
        assert_eq!((vp.start_doc(), vp.start_line(), vp.cursor_line()), snapshot);
    }

    #[test]
    fn test_jump_down_short_file_shows_everything() {
        let mut cache = oneline_cache(4);
        let mut vp = viewport(&mut cache);
        vp.jump_down(&mut cache).unwrap();
        assert_eq!(vp.start_doc(), 0);
        assert_eq!(vp.cursor_line(), 3);
    }

    #[test]
    fn test_jump_down_defers_while_loading() {
        let docs: Vec<bson::Document> = (0..50).map(|i| doc! { "a": i }).collect();
        let mut cache = DocumentCache::new(stream(&docs)).unwrap();
        let mut vp = viewport(&mut cache);
        let before = (vp.start_doc(), vp.start_line());

        vp.jump_down(&mut cache).unwrap();
        assert!(vp.jump_to_end_after_load());
        assert_eq!((vp.start_doc(), vp.start_line()), before);

        cache.load_some(usize::MAX).unwrap();
        vp.jump_down(&mut cache).unwrap();
        assert!(!vp.jump_to_end_after_load());
        assert_eq!(vp.last_displayed_doc(), 49);
        assert_eq!(vp.cursor_line(), 9);
    }

    #[test]
    fn test_jump_idempotence_horizontal_and_cursor() {
        let mut cache = oneline_cache(20);
        let mut vp = viewport(&mut cache);
        type Op = fn(&mut Viewport, &mut DocumentCache) -> Result<(), CacheError>;
        let ops: [Op; 5] = [
            Viewport::jump_left,
            Viewport::jump_right,
            Viewport::cursor_top,
            Viewport::cursor_middle,
            Viewport::cursor_bottom,
        ];
        for op in ops {
            op(&mut vp, &mut cache).unwrap();
            let snapshot = (vp.start_col(), vp.cursor_line(), vp.cursor_doc());
            op(&mut vp, &mut cache).unwrap();
            assert_eq!((vp.start_col(), vp.cursor_line(), vp.cursor_doc()), snapshot);
        }
    }

    #[test]
    fn test_horizontal_scroll_clamps() {
        let docs = vec![
            doc! { "message": "x".repeat(200) },
            doc! { "a": 1 },
        ];
        let mut cache = DocumentCache::new(stream(&docs)).unwrap();
        cache.load_some(usize::MAX).unwrap();
        let mut vp = viewport(&mut cache);
        assert!(vp.longest_line_start_col() > 0);

        vp.jump_right(&mut cache).unwrap();
        assert_eq!(vp.start_col(), vp.longest_line_start_col());
        vp.move_right(&mut cache).unwrap();
        assert_eq!(vp.start_col(), vp.longest_line_start_col());

        vp.jump_left(&mut cache).unwrap();
        assert_eq!(vp.start_col(), 0);
        vp.move_left(&mut cache).unwrap();
        assert_eq!(vp.start_col(), 0);
    }

    #[test]
    fn test_set_render_mode_resets_horizontal_scroll() {
        let docs = vec![doc! { "message": "x".repeat(200) }];
        let mut cache = DocumentCache::new(stream(&docs)).unwrap();
        let mut vp = viewport(&mut cache);
        vp.jump_right(&mut cache).unwrap();
        assert!(vp.start_col() > 0);
        vp.set_render_mode(&mut cache, RenderMode::JsonPretty).unwrap();
        assert_eq!(vp.start_col(), 0);
        assert_eq!(vp.render_mode(), RenderMode::JsonPretty);
    }

    #[test]
    fn test_toggle_extended_json_flips_flavor() {
        let mut cache = oneline_cache(2);
        let mut vp = viewport(&mut cache);
        assert_eq!(vp.json_flavor(), JsonFlavor::Strict);
        vp.toggle_extended_json(&mut cache).unwrap();
        assert_eq!(vp.json_flavor(), JsonFlavor::Extended);
        vp.toggle_extended_json(&mut cache).unwrap();
        assert_eq!(vp.json_flavor(), JsonFlavor::Strict);
    }

    #[test]
    fn test_resize_recomputes_plan() {
        let mut cache = oneline_cache(30);
        let mut vp = viewport(&mut cache);
        vp.update_dimensions(&mut cache, 80, 5).unwrap();
        assert_eq!(vp.rows().len(), 5);
        assert_invariants(&vp, &cache);
    }

    #[test]
    fn test_doc_for_row_respects_hidden_start_lines() {
        let mut cache = oneline_cache(30);
        let mut vp = pretty_viewport(&mut cache);
        vp.move_down(&mut cache).unwrap();
        // start_line = 1: rows 0..2 are the tail of doc 0, row 2 starts doc 1
        assert_eq!(vp.doc_for_row(0), Some(0));
        assert_eq!(vp.doc_for_row(1), Some(0));
        assert_eq!(vp.doc_for_row(2), Some(1));
    }

    #[test]
    fn test_mark_toggle_round_trips() {
        let mut cache = oneline_cache(10);
        let mut vp = viewport(&mut cache);
        assert!(!vp.is_marked(4));
        vp.toggle_mark(4);
        assert!(vp.is_marked(4));
        vp.toggle_mark(4);
        assert!(!vp.is_marked(4));
    }

    #[test]
    fn test_marked_navigation_wraps() {
        let mut cache = oneline_cache(10);
        let mut vp = viewport(&mut cache);
        vp.mark_doc(2);
        vp.mark_doc(7);

        assert_eq!(vp.next_marked(0), Some(2));
        assert_eq!(vp.next_marked(2), Some(7));
        assert_eq!(vp.next_marked(7), Some(2)); // wrap
        assert_eq!(vp.prev_marked(7), Some(2));
        assert_eq!(vp.prev_marked(2), Some(7)); // wrap
        assert_eq!(vp.next_marked(vp.prev_marked(7).unwrap()), Some(7));
    }

    #[test]
    fn test_marked_navigation_empty_set() {
        let mut cache = oneline_cache(10);
        let vp = viewport(&mut cache);
        assert_eq!(vp.next_marked(0), None);
        assert_eq!(vp.prev_marked(5), None);
    }

    #[test]
    fn test_drag_marks_inclusive_range() {
        let mut cache = oneline_cache(10);
        let mut vp = viewport(&mut cache);
        vp.drag_start(2);
        vp.drag_update(5);
        // polarity visible during the drag
        assert!(vp.is_marked(3));
        assert!(!vp.is_marked(6));
        vp.drag_end(5);
        assert!(!vp.drag_active());
        for doc in 2..=5 {
            assert!(vp.is_marked(doc));
        }
        assert!(!vp.is_marked(1));
    }

    #[test]
    fn test_drag_upwards_and_deselect_polarity() {
        let mut cache = oneline_cache(10);
        let mut vp = viewport(&mut cache);
        for doc in 0..10 {
            vp.mark_doc(doc);
        }
        // starting on a marked doc fixes deselect polarity
        vp.drag_start(7);
        vp.drag_update(3);
        assert!(!vp.is_marked(5));
        vp.drag_end(3);
        for doc in 3..=7 {
            assert!(!vp.is_marked(doc));
        }
        assert!(vp.is_marked(0));
        assert!(vp.is_marked(8));
    }

    #[test]
    fn test_jump_to_doc_onscreen_moves_cursor_only() {
        let mut cache = oneline_cache(30);
        let mut vp = viewport(&mut cache);
        let before = (vp.start_doc(), vp.start_line());
        vp.jump_to_doc(&mut cache, 6).unwrap();
        assert_eq!((vp.start_doc(), vp.start_line()), before);
        assert_eq!(vp.cursor_line(), 6);
        assert_eq!(vp.cursor_doc(), 6);
    }

    #[test]
    fn test_jump_to_doc_forward_lands_near_quarter_mark() {
        let mut cache = oneline_cache(60);
        let mut vp = viewport(&mut cache);
        vp.jump_to_doc(&mut cache, 40).unwrap();
        assert_eq!(vp.cursor_doc(), 40);
        // placed near the one-quarter mark of a 10-row screen
        assert_eq!(vp.cursor_line(), 2);
        assert_eq!(vp.start_doc(), 38);
        assert_invariants(&vp, &cache);
    }

    #[test]
    fn test_jump_to_doc_backward() {
        let mut cache = oneline_cache(60);
        let mut vp = viewport(&mut cache);
        vp.jump_down(&mut cache).unwrap();
        vp.jump_to_doc(&mut cache, 5).unwrap();
        assert_eq!(vp.cursor_doc(), 5);
        assert_invariants(&vp, &cache);
    }

    #[test]
    fn test_jump_to_doc_near_top_clamps() {
        let mut cache = oneline_cache(60);
        let mut vp = viewport(&mut cache);
        vp.jump_down(&mut cache).unwrap();
        vp.jump_to_doc(&mut cache, 0).unwrap();
        assert_eq!(vp.cursor_doc(), 0);
        assert_eq!(vp.start_doc(), 0);
        assert_invariants(&vp, &cache);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            MoveLeft,
            MoveRight,
            JumpLeft,
            JumpRight,
            CursorTop,
            CursorMiddle,
            CursorBottom,
            MoveCursorUp,
            MoveCursorDown,
            MoveUp,
            MoveDown,
            MoveNextDoc,
            MovePrevDoc,
            PageUp,
            PageDown,
            JumpUp,
            JumpDown,
            SetMode(u8),
            ToggleFlavor,
            JumpToDoc(usize),
        }

        fn op_strategy() -> impl Strategy<Value = Op> {
            prop_oneof![
                Just(Op::MoveLeft),
                Just(Op::MoveRight),
                Just(Op::JumpLeft),
                Just(Op::JumpRight),
                Just(Op::CursorTop),
                Just(Op::CursorMiddle),
                Just(Op::CursorBottom),
                Just(Op::MoveCursorUp),
                Just(Op::MoveCursorDown),
                Just(Op::MoveUp),
                Just(Op::MoveDown),
                Just(Op::MoveNextDoc),
                Just(Op::MovePrevDoc),
                Just(Op::PageUp),
                Just(Op::PageDown),
                Just(Op::JumpUp),
                Just(Op::JumpDown),
                (0u8..4).prop_map(Op::SetMode),
                Just(Op::ToggleFlavor),
                (0usize..25).prop_map(Op::JumpToDoc),
            ]
        }

        fn apply(vp: &mut Viewport, cache: &mut DocumentCache, op: &Op) {
            match op {
                Op::MoveLeft => vp.move_left(cache),
                Op::MoveRight => vp.move_right(cache),
                Op::JumpLeft => vp.jump_left(cache),
                Op::JumpRight => vp.jump_right(cache),
                Op::CursorTop => vp.cursor_top(cache),
                Op::CursorMiddle => vp.cursor_middle(cache),
                Op::CursorBottom => vp.cursor_bottom(cache),
                Op::MoveCursorUp => vp.move_cursor_up(cache),
                Op::MoveCursorDown => vp.move_cursor_down(cache),
                Op::MoveUp => vp.move_up(cache),
                Op::MoveDown => vp.move_down(cache),
                Op::MoveNextDoc => vp.move_next_doc(cache),
                Op::MovePrevDoc => vp.move_prev_doc(cache),
                Op::PageUp => vp.page_up(cache),
                Op::PageDown => vp.page_down(cache),
                Op::JumpUp => vp.jump_up(cache),
                Op::JumpDown => vp.jump_down(cache),
                Op::SetMode(m) => {
                    let mode = match m % 4 {
                        0 => RenderMode::JsonOneline,
                        1 => RenderMode::JsonPretty,
                        2 => RenderMode::ToString,
                        _ => RenderMode::TextLogs,
                    };
                    vp.set_render_mode(cache, mode)
                }
                Op::ToggleFlavor => vp.toggle_extended_json(cache),
                Op::JumpToDoc(d) => {
                    let target = d % cache.num_docs();
                    vp.jump_to_doc(cache, target)
                }
            }
            .unwrap();
        }

        proptest! {
            #[test]
            fn invariants_hold_under_any_op_sequence(
                n_docs in 1..25i32,
                lines in 2..20u16,
                ops in proptest::collection::vec(op_strategy(), 0..40),
            ) {
                let mut cache = oneline_cache(n_docs);
                let mut vp = Viewport::new(40, lines);
                vp.compute_visible(&mut cache).unwrap();

                for op in &ops {
                    apply(&mut vp, &mut cache, op);
                    prop_assert!(!vp.rows().is_empty());
                    prop_assert!(vp.start_line() < vp.doc_lines()[0]);
                    prop_assert!(vp.cursor_line() <= vp.last_displayed_line());
                    prop_assert!(vp.last_displayed_line() < vp.main_lines());
                    prop_assert_eq!(vp.doc_for_row(vp.cursor_line()), Some(vp.cursor_doc()));
                    prop_assert!(vp.start_col() <= vp.longest_line_start_col());
                    prop_assert!(vp.start_doc() < cache.num_docs());
                }
            }

            #[test]
            fn mark_toggle_twice_is_identity(
                marks in proptest::collection::btree_set(0usize..30, 0..10),
                doc in 0usize..30,
            ) {
                let mut cache = oneline_cache(30);
                let mut vp = viewport(&mut cache);
                for &m in &marks {
                    vp.mark_doc(m);
                }
                let before = vp.is_marked(doc);
                vp.toggle_mark(doc);
                vp.toggle_mark(doc);
                prop_assert_eq!(vp.is_marked(doc), before);
            }
        }
    }
}
