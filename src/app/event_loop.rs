use std::io::stdout;
use std::time::{Duration, Instant};

use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use ratatui::DefaultTerminal;

use crate::app::{update, App, AppError, Message, Model};
use crate::cache::{DocumentCache, LOAD_BATCH};
use crate::file::MappedFile;

/// Status repaints while bulk loading are throttled to this interval.
const STATUS_REDRAW_INTERVAL: Duration = Duration::from_millis(100);

/// Event poll timeout once the cache is complete and there is no idle work.
const IDLE_POLL: Duration = Duration::from_millis(250);

impl App {
    /// Map the input file, parse the first record, bring up the terminal,
    /// and run the event loop. The terminal is always restored before an
    /// error is surfaced so the shell stays usable.
    pub fn run(&mut self) -> Result<(), AppError> {
        let mapped = MappedFile::open(&self.file_path)?;
        let cache = DocumentCache::new(mapped)?;

        let mut terminal = ratatui::try_init().map_err(AppError::Terminal)?;
        let result = self.run_inner(&mut terminal, cache);
        let _ = execute!(stdout(), DisableMouseCapture);
        ratatui::restore();
        result
    }

    fn run_inner(
        &mut self,
        terminal: &mut DefaultTerminal,
        cache: DocumentCache,
    ) -> Result<(), AppError> {
        execute!(stdout(), EnableMouseCapture)?;
        let size = terminal.size()?;
        let mut model = Model::new(self.file_path.clone(), cache, (size.width, size.height))?;
        self.event_loop(terminal, &mut model)
    }

    fn event_loop(&self, terminal: &mut DefaultTerminal, model: &mut Model) -> Result<(), AppError> {
        let mut needs_render = true;
        let mut last_status_paint = Instant::now();

        loop {
            if needs_render {
                terminal.draw(|frame| crate::ui::render(model, frame))?;
                last_status_paint = Instant::now();
                needs_render = false;

                // Deferred work runs after the paint so the user sees the
                // status update (e.g. "Searching...") first.
                while let Some(msg) = model.deferred.pop_front() {
                    apply(model, msg)?;
                    needs_render = true;
                }
                if needs_render {
                    continue;
                }
            }

            if model.should_quit {
                return Ok(());
            }

            // While the cache is loading, poll without blocking so idle
            // turns keep advancing it.
            let timeout = if model.cache.is_complete() {
                IDLE_POLL
            } else {
                Duration::ZERO
            };

            if event::poll(timeout)? {
                if let Some(msg) = self.handle_event(event::read()?, model) {
                    apply(model, msg)?;
                    needs_render = true;
                }
                // Coalesce key-repeat bursts into a single render.
                while event::poll(Duration::ZERO)? {
                    if let Some(msg) = self.handle_event(event::read()?, model) {
                        apply(model, msg)?;
                        needs_render = true;
                    }
                }
            } else if !model.cache.is_complete() {
                model.cache.load_some(LOAD_BATCH)?;
                if model.cache.is_complete() {
                    tracing::debug!(docs = model.cache.num_docs(), "cache load complete");
                    if model.viewport.jump_to_end_after_load() {
                        model.viewport.jump_down(&mut model.cache)?;
                    }
                    model.viewport.compute_visible(&mut model.cache)?;
                    needs_render = true;
                } else if model.viewport.rows().len() < model.viewport.main_lines() {
                    // the screen is not yet full; new documents extend it
                    model.viewport.compute_visible(&mut model.cache)?;
                    needs_render = true;
                } else if last_status_paint.elapsed() >= STATUS_REDRAW_INTERVAL {
                    needs_render = true;
                }
            }
        }
    }
}

fn apply(model: &mut Model, msg: Message) -> Result<(), AppError> {
    *model = update(std::mem::take(model), msg)?;
    Ok(())
}
