use std::time::Instant;

use crate::editing::Document;
use crate::lint::scheduler::LintScheduler;
use crate::lint::translate::translate_diagnostics;
use crate::lint::{Diagnostic, LintError, Linter};
use crate::projection::{Projection, build_projection};

/// A request to run the analyzer over a snapshot of the projected text.
///
/// `generation` must be handed back to [`GrammarOverlay::complete`] with the
/// result so stale completions can be told apart from fresh ones.
#[derive(Debug, Clone, PartialEq)]
pub struct LintRequest {
    pub generation: u64,
    pub text: String,
}

/// Orchestrates the analysis cycle over one document: debounce, project,
/// analyze, translate, publish.
///
/// The overlay is driven by the host loop. [`note_edit`](Self::note_edit) is
/// called after every applied command, [`poll`](Self::poll) on every loop
/// tick; when `poll` yields a [`LintRequest`] the host runs its [`Linter`]
/// and hands the result to [`complete`](Self::complete). Hosts with a
/// synchronous analyzer can collapse the cycle into
/// [`run_cycle`](Self::run_cycle).
#[derive(Debug)]
pub struct GrammarOverlay {
    scheduler: LintScheduler,
    /// Projection snapshot for the in-flight run, kept for span translation
    pending: Option<(u64, Projection)>,
}

impl GrammarOverlay {
    pub fn new(scheduler: LintScheduler) -> Self {
        Self {
            scheduler,
            pending: None,
        }
    }

    pub fn note_edit(&mut self, now: Instant) {
        self.scheduler.note_edit(now);
    }

    /// Drive the debounce clock.
    ///
    /// When the pause has lasted long enough this builds the projection and
    /// returns the analysis request for it. A blank document short-circuits:
    /// annotations are cleared and the analyzer is never invoked.
    pub fn poll(&mut self, doc: &mut Document, now: Instant) -> Option<LintRequest> {
        let generation = self.scheduler.poll(now)?;
        let projection = build_projection(doc);

        if projection.is_blank() {
            doc.annotations_mut().clear();
            self.scheduler.complete(generation);
            return None;
        }

        let request = LintRequest {
            generation,
            text: projection.text.clone(),
        };
        self.pending = Some((generation, projection));
        Some(request)
    }

    /// Accept an analysis result.
    ///
    /// A fresh result is translated against the projection the run was built
    /// from and replaces the document's annotation set wholesale; the return
    /// value says whether that happened. A stale result is dropped and the
    /// already rescheduled follow-up run will cover the newer edits. An
    /// analyzer error clears the annotations for this cycle only.
    pub fn complete(
        &mut self,
        doc: &mut Document,
        generation: u64,
        result: Result<Vec<Diagnostic>, LintError>,
    ) -> bool {
        let fresh = self.scheduler.complete(generation);
        let pending = self.pending.take();

        if !fresh {
            log::debug!("discarding stale analysis result for generation {generation}");
            return false;
        }

        let batch = match result {
            Ok(diagnostics) => {
                let Some((pending_generation, projection)) = pending else {
                    return false;
                };
                debug_assert_eq!(pending_generation, generation);
                translate_diagnostics(&projection, diagnostics)
            }
            Err(e) => {
                log::warn!("grammar analysis failed: {e}");
                Vec::new()
            }
        };

        doc.annotations_mut().replace_all(batch);
        true
    }

    /// Poll and, if a run is due, analyze and publish in one step
    pub fn run_cycle(&mut self, doc: &mut Document, linter: &mut dyn Linter, now: Instant) -> bool {
        let Some(request) = self.poll(doc, now) else {
            return false;
        };
        let result = linter.lint(&request.text);
        self.complete(doc, request.generation, result)
    }

    /// When the host loop should wake up next, if a run is scheduled
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle() && self.pending.is_none()
    }
}

impl Default for GrammarOverlay {
    fn default() -> Self {
        Self::new(LintScheduler::default())
    }
}
