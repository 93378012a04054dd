//! # Grammar Analysis
//!
//! The analysis pipeline around the projection: a debounced scheduler with
//! generation tokens, the overlay that orchestrates one analysis cycle, the
//! translator that maps analyzer spans back into buffer offsets, and a small
//! built-in rule analyzer.
//!
//! The model is single-threaded and cooperative. The host owns the loop: it
//! reports edits, polls the scheduler, runs the analyzer when asked, and
//! hands the result back. There is no true cancellation — a result from a
//! superseded generation is simply discarded on arrival.

pub mod overlay;
pub mod rules;
pub mod scheduler;
pub mod translate;

pub use overlay::{GrammarOverlay, LintRequest};
pub use rules::RuleLinter;
pub use scheduler::{DEFAULT_LINT_DELAY, LintScheduler};
pub use translate::translate_diagnostics;

use serde::{Deserialize, Serialize};

/// One analyzer finding, with its span in *projection* byte offsets.
///
/// Spans stay in projection coordinates until [`translate_diagnostics`] turns
/// a whole batch into buffer-anchored annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Byte range in the analyzed text, end-exclusive
    pub span: std::ops::Range<usize>,
    /// Human-readable description of the problem
    pub message: String,
    /// Suggested replacements in analyzer preference order; may be empty
    pub replacements: Vec<String>,
}

/// Errors from a grammar analyzer
#[derive(Debug, thiserror::Error)]
pub enum LintError {
    /// The analyzer could not be set up at all; the pipeline degrades to
    /// zero diagnostics without retrying every cycle
    #[error("grammar analyzer unavailable: {0}")]
    Unavailable(String),
    /// A single analysis run failed; the next cycle tries again
    #[error("grammar analysis failed: {0}")]
    Failed(String),
}

/// A grammar analyzer over plain text
pub trait Linter {
    fn lint(&mut self, text: &str) -> Result<Vec<Diagnostic>, LintError>;
}
