pub mod editing;
pub mod io;
pub mod lint;
pub mod projection;

// Re-export key types for easier usage
pub use editing::{
    Annotation, AnnotationId, AnnotationSet, Cmd, CorrectionMenu, Document, MenuState, Patch,
};
pub use lint::{
    DEFAULT_LINT_DELAY, Diagnostic, GrammarOverlay, LintError, LintRequest, LintScheduler, Linter,
    RuleLinter,
};
pub use projection::{Projection, build_projection};
