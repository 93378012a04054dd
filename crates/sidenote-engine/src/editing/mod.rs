/*!
 * # Editing Core
 *
 * The editing system keeps the whole document in a single `xi_rope::Rope`
 * buffer as the source of truth. All edits are expressed as **commands**
 * (`Cmd`) that compile to xi-rope **deltas** and apply atomically; saving
 * writes the rope bytes verbatim, so the Markdown source round-trips with no
 * formatting drift.
 *
 * Structure comes from **Tree-sitter Markdown** parsed incrementally over the
 * buffer: edits are fed to the old tree via `tree.edit()` before re-parsing,
 * so only changed regions are re-analyzed.
 *
 * On top of the buffer sits the **annotation overlay**: grammar findings
 * translated into byte ranges and held in an `AnnotationSet`. Annotation
 * ranges are transformed through every delta inside [`Document::apply`], so
 * stale analysis never desynchronizes markers from the text. The
 * [`CorrectionMenu`] is the host-agnostic state machine behind
 * click-to-replace: hit-test an annotation, present its replacements, apply
 * exactly one `Cmd::ReplaceRange` over the annotation's *current* range.
 *
 * ## Module structure
 *
 * - **`document`**: `Document` with rope buffer, incremental parse, version
 *   counter and the annotation set
 * - **`commands`**: `Cmd` enum, delta compilation, selection transformation
 * - **`annotations`**: `AnnotationSet` with atomic batch replacement,
 *   hit-testing and delta re-anchoring
 * - **`menu`**: correction surface state machine
 * - **`patch`**: edit result metadata (changed ranges, new selection, version)
 */

pub mod annotations;
pub mod commands;
pub mod document;
pub mod menu;
pub mod patch;

pub use annotations::{Annotation, AnnotationId, AnnotationSet};
pub use commands::Cmd;
pub use document::Document;
pub use menu::{CorrectionMenu, MenuState};
pub use patch::Patch;
