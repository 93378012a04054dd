use tree_sitter::{InputEdit, Parser, Point, Tree};
use tree_sitter_md::LANGUAGE;
use xi_rope::{Delta, Rope, RopeInfo};

use crate::editing::{AnnotationSet, Cmd, Patch, commands};

/// The editable Markdown document.
///
/// The entire source lives in one `xi_rope::Rope` buffer, which is the single
/// source of truth: `text()` returns the exact bytes that were loaded plus
/// whatever edits were applied, with no regeneration from a model. Structure
/// comes from an incrementally maintained Tree-sitter Markdown parse.
///
/// Grammar annotations live in an [`AnnotationSet`] owned by the document so
/// that every edit can re-anchor them through the edit's delta before anything
/// else observes the new state.
pub struct Document {
    /// Rope buffer holding the document as UTF-8 bytes
    pub(crate) buffer: Rope,
    /// Current selection/cursor as byte offsets into the buffer
    pub(crate) selection: std::ops::Range<usize>,
    /// Counter incremented on each edit, used for change detection
    pub(crate) version: u64,
    /// Tree-sitter parser for incremental Markdown parsing
    parser: Parser,
    /// Current parse tree (updated incrementally on edit)
    tree: Option<Tree>,
    /// Live grammar annotations, re-anchored through every edit
    annotations: AnnotationSet,
}

impl Document {
    /// Create a new document from raw bytes, which must be valid UTF-8.
    pub fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        let text = std::str::from_utf8(bytes)?;
        let buffer = Rope::from(text);
        let len = buffer.len();

        let mut parser = Parser::new();
        parser.set_language(&LANGUAGE.into())?;
        let tree = parser.parse(buffer.to_string(), None);

        Ok(Self {
            buffer,
            selection: len..len,
            version: 0,
            parser,
            tree,
            annotations: AnnotationSet::default(),
        })
    }

    /// Get the document's content as raw bytes (exact round-trip)
    pub fn to_bytes(&self) -> Vec<u8> {
        self.buffer.to_string().into_bytes()
    }

    /// Get the current text content
    pub fn text(&self) -> String {
        self.buffer.to_string()
    }

    /// Apply a command to the document.
    ///
    /// The edit pipeline: compile the command to a delta, feed the delta to
    /// the old parse tree via `tree.edit()` (this must happen *before* the
    /// buffer changes, since the edit coordinates are in the old document),
    /// apply the delta to the buffer, re-parse incrementally, transform the
    /// annotation ranges and the selection through the delta, and bump the
    /// version counter.
    pub fn apply(&mut self, cmd: Cmd) -> Patch {
        let delta = commands::compile_command(self, &cmd);

        // Inserted ranges in new-document coordinates, for the patch
        let mut changed = Vec::new();
        let mut cursor = 0;
        for op in delta.els.iter() {
            match op {
                xi_rope::delta::DeltaElement::Copy(_from, to) => {
                    cursor = *to;
                }
                xi_rope::delta::DeltaElement::Insert(inserted) => {
                    changed.push(cursor..cursor + inserted.len());
                    cursor += inserted.len();
                }
            }
        }

        if let Some(mut old_tree) = self.tree.take() {
            // Coordinate calculation needs the old buffer, so compute the
            // InputEdits before applying the delta.
            for edit in self.delta_to_input_edits(&delta) {
                old_tree.edit(&edit);
            }
            self.buffer = delta.apply(&self.buffer);
            self.tree = self.parser.parse(self.buffer.to_string(), Some(&old_tree));
        } else {
            self.buffer = delta.apply(&self.buffer);
            self.tree = self.parser.parse(self.buffer.to_string(), None);
        }

        // Re-anchor annotations; ranges that collapse or fall outside the new
        // buffer are dropped rather than left stale.
        self.annotations.transform(&delta, self.buffer.len());

        let new_selection = commands::transform_selection_for_command(&self.selection, &cmd);
        self.selection = new_selection.clone();

        self.version += 1;

        Patch {
            changed,
            new_selection,
            version: self.version,
        }
    }

    /// Get the current selection range
    pub fn selection(&self) -> std::ops::Range<usize> {
        self.selection.clone()
    }

    /// Set the selection range
    pub fn set_selection(&mut self, selection: std::ops::Range<usize>) {
        self.selection = selection;
    }

    /// Get the current version
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Get the buffer length in bytes
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// The live annotation overlay
    pub fn annotations(&self) -> &AnnotationSet {
        &self.annotations
    }

    pub fn annotations_mut(&mut self) -> &mut AnnotationSet {
        &mut self.annotations
    }

    /// Reference to the current parse tree
    pub fn tree(&self) -> Option<&Tree> {
        self.tree.as_ref()
    }

    /// Convert a delta into tree-sitter InputEdits against the *old* buffer.
    ///
    /// A delta is a sequence of Copy(from, to) and Insert(text) operations;
    /// gaps between copies are deletions. InputEdit coordinates are old-buffer
    /// byte offsets and (row, column) points.
    fn delta_to_input_edits(&self, delta: &Delta<RopeInfo>) -> Vec<InputEdit> {
        let old_text = self.buffer.to_string();
        let mut edits = Vec::new();
        let mut old_pos = 0;

        for op in &delta.els {
            match op {
                xi_rope::delta::DeltaElement::Copy(from, to) => {
                    if old_pos < *from {
                        // Gap before this copy: a deletion
                        edits.push(make_input_edit(&old_text, old_pos, *from, ""));
                    }
                    old_pos = *to;
                }
                xi_rope::delta::DeltaElement::Insert(node) => {
                    let inserted = node.to_string();
                    edits.push(make_input_edit(&old_text, old_pos, old_pos, &inserted));
                }
            }
        }

        // Anything left uncopied at the end was deleted
        if old_pos < delta.base_len {
            edits.push(make_input_edit(&old_text, old_pos, delta.base_len, ""));
        }

        edits
    }
}

/// Build an InputEdit replacing `start..old_end` (old-buffer bytes) with `inserted`
fn make_input_edit(old_text: &str, start: usize, old_end: usize, inserted: &str) -> InputEdit {
    let start_position = byte_to_point(old_text, start);
    InputEdit {
        start_byte: start,
        old_end_byte: old_end,
        new_end_byte: start + inserted.len(),
        start_position,
        old_end_position: byte_to_point(old_text, old_end),
        new_end_position: advance_point(start_position, inserted),
    }
}

/// Convert a byte offset to a (row, column) point in the given text
fn byte_to_point(text: &str, offset: usize) -> Point {
    let offset = offset.min(text.len());
    let mut row = 0;
    let mut line_start = 0;

    for (i, byte) in text.bytes().enumerate().take(offset) {
        if byte == b'\n' {
            row += 1;
            line_start = i + 1;
        }
    }

    Point {
        row,
        column: offset - line_start,
    }
}

/// Point reached after inserting `text` at `start`
fn advance_point(start: Point, text: &str) -> Point {
    match text.rfind('\n') {
        Some(last_newline) => Point {
            row: start.row + text.bytes().filter(|&b| b == b'\n').count(),
            column: text.len() - last_newline - 1,
        },
        None => Point {
            row: start.row,
            column: start.column + text.len(),
        },
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Parser and tree are derived state and not Debug; show what matters
        f.debug_struct("Document")
            .field("buffer", &self.buffer.to_string())
            .field("selection", &self.selection)
            .field("version", &self.version)
            .field("annotations", &self.annotations)
            .finish_non_exhaustive()
    }
}

impl Clone for Document {
    fn clone(&self) -> Self {
        // Parser doesn't implement Clone; re-parse for the cloned document
        let mut parser = Parser::new();
        let _ = parser.set_language(&LANGUAGE.into());
        let tree = parser.parse(self.buffer.to_string(), None);

        Self {
            buffer: self.buffer.clone(),
            selection: self.selection.clone(),
            version: self.version,
            parser,
            tree,
            annotations: self.annotations.clone(),
        }
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        // Parser and tree are derived from the buffer, so they don't participate
        self.buffer.to_string() == other.buffer.to_string()
            && self.selection == other.selection
            && self.version == other.version
            && self.annotations == other.annotations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_valid_utf8() {
        let text = "# Hello World\n\nThis is a test document.";
        let doc = Document::from_bytes(text.as_bytes()).unwrap();

        assert_eq!(doc.to_bytes(), text.as_bytes());
        assert_eq!(doc.version(), 0);
        assert_eq!(doc.selection(), text.len()..text.len());
    }

    #[test]
    fn test_from_bytes_invalid_utf8() {
        let invalid = vec![0xFF, 0xFE, 0xFD];
        assert!(Document::from_bytes(&invalid).is_err());
    }

    #[test]
    fn test_round_trip_preserves_content() {
        let original = "# Notes\n\n- Bullet 1\n- Bullet 2\n\n```rust\nfn main() {}\n```";
        let doc = Document::from_bytes(original.as_bytes()).unwrap();

        assert_eq!(doc.to_bytes(), original.as_bytes());
    }

    #[test]
    fn test_round_trip_unicode() {
        let text = "Hello 世界! 🦀\n\nRust is great!";
        let doc = Document::from_bytes(text.as_bytes()).unwrap();

        assert_eq!(doc.to_bytes(), text.as_bytes());
    }

    #[test]
    fn test_round_trip_windows_line_endings() {
        let text = "Line 1\r\nLine 2\r\nLine 3";
        let doc = Document::from_bytes(text.as_bytes()).unwrap();

        assert_eq!(doc.to_bytes(), text.as_bytes());
    }

    #[test]
    fn test_incremental_edits_keep_tree_valid() {
        let text = "# Header\n\n- Bullet 1\n- Bullet 2\n\nSome content after bullets.";
        let mut doc = Document::from_bytes(text.as_bytes()).unwrap();

        doc.apply(Cmd::InsertText {
            at: 20,
            text: "\n\nNew paragraph inserted here.\n\n".to_string(),
        });
        assert!(doc.tree().is_some());

        doc.apply(Cmd::DeleteRange { range: 10..25 });
        assert!(doc.tree().is_some());
        assert_eq!(doc.version(), 2);
        assert!(!doc.text().is_empty());
    }

    #[test]
    fn test_byte_to_point() {
        let text = "Line 1\nLine 2\nLine 3";

        assert_eq!(byte_to_point(text, 0), Point { row: 0, column: 0 });
        assert_eq!(byte_to_point(text, 6), Point { row: 0, column: 6 });
        assert_eq!(byte_to_point(text, 7), Point { row: 1, column: 0 });
        assert_eq!(byte_to_point(text, 13), Point { row: 1, column: 6 });
        assert_eq!(
            byte_to_point(text, text.len()),
            Point { row: 2, column: 6 }
        );
        // Beyond the end clamps to the end
        assert_eq!(
            byte_to_point(text, text.len() + 100),
            Point { row: 2, column: 6 }
        );
    }

    #[test]
    fn test_advance_point_single_line() {
        let start = Point { row: 3, column: 4 };
        assert_eq!(advance_point(start, "abc"), Point { row: 3, column: 7 });
        assert_eq!(advance_point(start, ""), start);
    }

    #[test]
    fn test_advance_point_multi_line() {
        let start = Point { row: 1, column: 5 };
        assert_eq!(
            advance_point(start, "\nNew line\nAnother"),
            Point { row: 3, column: 7 }
        );
    }

    #[test]
    fn test_input_edit_for_insertion() {
        let doc = Document::from_bytes(b"Hello World").unwrap();

        let mut builder = xi_rope::delta::Builder::new(doc.len());
        builder.replace(5..5, Rope::from(" there"));
        let delta = builder.build();

        let edits = doc.delta_to_input_edits(&delta);
        assert_eq!(edits.len(), 1);
        let edit = &edits[0];
        assert_eq!(edit.start_byte, 5);
        assert_eq!(edit.old_end_byte, 5);
        assert_eq!(edit.new_end_byte, 11);
        assert_eq!(edit.start_position, Point { row: 0, column: 5 });
        assert_eq!(edit.new_end_position, Point { row: 0, column: 11 });
    }

    #[test]
    fn test_input_edit_for_deletion() {
        let doc = Document::from_bytes(b"Hello World").unwrap();

        let mut builder = xi_rope::delta::Builder::new(doc.len());
        builder.delete(5..11);
        let delta = builder.build();

        let edits = doc.delta_to_input_edits(&delta);
        assert_eq!(edits.len(), 1);
        let edit = &edits[0];
        assert_eq!(edit.start_byte, 5);
        assert_eq!(edit.old_end_byte, 11);
        assert_eq!(edit.new_end_byte, 5);
        assert_eq!(edit.old_end_position, Point { row: 0, column: 11 });
        assert_eq!(edit.new_end_position, Point { row: 0, column: 5 });
    }

    #[test]
    fn test_debug_output_shows_buffer_state() {
        let doc = Document::from_bytes(b"# Title").unwrap();
        let rendered = format!("{doc:?}");

        assert!(rendered.contains("# Title"));
        assert!(rendered.contains("version"));
    }

    #[test]
    fn test_clone_preserves_state() {
        let mut doc = Document::from_bytes(b"# Title\n\nBody").unwrap();
        doc.apply(Cmd::InsertText {
            at: 0,
            text: "x".to_string(),
        });

        let cloned = doc.clone();
        assert_eq!(doc, cloned);
        assert!(cloned.tree().is_some());
    }
}
