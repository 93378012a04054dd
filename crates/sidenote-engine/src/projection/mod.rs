//! # Plain-Text Projection
//!
//! Grammar analysis runs over rendered prose, not over Markdown source. This
//! module flattens the document into the text a reader would see — block
//! markers and prefixes stripped, one newline between blocks — together with
//! a byte-for-byte map back into the source buffer.
//!
//! The map is what makes diagnostic translation exact: `offset_map[i]` is the
//! buffer offset of projection byte `i`, so an analyzer span `[start, end)`
//! resolves to `offset_map[start] .. offset_map[end - 1] + 1` with no
//! character-width bookkeeping. Synthetic separator newlines are mapped to
//! the offset just past the previous emitted byte, which keeps the map
//! monotonically non-decreasing.
//!
//! The projection is rebuilt wholesale on each analysis cycle; nothing here
//! is patched incrementally.

use std::ops::Range;

use crate::editing::Document;

/// Flattened plain-text view of the document with positional back-mapping
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    /// The rendered plain text
    pub text: String,
    /// For each byte of `text`, the corresponding byte offset in the buffer.
    /// Always the same length as `text`; non-decreasing.
    pub offset_map: Vec<usize>,
}

impl Projection {
    /// True when there is nothing worth analyzing
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Build the plain-text projection of the current document state.
///
/// Every text-bearing block contributes its content-line bytes in document
/// order; line and block boundaries contribute exactly one `\n` each. Blocks
/// are joined, so the projection never carries a trailing newline. No
/// whitespace is normalized and inline Markdown markup is left intact — this
/// is a positional view, not a serializer.
pub fn build_projection(doc: &Document) -> Projection {
    let source = doc.text();
    let mut blocks: Vec<Vec<Range<usize>>> = Vec::new();

    if let Some(tree) = doc.tree() {
        collect_block_lines(&source, tree.root_node(), &mut blocks);
    }

    let mut text = String::new();
    let mut offset_map = Vec::new();
    let mut prev_end = 0;
    let mut first_block = true;

    for lines in &blocks {
        // A block with no content contributes nothing, not even a separator
        if lines.iter().all(|line| line.is_empty()) {
            continue;
        }

        if !first_block {
            push_separator(&mut text, &mut offset_map, prev_end);
        }

        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                push_separator(&mut text, &mut offset_map, prev_end);
            }
            text.push_str(&source[line.clone()]);
            offset_map.extend(line.clone());
            if !line.is_empty() {
                prev_end = line.end;
            }
        }

        first_block = false;
    }

    debug_assert_eq!(text.len(), offset_map.len());

    Projection { text, offset_map }
}

/// One separator newline, mapped to the position just past the previous
/// emitted byte (i.e. immediately preceding the next block's start)
fn push_separator(text: &mut String, offset_map: &mut Vec<usize>, prev_end: usize) {
    text.push('\n');
    offset_map.push(prev_end);
}

/// Walk the CST and collect, per block, the content-line ranges to emit
fn collect_block_lines(source: &str, node: tree_sitter::Node, out: &mut Vec<Vec<Range<usize>>>) {
    match node.kind() {
        "document" | "section" | "list" => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                collect_block_lines(source, child, out);
            }
        }
        "atx_heading" => {
            out.push(vec![heading_content_range(source, node.byte_range())]);
        }
        "paragraph" => {
            // Paragraphs inside list items are covered by the item itself
            if node.parent().map(|p| p.kind()) == Some("list_item") {
                return;
            }
            let content = trim_trailing_newline(source, node.byte_range());
            out.push(lines_in_range(source, content));
        }
        "list_item" => {
            out.push(list_item_lines(source, node));

            // Nested lists and non-paragraph blocks are blocks of their own
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                if matches!(
                    child.kind(),
                    "list" | "fenced_code_block" | "indented_code_block" | "block_quote"
                ) {
                    collect_block_lines(source, child, out);
                }
            }
        }
        "block_quote" => {
            out.push(quote_lines(source, node.byte_range()));
        }
        "fenced_code_block" => {
            let content = fenced_code_content_range(source, node.byte_range());
            out.push(lines_in_range(source, content));
        }
        "indented_code_block" => {
            let content = trim_trailing_newline(source, node.byte_range());
            out.push(lines_in_range(source, content));
        }
        "thematic_break" => {}
        _ => {
            // Unhandled block kinds (tables, html blocks, ...) project verbatim
            let range = node.byte_range();
            if !range.is_empty() {
                out.push(lines_in_range(source, trim_trailing_newline(source, range)));
            }
        }
    }
}

/// Shrink a block range so it doesn't include its trailing newline
fn trim_trailing_newline(source: &str, range: Range<usize>) -> Range<usize> {
    let text = &source[range.clone()];
    let mut end = range.end;
    if text.ends_with('\n') {
        end -= 1;
        if source[..end].ends_with('\r') {
            end -= 1;
        }
    }
    range.start..end.max(range.start)
}

/// Split a content range into per-line ranges, excluding the newline bytes
fn lines_in_range(source: &str, range: Range<usize>) -> Vec<Range<usize>> {
    let text = &source[range.clone()];
    if text.is_empty() {
        return vec![range];
    }

    let mut lines = Vec::new();
    let mut pos = range.start;
    for line in text.split_inclusive('\n') {
        let end = pos + line.len();
        let content_end = if line.ends_with('\n') { end - 1 } else { end };
        lines.push(pos..content_end);
        pos = end;
    }
    lines
}

/// Content of an ATX heading: after the `#` run and one space, before the newline
fn heading_content_range(source: &str, range: Range<usize>) -> Range<usize> {
    let text = &source[range.clone()];
    let hashes = text.bytes().take_while(|&b| b == b'#').count();

    let mut start = range.start + hashes;
    if text.as_bytes().get(hashes) == Some(&b' ') {
        start += 1;
    }

    let mut end = range.end;
    if text.ends_with('\n') {
        end -= 1;
        if source[..end].ends_with('\r') {
            end -= 1;
        }
    }

    start..end.max(start)
}

/// Content lines of a list item: every line of its paragraphs, with the
/// item marker stripped from the first line and leading indentation stripped
/// from the rest. Nested lists and other block children are collected
/// separately by the caller.
fn list_item_lines(source: &str, node: tree_sitter::Node) -> Vec<Range<usize>> {
    let content_start = list_item_content_start(source, node.byte_range());
    let mut lines = Vec::new();

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() != "paragraph" {
            continue;
        }
        let content = trim_trailing_newline(source, child.byte_range());
        for (i, line) in lines_in_range(source, content).into_iter().enumerate() {
            if lines.is_empty() && i == 0 {
                lines.push(line.start.max(content_start)..line.end);
            } else {
                lines.push(strip_indent(source, line));
            }
        }
    }

    lines
}

/// Where a list item's own text begins: after indentation, marker and any
/// task box
fn list_item_content_start(source: &str, range: Range<usize>) -> usize {
    let text = &source[range.clone()];
    let trimmed = text.trim_start();
    let indent_len = text.len() - trimmed.len();

    let mut marker_len = 0;
    if trimmed.starts_with("- ") || trimmed.starts_with("* ") || trimmed.starts_with("+ ") {
        marker_len = 2;
    } else if trimmed.starts_with(|c: char| c.is_ascii_digit())
        && let Some(dot_pos) = trimmed.find(". ")
    {
        marker_len = dot_pos + 2;
    }

    // Task list items carry a checkbox after the marker
    let rest = &trimmed[marker_len..];
    if rest.starts_with("[ ] ") || rest.starts_with("[x] ") || rest.starts_with("[X] ") {
        marker_len += 4;
    }

    range.start + indent_len + marker_len
}

/// Shrink a line range past its leading spaces and tabs
fn strip_indent(source: &str, line: Range<usize>) -> Range<usize> {
    let text = &source[line.clone()];
    let trimmed = text.trim_start_matches([' ', '\t']);
    (line.end - trimmed.len())..line.end
}

/// Per-line content of a blockquote, with the `>` prefixes stripped
fn quote_lines(source: &str, range: Range<usize>) -> Vec<Range<usize>> {
    let content = trim_trailing_newline(source, range);
    lines_in_range(source, content)
        .into_iter()
        .map(|full| {
            let prefix = blockquote_prefix_len(&source[full.clone()]);
            (full.start + prefix)..full.end
        })
        .collect()
}

/// Length of a blockquote line prefix: indentation, then `>` markers each
/// followed by an optional space
fn blockquote_prefix_len(line: &str) -> usize {
    let bytes = line.as_bytes();
    let mut pos = 0;

    while pos < bytes.len() && (bytes[pos] == b' ' || bytes[pos] == b'\t') {
        pos += 1;
    }
    while pos < bytes.len() && bytes[pos] == b'>' {
        pos += 1;
        if bytes.get(pos) == Some(&b' ') {
            pos += 1;
        }
    }

    pos
}

/// Code between the fences of a fenced code block
fn fenced_code_content_range(source: &str, range: Range<usize>) -> Range<usize> {
    let trimmed = trim_trailing_newline(source, range);
    let text = &source[trimmed.clone()];

    let content_start = match text.find('\n') {
        Some(first_newline) => trimmed.start + first_newline + 1,
        None => trimmed.start,
    };

    let content_end = match text.rfind('\n') {
        Some(last_newline) => {
            let closing = text[last_newline + 1..].trim_start();
            if closing.starts_with("```") || closing.starts_with("~~~") {
                trimmed.start + last_newline
            } else {
                trimmed.end
            }
        }
        None => trimmed.end,
    };

    content_start..content_end.max(content_start)
}
