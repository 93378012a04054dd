use xi_rope::delta::Builder;
use xi_rope::{Delta, Rope, RopeInfo};

use crate::editing::Document;

/// Commands that can be applied to the document
#[derive(Debug, Clone, PartialEq)]
pub enum Cmd {
    InsertText {
        at: usize,
        text: String,
    },
    DeleteRange {
        range: std::ops::Range<usize>,
    },
    ReplaceRange {
        range: std::ops::Range<usize>,
        text: String,
    },
}

/// Compile a command into a delta
pub(crate) fn compile_command(doc: &Document, cmd: &Cmd) -> Delta<RopeInfo> {
    let mut builder = Builder::new(doc.len());
    match cmd {
        Cmd::InsertText { at, text } => {
            builder.replace(*at..*at, Rope::from(text));
        }
        Cmd::DeleteRange { range } => {
            builder.delete(range.clone());
        }
        Cmd::ReplaceRange { range, text } => {
            builder.replace(range.clone(), Rope::from(text));
        }
    }
    builder.build()
}

/// Transform a selection range through a command
pub(crate) fn transform_selection_for_command(
    range: &std::ops::Range<usize>,
    cmd: &Cmd,
) -> std::ops::Range<usize> {
    match cmd {
        Cmd::InsertText { at, text } => {
            let text_len = text.len();
            if *at <= range.start {
                // Insertion before or at selection start shifts it right
                (range.start + text_len)..(range.end + text_len)
            } else if *at < range.end {
                // Insertion within the selection grows the end
                range.start..(range.end + text_len)
            } else {
                range.clone()
            }
        }
        Cmd::DeleteRange { range: del_range } => {
            let del_len = del_range.len();
            if del_range.end <= range.start {
                (range.start - del_len)..(range.end - del_len)
            } else if del_range.start >= range.end {
                range.clone()
            } else {
                // Deletion overlaps the selection: collapse to the deletion point
                del_range.start..del_range.start
            }
        }
        Cmd::ReplaceRange {
            range: replace_range,
            text,
        } => {
            if replace_range.end <= range.start {
                // Replacement before the selection shifts it by the net change
                let grow = text.len();
                let shrink = replace_range.len();
                let new_start = (range.start + grow).saturating_sub(shrink);
                let new_end = (range.end + grow).saturating_sub(shrink);
                new_start..new_end
            } else if replace_range.start >= range.end {
                range.clone()
            } else {
                // Replacement overlaps the selection: collapse after the new text
                let caret = replace_range.start + text.len();
                caret..caret
            }
        }
    }
}
