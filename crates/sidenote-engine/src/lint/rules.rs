use std::sync::OnceLock;

use regex::Regex;

use crate::lint::{Diagnostic, LintError, Linter};

/// Common misspellings and their corrections, matched case-insensitively
const MISSPELLINGS: &[(&str, &str)] = &[
    ("teh", "the"),
    ("recieve", "receive"),
    ("definately", "definitely"),
    ("seperate", "separate"),
    ("occured", "occurred"),
    ("untill", "until"),
    ("wich", "which"),
];

/// A small built-in grammar analyzer: a misspelling table, repeated-word
/// detection and doubled-space detection.
///
/// It exists so the editor works with no external analyzer installed, and so
/// the pipeline can be exercised deterministically in tests. It is pure and
/// infallible; richer analyzers plug in through the same [`Linter`] trait.
#[derive(Debug, Default)]
pub struct RuleLinter;

impl RuleLinter {
    pub fn new() -> Self {
        Self
    }
}

impl Linter for RuleLinter {
    fn lint(&mut self, text: &str) -> Result<Vec<Diagnostic>, LintError> {
        let mut diagnostics = Vec::new();

        let words = words_with_offsets(text);

        for &(start, word) in &words {
            let lowered = word.to_lowercase();
            if let Some(&(_, correction)) = MISSPELLINGS.iter().find(|(m, _)| *m == lowered) {
                diagnostics.push(Diagnostic {
                    span: start..start + word.len(),
                    message: format!("`{word}` is a common misspelling"),
                    replacements: vec![match_case(word, correction)],
                });
            }
        }

        diagnostics.extend(repeated_words(text, &words));
        diagnostics.extend(doubled_spaces(text));

        diagnostics.sort_by_key(|d| (d.span.start, d.span.end));
        Ok(diagnostics)
    }
}

/// Words and their byte offsets. A word is a run of alphanumeric characters
/// or apostrophes.
fn words_with_offsets(text: &str) -> Vec<(usize, &str)> {
    let mut words = Vec::new();
    let mut start = None;

    for (i, c) in text.char_indices() {
        let is_word = c.is_alphanumeric() || c == '\'';
        match (start, is_word) {
            (None, true) => start = Some(i),
            (Some(s), false) => {
                words.push((s, &text[s..i]));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        words.push((s, &text[s..]));
    }

    words
}

/// The same word twice in a row, separated only by spaces on one line.
/// Newlines break the pairing so unrelated blocks never pair up.
fn repeated_words(text: &str, words: &[(usize, &str)]) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    for pair in words.windows(2) {
        let (first_start, first) = pair[0];
        let (second_start, second) = pair[1];

        if !first.chars().all(char::is_alphabetic) {
            continue;
        }
        if !first.eq_ignore_ascii_case(second) {
            continue;
        }

        let gap = &text[first_start + first.len()..second_start];
        if gap.is_empty() || !gap.bytes().all(|b| b == b' ') {
            continue;
        }

        diagnostics.push(Diagnostic {
            span: first_start..second_start + second.len(),
            message: format!("`{first}` is repeated"),
            replacements: vec![first.to_string()],
        });
    }

    diagnostics
}

/// Runs of two or more spaces between words. Indentation at the start of a
/// line is intentional and skipped.
fn doubled_spaces(text: &str) -> Vec<Diagnostic> {
    static RUN_OF_SPACES: OnceLock<Regex> = OnceLock::new();
    let run_of_spaces =
        RUN_OF_SPACES.get_or_init(|| Regex::new(" {2,}").expect("Invalid spaces regex"));

    run_of_spaces
        .find_iter(text)
        .filter(|m| m.start() != 0 && !text[..m.start()].ends_with('\n'))
        .filter(|m| {
            let after = &text[m.end()..];
            !after.is_empty() && !after.starts_with('\n')
        })
        .map(|m| Diagnostic {
            span: m.range(),
            message: "Multiple consecutive spaces".to_string(),
            replacements: vec![" ".to_string()],
        })
        .collect()
}

/// Shape a correction to the case of the word it replaces
fn match_case(word: &str, replacement: &str) -> String {
    let has_upper = word.chars().any(char::is_uppercase);
    let has_lower = word.chars().any(char::is_lowercase);

    if has_upper && !has_lower {
        replacement.to_uppercase()
    } else if word.chars().next().is_some_and(char::is_uppercase) {
        let mut chars = replacement.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    } else {
        replacement.to_string()
    }
}
