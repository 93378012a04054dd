use std::ops::Range;

use crate::lint::Diagnostic;
use crate::projection::Projection;

/// Translate a batch of analyzer findings from projection offsets into
/// buffer offsets, against the projection the analyzed text came from.
///
/// Diagnostics whose span cannot be resolved are dropped; a wrong highlight
/// is worse than a missing one. Overlapping results are all kept.
pub fn translate_diagnostics(
    projection: &Projection,
    diagnostics: Vec<Diagnostic>,
) -> Vec<(Range<usize>, Diagnostic)> {
    diagnostics
        .into_iter()
        .filter_map(|diagnostic| {
            let resolved = resolve_span(projection, &diagnostic.span)?;
            Some((resolved, diagnostic))
        })
        .collect()
}

/// Resolve one projection span to a buffer range.
///
/// The map is per byte, so the buffer range is the mapped start through one
/// past the mapped last byte. Empty and out-of-bounds spans resolve to
/// `None`, as do spans that collapse under mapping.
fn resolve_span(projection: &Projection, span: &Range<usize>) -> Option<Range<usize>> {
    if span.start >= span.end || span.end > projection.offset_map.len() {
        return None;
    }

    let from = projection.offset_map[span.start];
    let to = projection.offset_map[span.end - 1] + 1;
    if from >= to {
        return None;
    }

    Some(from..to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::Document;
    use crate::projection::build_projection;

    fn diagnostic(span: Range<usize>) -> Diagnostic {
        Diagnostic {
            span,
            message: "finding".to_string(),
            replacements: vec![],
        }
    }

    fn projection_of(markdown: &str) -> Projection {
        let doc = Document::from_bytes(markdown.as_bytes()).unwrap();
        build_projection(&doc)
    }

    #[test]
    fn test_identity_for_plain_paragraph() {
        let projection = projection_of("Teh cat sat.");
        let translated = translate_diagnostics(&projection, vec![diagnostic(0..3)]);

        assert_eq!(translated.len(), 1);
        assert_eq!(translated[0].0, 0..3);
    }

    #[test]
    fn test_span_behind_stripped_heading_marker() {
        // Projection "Hello\nworld text" over "# Hello\n\nworld text"
        let projection = projection_of("# Hello\n\nworld text");

        let translated = translate_diagnostics(&projection, vec![diagnostic(0..5)]);
        assert_eq!(translated[0].0, 2..7);

        let translated = translate_diagnostics(&projection, vec![diagnostic(6..11)]);
        assert_eq!(translated[0].0, 9..14);
    }

    #[test]
    fn test_span_in_list_item() {
        // Projection "First\nSecond" over "- First\n- Second"
        let projection = projection_of("- First\n- Second");
        let translated = translate_diagnostics(&projection, vec![diagnostic(6..12)]);

        assert_eq!(translated[0].0, 10..16);
    }

    #[test]
    fn test_empty_span_is_dropped() {
        let projection = projection_of("Teh cat sat.");
        assert!(translate_diagnostics(&projection, vec![diagnostic(3..3)]).is_empty());
    }

    #[test]
    fn test_out_of_bounds_span_is_dropped() {
        let projection = projection_of("short");
        assert!(translate_diagnostics(&projection, vec![diagnostic(2..99)]).is_empty());
    }

    #[test]
    fn test_unresolvable_spans_do_not_poison_the_batch() {
        let projection = projection_of("Teh cat sat.");
        let translated = translate_diagnostics(
            &projection,
            vec![diagnostic(50..60), diagnostic(0..3), diagnostic(9..9)],
        );

        assert_eq!(translated.len(), 1);
        assert_eq!(translated[0].0, 0..3);
    }

    #[test]
    fn test_translated_text_matches_analyzed_text() {
        let markdown = "# Title\n\n- Teh item\n\n> quoted recieve";
        let projection = projection_of(markdown);

        // Spans within a single block line map back to identical source text
        for span in [2..5, 8..11, 15..21] {
            let analyzed = projection.text[span.clone()].to_string();
            let translated = translate_diagnostics(&projection, vec![diagnostic(span)]);
            let (range, _) = &translated[0];
            assert_eq!(&markdown[range.clone()], analyzed);
        }
    }
}
