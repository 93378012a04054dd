use xi_rope::delta::Transformer;
use xi_rope::{Delta, RopeInfo};

use crate::lint::Diagnostic;

/// Identifier for an annotation, unique within one `AnnotationSet`
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct AnnotationId(pub u64);

/// A grammar finding anchored to a live byte range in the document.
///
/// The range is kept current by [`AnnotationSet::transform`], which runs on
/// every edit; after construction nobody does offset arithmetic on it by hand.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub id: AnnotationId,
    /// Current byte range in the buffer, end-exclusive
    pub range: std::ops::Range<usize>,
    /// The finding this annotation renders
    pub diagnostic: Diagnostic,
}

/// The set of live annotations over one document.
///
/// The set is only ever replaced wholesale ([`replace_all`](Self::replace_all),
/// when a fresh analysis completes) or shrunk (an annotation's replacement was
/// applied, or an edit invalidated its range). Individual annotations are
/// never patched in place.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AnnotationSet {
    items: Vec<Annotation>,
    next_id: u64,
}

impl AnnotationSet {
    /// Atomically swap the entire annotation set for a freshly translated batch
    pub fn replace_all(&mut self, batch: Vec<(std::ops::Range<usize>, Diagnostic)>) {
        let mut items = Vec::with_capacity(batch.len());
        for (range, diagnostic) in batch {
            let id = AnnotationId(self.next_id);
            self.next_id += 1;
            items.push(Annotation {
                id,
                range,
                diagnostic,
            });
        }
        self.items = items;
    }

    /// Drop every annotation
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// First annotation whose current range contains `pos`
    pub fn find_at(&self, pos: usize) -> Option<&Annotation> {
        self.items.iter().find(|a| a.range.contains(&pos))
    }

    /// Look an annotation up by id
    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.items.iter().find(|a| a.id == id)
    }

    /// Remove a single annotation, e.g. after its replacement was applied
    pub fn remove(&mut self, id: AnnotationId) {
        self.items.retain(|a| a.id != id);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Re-anchor every annotation through an edit's delta.
    ///
    /// Starts are transformed with `after = true` and ends with `after =
    /// false`, so an insertion at either boundary stays outside the
    /// annotation. Annotations whose transformed range collapses or exceeds
    /// the new buffer length are dropped rather than left stale.
    pub(crate) fn transform(&mut self, delta: &Delta<RopeInfo>, doc_len: usize) {
        let mut transformer = Transformer::new(delta);

        for annotation in &mut self.items {
            let new_start = transformer.transform(annotation.range.start, true);
            let new_end = transformer.transform(annotation.range.end, false);
            annotation.range = new_start..new_end;
        }

        self.items
            .retain(|a| a.range.start < a.range.end && a.range.end <= doc_len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::{Cmd, Document};

    fn diagnostic(message: &str) -> Diagnostic {
        Diagnostic {
            span: 0..1,
            message: message.to_string(),
            replacements: vec!["x".to_string()],
        }
    }

    fn doc_with_annotation(text: &str, range: std::ops::Range<usize>) -> Document {
        let mut doc = Document::from_bytes(text.as_bytes()).unwrap();
        doc.annotations_mut()
            .replace_all(vec![(range, diagnostic("test"))]);
        doc
    }

    #[test]
    fn test_replace_all_swaps_set() {
        let mut set = AnnotationSet::default();
        set.replace_all(vec![(0..3, diagnostic("a")), (5..8, diagnostic("b"))]);
        assert_eq!(set.len(), 2);

        set.replace_all(vec![(1..2, diagnostic("c"))]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.iter().next().unwrap().diagnostic.message, "c");
    }

    #[test]
    fn test_ids_stay_unique_across_batches() {
        let mut set = AnnotationSet::default();
        set.replace_all(vec![(0..3, diagnostic("a"))]);
        let first = set.iter().next().unwrap().id;

        set.replace_all(vec![(0..3, diagnostic("b"))]);
        let second = set.iter().next().unwrap().id;

        assert_ne!(first, second);
    }

    #[test]
    fn test_find_at_half_open_range() {
        let mut set = AnnotationSet::default();
        set.replace_all(vec![(4..7, diagnostic("hit"))]);

        assert!(set.find_at(3).is_none());
        assert!(set.find_at(4).is_some());
        assert!(set.find_at(6).is_some());
        assert!(set.find_at(7).is_none());
    }

    #[test]
    fn test_insert_before_annotation_shifts_it() {
        // "Teh" at 0..3
        let mut doc = doc_with_annotation("Teh cat sat.", 0..3);
        doc.apply(Cmd::InsertText {
            at: 0,
            text: "Oh, ".to_string(),
        });

        let annotation = doc.annotations().iter().next().unwrap();
        assert_eq!(annotation.range, 4..7);
        assert_eq!(&doc.text()[annotation.range.clone()], "Teh");
    }

    #[test]
    fn test_insert_after_annotation_leaves_it() {
        let mut doc = doc_with_annotation("Teh cat sat.", 0..3);
        doc.apply(Cmd::InsertText {
            at: 12,
            text: " More text.".to_string(),
        });

        let annotation = doc.annotations().iter().next().unwrap();
        assert_eq!(annotation.range, 0..3);
    }

    #[test]
    fn test_insert_at_boundary_stays_outside() {
        // Insertion exactly at the end must not grow the annotation
        let mut doc = doc_with_annotation("Teh cat sat.", 0..3);
        doc.apply(Cmd::InsertText {
            at: 3,
            text: "x".to_string(),
        });

        let annotation = doc.annotations().iter().next().unwrap();
        assert_eq!(annotation.range, 0..3);
    }

    #[test]
    fn test_delete_covering_annotation_drops_it() {
        let mut doc = doc_with_annotation("Teh cat sat.", 4..7);
        doc.apply(Cmd::DeleteRange { range: 0..8 });

        assert!(doc.annotations().is_empty());
    }

    #[test]
    fn test_delete_before_annotation_shifts_it() {
        let mut doc = doc_with_annotation("Teh cat sat.", 4..7);
        doc.apply(Cmd::DeleteRange { range: 0..4 });

        let annotation = doc.annotations().iter().next().unwrap();
        assert_eq!(annotation.range, 0..3);
        assert_eq!(&doc.text()[annotation.range.clone()], "cat");
    }

    #[test]
    fn test_remove_by_id() {
        let mut set = AnnotationSet::default();
        set.replace_all(vec![(0..3, diagnostic("a")), (5..8, diagnostic("b"))]);
        let id = set.iter().next().unwrap().id;

        set.remove(id);
        assert_eq!(set.len(), 1);
        assert!(set.get(id).is_none());
    }

    #[test]
    fn test_overlapping_annotations_all_kept() {
        let mut set = AnnotationSet::default();
        set.replace_all(vec![(0..5, diagnostic("a")), (2..7, diagnostic("b"))]);

        assert_eq!(set.len(), 2);
        // find_at returns the first one in batch order
        assert_eq!(set.find_at(3).unwrap().diagnostic.message, "a");
    }
}
