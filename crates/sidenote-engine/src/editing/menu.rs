use crate::editing::{Annotation, Cmd, Document, Patch};

/// Visibility state of the correction surface
#[derive(Debug, Clone, PartialEq, Default)]
pub enum MenuState {
    #[default]
    Hidden,
    Visible {
        /// Snapshot of the annotation that was hit; the *live* range is
        /// re-fetched by id when a replacement is chosen
        annotation: Annotation,
    },
}

/// The correction surface: the transient menu shown when the user activates
/// an annotated span.
///
/// This is a host-agnostic state machine. The host decides what a "click" is
/// (mouse position, caret position) and where to draw the menu; the machine
/// decides what is shown and turns a chosen candidate into exactly one
/// replacement edit over the annotation's current range.
#[derive(Debug, Default)]
pub struct CorrectionMenu {
    state: MenuState,
}

impl CorrectionMenu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle an activation at `pos`.
    ///
    /// A hit shows the menu (implicitly replacing any prior instance) and
    /// returns `true`. A miss hides the menu without side effects and returns
    /// `false`.
    pub fn open_at(&mut self, doc: &Document, pos: usize) -> bool {
        match doc.annotations().find_at(pos) {
            Some(annotation) => {
                self.state = MenuState::Visible {
                    annotation: annotation.clone(),
                };
                true
            }
            None => {
                self.state = MenuState::Hidden;
                false
            }
        }
    }

    /// The annotation currently presented, if the menu is visible
    pub fn visible(&self) -> Option<&Annotation> {
        match &self.state {
            MenuState::Visible { annotation } => Some(annotation),
            MenuState::Hidden => None,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible().is_some()
    }

    pub fn state(&self) -> &MenuState {
        &self.state
    }

    /// Hide the menu without applying anything
    pub fn dismiss(&mut self) {
        self.state = MenuState::Hidden;
    }

    /// Apply the replacement candidate at `index` and hide the menu.
    ///
    /// The replacement spans the annotation's *current* range, looked up by id
    /// so that edits since the menu opened are tolerated. Returns `None`
    /// without editing if the index is out of bounds or the annotation no
    /// longer exists.
    pub fn choose(&mut self, doc: &mut Document, index: usize) -> Option<Patch> {
        let state = std::mem::take(&mut self.state);
        let MenuState::Visible { annotation } = state else {
            return None;
        };

        let replacement = annotation.diagnostic.replacements.get(index)?.clone();
        let live_range = doc.annotations().get(annotation.id)?.range.clone();

        // The annotation is consumed by applying its replacement
        doc.annotations_mut().remove(annotation.id);
        Some(doc.apply(Cmd::ReplaceRange {
            range: live_range,
            text: replacement,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lint::Diagnostic;

    fn doc_with_spelling_annotation() -> Document {
        let mut doc = Document::from_bytes(b"Teh cat sat.").unwrap();
        doc.annotations_mut().replace_all(vec![(
            0..3,
            Diagnostic {
                span: 0..3,
                message: "Possible spelling mistake".to_string(),
                replacements: vec!["The".to_string(), "Ten".to_string()],
            },
        )]);
        doc
    }

    #[test]
    fn test_open_at_hit_shows_menu() {
        let doc = doc_with_spelling_annotation();
        let mut menu = CorrectionMenu::new();

        assert!(menu.open_at(&doc, 1));
        let annotation = menu.visible().unwrap();
        assert_eq!(annotation.range, 0..3);
        assert_eq!(annotation.diagnostic.replacements, vec!["The", "Ten"]);
    }

    #[test]
    fn test_open_at_miss_hides_menu() {
        let doc = doc_with_spelling_annotation();
        let mut menu = CorrectionMenu::new();

        menu.open_at(&doc, 1);
        assert!(menu.is_visible());

        // A click that misses every annotation hides the surface
        assert!(!menu.open_at(&doc, 8));
        assert!(!menu.is_visible());
    }

    #[test]
    fn test_choose_applies_replacement() {
        let mut doc = doc_with_spelling_annotation();
        let mut menu = CorrectionMenu::new();

        menu.open_at(&doc, 0);
        let patch = menu.choose(&mut doc, 0).unwrap();

        assert_eq!(doc.text(), "The cat sat.");
        assert_eq!(patch.version, 1);
        assert!(!menu.is_visible());
        assert!(doc.annotations().is_empty());
    }

    #[test]
    fn test_choose_uses_live_range_after_drift() {
        let mut doc = doc_with_spelling_annotation();
        let mut menu = CorrectionMenu::new();
        menu.open_at(&doc, 0);

        // Edit elsewhere while the menu is open; the annotation re-anchors
        doc.apply(Cmd::InsertText {
            at: 0,
            text: "Well, ".to_string(),
        });

        menu.choose(&mut doc, 0).unwrap();
        assert_eq!(doc.text(), "Well, The cat sat.");
    }

    #[test]
    fn test_choose_second_candidate() {
        let mut doc = doc_with_spelling_annotation();
        let mut menu = CorrectionMenu::new();
        menu.open_at(&doc, 0);

        menu.choose(&mut doc, 1).unwrap();
        assert_eq!(doc.text(), "Ten cat sat.");
    }

    #[test]
    fn test_choose_with_invalid_index_is_a_no_op_edit() {
        let mut doc = doc_with_spelling_annotation();
        let mut menu = CorrectionMenu::new();
        menu.open_at(&doc, 0);

        assert!(menu.choose(&mut doc, 5).is_none());
        assert_eq!(doc.text(), "Teh cat sat.");
        assert!(!menu.is_visible());
    }

    #[test]
    fn test_choose_after_annotation_vanished() {
        let mut doc = doc_with_spelling_annotation();
        let mut menu = CorrectionMenu::new();
        menu.open_at(&doc, 0);

        // A newer analysis batch replaced the set while the menu was open
        doc.annotations_mut().replace_all(vec![]);

        assert!(menu.choose(&mut doc, 0).is_none());
        assert_eq!(doc.text(), "Teh cat sat.");
    }

    #[test]
    fn test_dismiss_has_no_side_effects() {
        let doc = doc_with_spelling_annotation();
        let mut menu = CorrectionMenu::new();
        menu.open_at(&doc, 0);

        menu.dismiss();
        assert!(!menu.is_visible());
        assert_eq!(doc.text(), "Teh cat sat.");
        assert_eq!(doc.annotations().len(), 1);
    }
}
