use shared::domain::PathId;

/// Single-selection model over the main layer. Eligibility is decided by
/// the caller; anything passed in here is already a main-layer item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    selected: Option<PathId>,
    hovered: Option<PathId>,
}

impl Selection {
    pub fn selected(&self) -> Option<PathId> {
        self.selected
    }

    pub fn hovered(&self) -> Option<PathId> {
        self.hovered
    }

    pub fn has_selection(&self) -> bool {
        self.selected.is_some()
    }

    /// Exclusive select, or clear on `None`. Returns whether the selection
    /// changed.
    pub fn select(&mut self, item: Option<PathId>) -> bool {
        let changed = self.selected != item;
        self.selected = item;
        changed
    }

    pub fn hover(&mut self, item: Option<PathId>) {
        self.hovered = item;
    }

    pub fn clear(&mut self) {
        self.selected = None;
        self.hovered = None;
    }

    /// Items the canvas should draw highlighted.
    pub fn highlighted(&self) -> impl Iterator<Item = PathId> + '_ {
        self.selected
            .into_iter()
            .chain(self.hovered.filter(|h| Some(*h) != self.selected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selecting_replaces_previous_item() {
        let mut selection = Selection::default();
        assert!(selection.select(Some(PathId(1))));
        assert!(selection.select(Some(PathId(2))));
        assert_eq!(selection.selected(), Some(PathId(2)));
        assert!(!selection.select(Some(PathId(2))));
        assert!(selection.select(None));
        assert!(!selection.has_selection());
    }

    #[test]
    fn hover_and_selection_highlight_once() {
        let mut selection = Selection::default();
        selection.select(Some(PathId(4)));
        selection.hover(Some(PathId(4)));
        assert_eq!(selection.highlighted().collect::<Vec<_>>(), vec![PathId(4)]);

        selection.hover(Some(PathId(7)));
        assert_eq!(
            selection.highlighted().collect::<Vec<_>>(),
            vec![PathId(4), PathId(7)]
        );

        selection.clear();
        assert_eq!(selection.highlighted().count(), 0);
    }
}
