#[derive(Debug, Clone)]
pub(crate) struct PickerState<T> {
    pub(crate) items: Vec<T>,
    pub(crate) selected: usize,
}

impl<T> Default for PickerState<T> {
    fn default() -> Self {
        Self::from_items(Vec::new())
    }
}

impl<T> PickerState<T> {
    pub(crate) fn from_items(items: Vec<T>) -> Self {
        Self { items, selected: 0 }
    }

    pub(crate) fn set_items(&mut self, items: Vec<T>) {
        self.items = items;
        self.selected = 0;
    }

    pub(crate) fn move_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub(crate) fn move_down(&mut self) {
        if self.selected + 1 < self.items.len() {
            self.selected += 1;
        }
    }

    pub(crate) fn selected_item(&self) -> Option<&T> {
        self.items.get(self.selected)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
