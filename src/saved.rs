use std::collections::HashSet;

/// Bookmarked posting ids. Lives for the session only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavedSet {
    ids: HashSet<String>,
}

impl SavedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Saves `id` if it is not saved yet, unsaves it otherwise. Returns
    /// whether the id is saved afterwards.
    pub fn toggle_save(&mut self, id: &str) -> bool {
        let saved = if self.ids.remove(id) {
            false
        } else {
            self.ids.insert(id.to_string());
            true
        };
        tracing::debug!(id, saved, total = self.ids.len(), "toggled save");
        saved
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_twice_restores_original_state() {
        let mut saved = SavedSet::new();
        assert!(saved.toggle_save("42"));
        assert!(saved.contains("42"));
        assert!(!saved.toggle_save("42"));
        assert!(!saved.contains("42"));
        assert_eq!(saved, SavedSet::new());
    }

    #[test]
    fn test_ids_are_independent() {
        let mut saved = SavedSet::new();
        saved.toggle_save("1");
        saved.toggle_save("2");
        saved.toggle_save("1");
        assert!(!saved.contains("1"));
        assert!(saved.contains("2"));
        assert_eq!(saved.len(), 1);
        assert!(!saved.is_empty());
    }
}
