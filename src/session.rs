use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::controller::FilterController;
use crate::query::{ListingView, SortKey, ViewCache};
use crate::saved::SavedSet;
use crate::store::ListingStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

impl ViewMode {
    pub fn toggled(self) -> ViewMode {
        match self {
            ViewMode::Grid => ViewMode::List,
            ViewMode::List => ViewMode::Grid,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterSection {
    JobType,
    WorkType,
    Location,
    Category,
    Salary,
    Other,
}

impl FilterSection {
    pub const ALL: [FilterSection; 6] = [
        FilterSection::JobType,
        FilterSection::WorkType,
        FilterSection::Location,
        FilterSection::Category,
        FilterSection::Salary,
        FilterSection::Other,
    ];

    pub fn title(self) -> &'static str {
        match self {
            FilterSection::JobType => "Job Type",
            FilterSection::WorkType => "Work Type",
            FilterSection::Location => "Location",
            FilterSection::Category => "Category",
            FilterSection::Salary => "Salary Range",
            FilterSection::Other => "Other Options",
        }
    }

    fn index(self) -> usize {
        FilterSection::ALL
            .iter()
            .position(|s| *s == self)
            .unwrap_or_default()
    }
}

/// Which sidebar sections are unfolded. All start expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpandedSections([bool; 6]);

impl Default for ExpandedSections {
    fn default() -> Self {
        Self([true; 6])
    }
}

impl ExpandedSections {
    pub fn is_expanded(&self, section: FilterSection) -> bool {
        self.0[section.index()]
    }

    pub fn toggle(&mut self, section: FilterSection) {
        let slot = &mut self.0[section.index()];
        *slot = !*slot;
    }
}

/// Everything the browsing front-end mutates: filters and sort (through the
/// controller), bookmarks, and presentation toggles. The store itself is
/// shared and never written.
#[derive(Debug)]
pub struct Session {
    store: Arc<ListingStore>,
    pub controller: FilterController,
    pub saved: SavedSet,
    pub view_mode: ViewMode,
    pub sections: ExpandedSections,
    cache: ViewCache,
}

impl Session {
    pub fn new(store: Arc<ListingStore>, sort: SortKey, view_mode: ViewMode) -> Self {
        Self {
            store,
            controller: FilterController::new(sort),
            saved: SavedSet::new(),
            view_mode,
            sections: ExpandedSections::default(),
            cache: ViewCache::new(),
        }
    }

    pub fn store(&self) -> &ListingStore {
        &self.store
    }

    /// The derived view for the current filters and sort key.
    pub fn view(&mut self) -> ListingView {
        self.cache.view(
            self.store.jobs(),
            self.controller.filters(),
            self.controller.sort_key(),
        )
    }

    pub fn toggle_save(&mut self, id: &str) -> bool {
        self.saved.toggle_save(id)
    }

    pub fn is_saved(&self, id: &str) -> bool {
        self.saved.contains(id)
    }

    pub fn recomputations(&self) -> usize {
        self.cache.recomputations()
    }

    /// Applications are not wired to any backend yet.
    pub fn apply(&self, id: &str) -> String {
        tracing::info!(id, "apply requested");
        "Application feature coming soon!".to_string()
    }

    /// Sharing just hands back a reference to the listing.
    pub fn share(&self, id: &str) -> String {
        tracing::info!(id, "share requested");
        format!("Link copied: stazhove show {}", id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ScalarUpdate;

    fn session() -> Session {
        let store = Arc::new(ListingStore::bundled().unwrap());
        Session::new(store, SortKey::MostRecent, ViewMode::Grid)
    }

    #[test]
    fn test_view_without_filters_is_whole_catalog() {
        let mut s = session();
        let total = s.store().jobs().len();
        assert_eq!(s.view().len(), total);
    }

    #[test]
    fn test_save_and_ui_toggles_do_not_recompute_view() {
        let mut s = session();
        let first = s.view().get(0).unwrap().id.clone();
        assert_eq!(s.recomputations(), 1);

        assert!(s.toggle_save(&first));
        s.view_mode = s.view_mode.toggled();
        s.sections.toggle(FilterSection::Salary);
        s.view();
        assert_eq!(s.recomputations(), 1);
        assert!(s.is_saved(&first));

        s.controller.set_scalar(ScalarUpdate::FeaturedOnly(true));
        s.view();
        assert_eq!(s.recomputations(), 2);
    }

    #[test]
    fn test_clear_all_leaves_saved_and_sort_alone() {
        let mut s = session();
        s.controller.set_sort_key(SortKey::HighestSalary);
        s.toggle_save("1");
        s.controller.toggle_multi_select("category", "Finance");
        s.controller.clear_all();
        assert!(s.controller.filters().is_empty());
        assert_eq!(s.controller.sort_key(), SortKey::HighestSalary);
        assert!(s.is_saved("1"));
    }

    #[test]
    fn test_no_results_is_not_an_error() {
        let mut s = session();
        s.controller.set_text_query("astronaut");
        assert!(s.view().is_empty());
    }

    #[test]
    fn test_sections_start_expanded_and_toggle() {
        let mut sections = ExpandedSections::default();
        assert!(FilterSection::ALL.iter().all(|s| sections.is_expanded(*s)));
        sections.toggle(FilterSection::Location);
        assert!(!sections.is_expanded(FilterSection::Location));
        assert!(sections.is_expanded(FilterSection::Category));
    }

    #[test]
    fn test_stub_actions_never_fail() {
        let s = session();
        assert!(s.apply("1").contains("coming soon"));
        assert!(s.share("1").ends_with("show 1"));
    }
}
