use std::collections::BTreeSet;
use std::str::FromStr;

use crate::models::{EmploymentKind, WorkMode};
use crate::query::{FilterSpec, SortKey};

/// Location choice that lifts the location restriction.
pub const ALL_LOCATIONS: &str = "All";

/// The set-valued filter families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterFamily {
    EmploymentKind,
    WorkMode,
    Location,
    Category,
}

impl FromStr for FilterFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "type" | "kind" | "employment_kinds" => Ok(FilterFamily::EmploymentKind),
            "workType" | "work_type" | "work_mode" | "work_modes" => Ok(FilterFamily::WorkMode),
            "location" | "locations" => Ok(FilterFamily::Location),
            "category" | "categories" => Ok(FilterFamily::Category),
            _ => Err(format!("unknown filter family '{}'", s)),
        }
    }
}

/// Assignment to one of the scalar filter fields. `None` (or `false`)
/// removes the restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarUpdate {
    IsPaid(Option<bool>),
    FeaturedOnly(bool),
    SalaryMin(Option<u32>),
    SalaryMax(Option<u32>),
}

/// One-click shortcuts that replace a whole family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickFilter {
    Internships,
    Remote,
    PaidOnly,
    TechJobs,
}

impl QuickFilter {
    pub const ALL: [QuickFilter; 4] = [
        QuickFilter::Internships,
        QuickFilter::Remote,
        QuickFilter::PaidOnly,
        QuickFilter::TechJobs,
    ];

    pub fn label(self) -> &'static str {
        match self {
            QuickFilter::Internships => "Internships",
            QuickFilter::Remote => "Remote",
            QuickFilter::PaidOnly => "Paid Only",
            QuickFilter::TechJobs => "Tech Jobs",
        }
    }
}

/// Owns the filter and sort state. Every mutation is visible to the next
/// query immediately.
#[derive(Debug, Clone, Default)]
pub struct FilterController {
    filters: FilterSpec,
    sort: SortKey,
}

impl FilterController {
    pub fn new(sort: SortKey) -> Self {
        Self {
            filters: FilterSpec::default(),
            sort,
        }
    }

    pub fn filters(&self) -> &FilterSpec {
        &self.filters
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort
    }

    pub fn active_filter_count(&self) -> usize {
        self.filters.active_count()
    }

    /// Header search box. Blank input clears the text query; anything else
    /// is kept as typed.
    pub fn set_text_query(&mut self, q: &str) {
        self.filters.query = (!q.trim().is_empty()).then(|| q.to_string());
        tracing::debug!(query = ?self.filters.query, "text query");
    }

    /// Narrows to a single location key; `All` (or blank) lifts the
    /// location restriction.
    pub fn set_location_hint(&mut self, loc: &str) {
        let loc = loc.trim();
        self.filters.locations.clear();
        if !loc.is_empty() && loc != ALL_LOCATIONS {
            self.filters.locations.insert(loc.to_string());
        }
        tracing::debug!(locations = ?self.filters.locations, "location hint");
    }

    /// Hero search: text plus location in one go.
    pub fn hero_search(&mut self, q: &str, loc: &str) {
        self.set_text_query(q);
        self.set_location_hint(loc);
    }

    /// Adds `value` to the family if absent, removes it if present. Unknown
    /// families and values that do not parse for the family are ignored.
    pub fn toggle_multi_select(&mut self, family: &str, value: &str) {
        match family.parse::<FilterFamily>() {
            Ok(family) => self.toggle(family, value),
            Err(e) => tracing::debug!(error = %e, value, "ignoring toggle"),
        }
    }

    pub fn toggle(&mut self, family: FilterFamily, value: &str) {
        match family {
            FilterFamily::EmploymentKind => match value.parse::<EmploymentKind>() {
                Ok(kind) => flip(&mut self.filters.employment_kinds, kind),
                Err(e) => tracing::debug!(error = %e, "ignoring toggle"),
            },
            FilterFamily::WorkMode => match value.parse::<WorkMode>() {
                Ok(mode) => flip(&mut self.filters.work_modes, mode),
                Err(e) => tracing::debug!(error = %e, "ignoring toggle"),
            },
            FilterFamily::Location => flip(&mut self.filters.locations, value.to_string()),
            FilterFamily::Category => flip(&mut self.filters.categories, value.to_string()),
        }
        tracing::debug!(?family, value, active = self.active_filter_count(), "toggled filter");
    }

    pub fn set_scalar(&mut self, update: ScalarUpdate) {
        match update {
            ScalarUpdate::IsPaid(v) => self.filters.is_paid = v,
            ScalarUpdate::FeaturedOnly(v) => self.filters.featured_only = v,
            ScalarUpdate::SalaryMin(v) => self.filters.salary_min = v.filter(|&v| v > 0),
            ScalarUpdate::SalaryMax(v) => self.filters.salary_max = v.filter(|&v| v > 0),
        }
        tracing::debug!(?update, "scalar filter");
    }

    /// Category tiles narrow to exactly one category.
    pub fn select_category(&mut self, category: &str) {
        self.filters.categories = BTreeSet::from([category.to_string()]);
        tracing::debug!(category, "selected category");
    }

    pub fn apply_quick_filter(&mut self, quick: QuickFilter) {
        match quick {
            QuickFilter::Internships => {
                self.filters.employment_kinds = BTreeSet::from([EmploymentKind::Internship]);
            }
            QuickFilter::Remote => {
                self.filters.work_modes = BTreeSet::from([WorkMode::Remote]);
            }
            QuickFilter::PaidOnly => self.filters.is_paid = Some(true),
            QuickFilter::TechJobs => self.select_category("Technology"),
        }
        tracing::debug!(?quick, "quick filter");
    }

    /// Drops every filter; the sort key stays.
    pub fn clear_all(&mut self) {
        self.filters = FilterSpec::default();
        tracing::debug!("cleared filters");
    }

    pub fn set_sort_key(&mut self, key: SortKey) {
        self.sort = key;
        tracing::debug!(?key, "sort key");
    }
}

fn flip<T: Ord>(set: &mut BTreeSet<T>, value: T) {
    if !set.remove(&value) {
        set.insert(value);
    }
}
