//! Filtering and ordering of the listing collection.
//!
//! Every filter field is optional. An unset field (or an empty set) does not
//! restrict anything; a set field drops the postings that do not match it.
//! Families combine with AND, values inside one family with OR.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::models::{EmploymentKind, JobPosting, WorkMode};

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterSpec {
    pub query: Option<String>,
    pub employment_kinds: BTreeSet<EmploymentKind>,
    pub work_modes: BTreeSet<WorkMode>,
    pub locations: BTreeSet<String>,
    pub categories: BTreeSet<String>,
    pub is_paid: Option<bool>,
    pub featured_only: bool,
    pub salary_min: Option<u32>,
    pub salary_max: Option<u32>,
}

impl FilterSpec {
    pub fn is_empty(&self) -> bool {
        *self == FilterSpec::default()
    }

    /// Number of active constraints as shown on the filter badge. Salary
    /// bounds count once even when both are set.
    pub fn active_count(&self) -> usize {
        let mut count = self.employment_kinds.len()
            + self.work_modes.len()
            + self.locations.len()
            + self.categories.len();
        if self.is_paid.is_some() {
            count += 1;
        }
        if self.featured_only {
            count += 1;
        }
        if self.salary_floor().is_some() || self.salary_ceiling().is_some() {
            count += 1;
        }
        count
    }

    fn salary_floor(&self) -> Option<u32> {
        self.salary_min.filter(|&v| v > 0)
    }

    fn salary_ceiling(&self) -> Option<u32> {
        self.salary_max.filter(|&v| v > 0)
    }

    pub fn matches(&self, job: &JobPosting) -> bool {
        if let Some(q) = self.query.as_deref().filter(|q| !q.is_empty()) {
            if !job.searchable_text().contains(&q.to_lowercase()) {
                return false;
            }
        }

        if !self.employment_kinds.is_empty() && !self.employment_kinds.contains(&job.employment_kind) {
            return false;
        }

        if !self.work_modes.is_empty() && !self.work_modes.contains(&job.work_mode) {
            return false;
        }

        if !self.locations.is_empty() && !self.locations.contains(job.location_key()) {
            return false;
        }

        if !self.categories.is_empty() && !self.categories.contains(&job.category) {
            return false;
        }

        if let Some(paid) = self.is_paid {
            if job.is_paid != paid {
                return false;
            }
        }

        if self.featured_only && !job.featured {
            return false;
        }

        // Salary bounds only apply to postings that state the bound. Zero
        // means "not stated" on both sides.
        let comp = job.compensation.as_ref();
        let stated = |v: Option<u32>| v.filter(|&v| v > 0);
        if let (Some(floor), Some(min)) = (self.salary_floor(), comp.and_then(|c| stated(c.min))) {
            if min < floor {
                return false;
            }
        }
        if let (Some(ceiling), Some(max)) = (self.salary_ceiling(), comp.and_then(|c| stated(c.max))) {
            if max > ceiling {
                return false;
            }
        }

        true
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    #[value(name = "recent")]
    #[serde(rename = "recent")]
    MostRecent,
    #[value(name = "salary")]
    #[serde(rename = "salary")]
    HighestSalary,
    #[value(name = "applicants")]
    #[serde(rename = "applicants")]
    FewestApplicants,
}

impl SortKey {
    pub fn label(self) -> &'static str {
        match self {
            SortKey::MostRecent => "Most Recent",
            SortKey::HighestSalary => "Highest Salary",
            SortKey::FewestApplicants => "Fewest Applicants",
        }
    }

    pub fn next(self) -> SortKey {
        match self {
            SortKey::MostRecent => SortKey::HighestSalary,
            SortKey::HighestSalary => SortKey::FewestApplicants,
            SortKey::FewestApplicants => SortKey::MostRecent,
        }
    }

    fn compare(self, a: &JobPosting, b: &JobPosting) -> Ordering {
        match self {
            // Unparseable dates sort as the oldest.
            SortKey::MostRecent => b.posted_at().cmp(&a.posted_at()),
            SortKey::HighestSalary => b.salary_sort_value().cmp(&a.salary_sort_value()),
            SortKey::FewestApplicants => a.applicant_count.cmp(&b.applicant_count),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Positions into `jobs` of the matching postings, in display order.
/// Ties keep their input order.
pub fn positions(jobs: &[JobPosting], filters: &FilterSpec, sort: SortKey) -> Vec<usize> {
    let mut hits: Vec<usize> = jobs
        .iter()
        .enumerate()
        .filter(|(_, job)| filters.matches(job))
        .map(|(i, _)| i)
        .collect();
    hits.sort_by(|&a, &b| sort.compare(&jobs[a], &jobs[b]));
    hits
}

/// The derived view: matching postings in display order.
pub fn query<'a>(jobs: &'a [JobPosting], filters: &FilterSpec, sort: SortKey) -> Vec<&'a JobPosting> {
    positions(jobs, filters, sort)
        .into_iter()
        .map(|i| &jobs[i])
        .collect()
}

/// A derived view that shares the collection and the computed ordering, so
/// handing it out never copies postings or re-runs the query.
#[derive(Debug, Clone)]
pub struct ListingView {
    jobs: Arc<[JobPosting]>,
    positions: Arc<[usize]>,
}

impl ListingView {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&JobPosting> {
        self.positions.get(index).map(|&i| &self.jobs[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &JobPosting> + '_ {
        self.positions.iter().map(move |&i| &self.jobs[i])
    }

    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.iter().position(|j| j.id == id)
    }
}

/// Remembers the last derived view and recomputes only when the collection,
/// the filters or the sort key change.
#[derive(Debug, Default)]
pub struct ViewCache {
    key: Option<(Arc<[JobPosting]>, FilterSpec, SortKey)>,
    positions: Arc<[usize]>,
    recomputations: usize,
}

impl ViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&mut self, jobs: &Arc<[JobPosting]>, filters: &FilterSpec, sort: SortKey) -> ListingView {
        let fresh = matches!(
            &self.key,
            Some((cached, f, s)) if Arc::ptr_eq(cached, jobs) && f == filters && *s == sort
        );
        if !fresh {
            self.positions = positions(jobs, filters, sort).into();
            self.key = Some((Arc::clone(jobs), filters.clone(), sort));
            self.recomputations += 1;
            tracing::debug!(
                results = self.positions.len(),
                total = jobs.len(),
                ?sort,
                "recomputed listing view"
            );
        }
        ListingView {
            jobs: Arc::clone(jobs),
            positions: Arc::clone(&self.positions),
        }
    }

    pub fn recomputations(&self) -> usize {
        self.recomputations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{job, pay};

    fn ids(view: &[&JobPosting]) -> Vec<String> {
        view.iter().map(|j| j.id.clone()).collect()
    }

    fn sample() -> Vec<JobPosting> {
        let mut a = job("a");
        a.title = "Marketing Intern".to_string();
        a.category = "Marketing".to_string();
        a.location = "Plovdiv, Bulgaria".to_string();
        a.is_paid = true;
        a.compensation = pay(Some(900), Some(1100));
        a.posted_date = "2024-03-01".to_string();
        a.applicant_count = 30;

        let mut b = job("b");
        b.title = "Backend Developer".to_string();
        b.employment_kind = EmploymentKind::EntryLevel;
        b.work_mode = WorkMode::Remote;
        b.location = "Remote".to_string();
        b.is_paid = true;
        b.compensation = pay(Some(2000), Some(2800));
        b.featured = true;
        b.posted_date = "2024-05-01".to_string();
        b.applicant_count = 10;

        let mut c = job("c");
        c.title = "Research Assistant".to_string();
        c.tags = vec!["Internship".to_string(), "Lab".to_string()];
        c.category = "Education".to_string();
        c.is_paid = false;
        c.posted_date = "2024-01-15".to_string();
        c.applicant_count = 5;

        vec![a, b, c]
    }

    #[test]
    fn test_empty_filter_returns_everything() {
        let jobs = sample();
        let view = query(&jobs, &FilterSpec::default(), SortKey::FewestApplicants);
        assert_eq!(view.len(), jobs.len());
        assert_eq!(ids(&view), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_query_is_idempotent_and_leaves_source_alone() {
        let jobs = sample();
        let before: Vec<String> = jobs.iter().map(|j| j.id.clone()).collect();
        let filters = FilterSpec {
            is_paid: Some(true),
            ..Default::default()
        };
        let first = ids(&query(&jobs, &filters, SortKey::HighestSalary));
        let second = ids(&query(&jobs, &filters, SortKey::HighestSalary));
        assert_eq!(first, second);
        let after: Vec<String> = jobs.iter().map(|j| j.id.clone()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_most_recent_orders_by_posted_date_descending() {
        let mut jobs = vec![job("jan"), job("jun"), job("dec")];
        jobs[0].posted_date = "2024-01-01".to_string();
        jobs[1].posted_date = "2024-06-01".to_string();
        jobs[2].posted_date = "2023-12-01".to_string();
        let view = query(&jobs, &FilterSpec::default(), SortKey::MostRecent);
        assert_eq!(ids(&view), vec!["jun", "jan", "dec"]);
    }

    #[test]
    fn test_most_recent_puts_unparseable_dates_last_without_panicking() {
        let mut jobs = vec![job("bad1"), job("ok"), job("bad2")];
        jobs[0].posted_date = "soon".to_string();
        jobs[1].posted_date = "2024-02-02".to_string();
        jobs[2].posted_date = String::new();
        let view = query(&jobs, &FilterSpec::default(), SortKey::MostRecent);
        assert_eq!(ids(&view), vec!["ok", "bad1", "bad2"]);
    }

    #[test]
    fn test_highest_salary_falls_back_to_min_then_zero() {
        let mut jobs = vec![job("c"), job("b"), job("a")];
        jobs[0].compensation = None;
        jobs[1].compensation = pay(Some(1500), None);
        jobs[2].compensation = pay(Some(1000), Some(2000));
        let view = query(&jobs, &FilterSpec::default(), SortKey::HighestSalary);
        assert_eq!(ids(&view), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_sort_is_stable_for_equal_keys() {
        let mut jobs = vec![job("1"), job("2"), job("3"), job("4")];
        jobs[0].applicant_count = 7;
        jobs[1].applicant_count = 3;
        jobs[2].applicant_count = 7;
        jobs[3].applicant_count = 3;
        let view = query(&jobs, &FilterSpec::default(), SortKey::FewestApplicants);
        assert_eq!(ids(&view), vec!["2", "4", "1", "3"]);

        // Same dates everywhere: input order survives.
        let view = query(&jobs, &FilterSpec::default(), SortKey::MostRecent);
        assert_eq!(ids(&view), vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_text_search_is_case_insensitive_substring_over_tags_too() {
        let jobs = sample();
        let filters = FilterSpec {
            query: Some("INTERN".to_string()),
            ..Default::default()
        };
        let view = query(&jobs, &filters, SortKey::MostRecent);
        // "Marketing Intern" by title, "Research Assistant" by its tag.
        assert_eq!(ids(&view), vec!["a", "c"]);
    }

    #[test]
    fn test_text_search_matches_company_and_description() {
        let mut jobs = sample();
        jobs[1].company = "CloudNest".to_string();
        jobs[2].description = "Help run chemistry experiments".to_string();

        let by_company = FilterSpec {
            query: Some("cloudnest".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&query(&jobs, &by_company, SortKey::MostRecent)), vec!["b"]);

        let by_description = FilterSpec {
            query: Some("Chemistry".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&query(&jobs, &by_description, SortKey::MostRecent)), vec!["c"]);
    }

    #[test]
    fn test_trailing_space_in_query_is_significant() {
        let mut jobs = vec![job("word"), job("prefix")];
        jobs[0].title = "Java Developer".to_string();
        jobs[1].title = "JavaScript Intern".to_string();
        let exact = FilterSpec {
            query: Some("java ".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&query(&jobs, &exact, SortKey::MostRecent)), vec!["word"]);
        let bare = FilterSpec {
            query: Some("java".to_string()),
            ..Default::default()
        };
        assert_eq!(query(&jobs, &bare, SortKey::MostRecent).len(), 2);
    }

    #[test]
    fn test_empty_query_string_does_not_restrict() {
        let jobs = sample();
        let filters = FilterSpec {
            query: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(query(&jobs, &filters, SortKey::MostRecent).len(), 3);
    }

    #[test]
    fn test_families_or_within_and_across() {
        let jobs = sample();
        let mut filters = FilterSpec::default();
        filters.employment_kinds.insert(EmploymentKind::Internship);
        filters.employment_kinds.insert(EmploymentKind::EntryLevel);
        assert_eq!(query(&jobs, &filters, SortKey::MostRecent).len(), 3);

        filters.work_modes.insert(WorkMode::OnSite);
        assert_eq!(ids(&query(&jobs, &filters, SortKey::MostRecent)), vec!["a", "c"]);

        filters.categories.insert("Education".to_string());
        assert_eq!(ids(&query(&jobs, &filters, SortKey::MostRecent)), vec!["c"]);
    }

    #[test]
    fn test_location_filter_uses_text_before_comma() {
        let jobs = sample();
        let mut filters = FilterSpec::default();
        filters.locations.insert("Plovdiv".to_string());
        assert_eq!(ids(&query(&jobs, &filters, SortKey::MostRecent)), vec!["a"]);

        filters.locations.insert("Remote".to_string());
        assert_eq!(ids(&query(&jobs, &filters, SortKey::MostRecent)), vec!["b", "a"]);

        let mut full = FilterSpec::default();
        full.locations.insert("Plovdiv, Bulgaria".to_string());
        assert!(query(&jobs, &full, SortKey::MostRecent).is_empty());
    }

    #[test]
    fn test_is_paid_is_authoritative_over_compensation() {
        let mut jobs = sample();
        jobs[2].compensation = pay(Some(500), Some(700));
        let paid = FilterSpec {
            is_paid: Some(true),
            ..Default::default()
        };
        assert_eq!(ids(&query(&jobs, &paid, SortKey::MostRecent)), vec!["b", "a"]);

        let unpaid = FilterSpec {
            is_paid: Some(false),
            ..Default::default()
        };
        assert_eq!(ids(&query(&jobs, &unpaid, SortKey::MostRecent)), vec!["c"]);
    }

    #[test]
    fn test_featured_only() {
        let jobs = sample();
        let filters = FilterSpec {
            featured_only: true,
            ..Default::default()
        };
        assert_eq!(ids(&query(&jobs, &filters, SortKey::MostRecent)), vec!["b"]);
    }

    #[test]
    fn test_salary_bounds_skip_postings_without_that_bound() {
        let mut jobs = vec![job("low"), job("high"), job("none"), job("max-only")];
        jobs[0].compensation = pay(Some(800), Some(1000));
        jobs[1].compensation = pay(Some(2000), Some(3000));
        jobs[2].compensation = None;
        jobs[3].compensation = pay(None, Some(5000));

        let floor = FilterSpec {
            salary_min: Some(1500),
            ..Default::default()
        };
        assert_eq!(
            ids(&query(&jobs, &floor, SortKey::FewestApplicants)),
            vec!["high", "none", "max-only"]
        );

        let ceiling = FilterSpec {
            salary_max: Some(2500),
            ..Default::default()
        };
        assert_eq!(
            ids(&query(&jobs, &ceiling, SortKey::FewestApplicants)),
            vec!["low", "none"]
        );
    }

    #[test]
    fn test_zero_salary_bounds_count_as_unset() {
        let mut jobs = vec![job("paid"), job("zero")];
        jobs[0].compensation = pay(Some(800), Some(1200));
        jobs[1].compensation = pay(Some(0), Some(0));

        let zero_ceiling = FilterSpec {
            salary_max: Some(0),
            ..Default::default()
        };
        assert_eq!(
            ids(&query(&jobs, &zero_ceiling, SortKey::FewestApplicants)),
            vec!["paid", "zero"]
        );
        assert_eq!(zero_ceiling.active_count(), 0);

        let floor = FilterSpec {
            salary_min: Some(500),
            ..Default::default()
        };
        assert_eq!(
            ids(&query(&jobs, &floor, SortKey::FewestApplicants)),
            vec!["paid", "zero"]
        );

        let ceiling = FilterSpec {
            salary_max: Some(1000),
            ..Default::default()
        };
        assert_eq!(ids(&query(&jobs, &ceiling, SortKey::FewestApplicants)), vec!["zero"]);
    }

    #[test]
    fn test_active_count() {
        let mut filters = FilterSpec::default();
        assert_eq!(filters.active_count(), 0);
        assert!(filters.is_empty());

        filters.employment_kinds.insert(EmploymentKind::Internship);
        filters.is_paid = Some(true);
        assert_eq!(filters.active_count(), 2);

        filters.salary_min = Some(1000);
        filters.salary_max = Some(3000);
        assert_eq!(filters.active_count(), 3);

        filters.featured_only = true;
        filters.locations.insert("Sofia".to_string());
        filters.locations.insert("Varna".to_string());
        assert_eq!(filters.active_count(), 6);

        // Text search is not a filter badge.
        filters.query = Some("rust".to_string());
        assert_eq!(filters.active_count(), 6);
    }

    #[test]
    fn test_view_cache_recomputes_only_on_input_change() {
        let jobs: Arc<[JobPosting]> = sample().into();
        let mut cache = ViewCache::new();
        let mut filters = FilterSpec::default();

        assert_eq!(cache.view(&jobs, &filters, SortKey::MostRecent).len(), 3);
        assert_eq!(cache.view(&jobs, &filters, SortKey::MostRecent).len(), 3);
        assert_eq!(cache.recomputations(), 1);

        filters.featured_only = true;
        let view = cache.view(&jobs, &filters, SortKey::MostRecent);
        assert_eq!(view.iter().map(|j| j.id.as_str()).collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(view.position_of("b"), Some(0));
        assert!(view.get(1).is_none());
        assert_eq!(cache.recomputations(), 2);

        cache.view(&jobs, &filters, SortKey::HighestSalary);
        assert_eq!(cache.recomputations(), 3);

        // Same contents, different collection identity.
        let copy: Arc<[JobPosting]> = jobs.iter().cloned().collect::<Vec<_>>().into();
        cache.view(&copy, &filters, SortKey::HighestSalary);
        assert_eq!(cache.recomputations(), 4);
    }
}
