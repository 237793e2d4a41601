use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::CatalogError;
use crate::models::{CompanyProfile, JobPosting};

const BUNDLED_CATALOG: &str = include_str!("../data/fixtures.json");

#[derive(Debug, Deserialize)]
struct CatalogFile {
    jobs: Vec<JobPosting>,
    #[serde(default)]
    companies: Vec<CompanyProfile>,
}

/// Read-only job and company records for the session.
///
/// Jobs live behind an `Arc<[JobPosting]>` so the derived-view cache can
/// tell by pointer identity whether the collection it computed against is
/// still the current one.
#[derive(Debug)]
pub struct ListingStore {
    jobs: Arc<[JobPosting]>,
    companies: Vec<CompanyProfile>,
    source: Option<PathBuf>,
}

impl ListingStore {
    /// Loads `path` when given, otherwise the catalog compiled into the binary.
    pub fn open(path: Option<&Path>) -> Result<Self, CatalogError> {
        match path {
            Some(path) => Self::load(path),
            None => Self::bundled(),
        }
    }

    pub fn bundled() -> Result<Self, CatalogError> {
        let store = Self::from_json(BUNDLED_CATALOG)?;
        tracing::info!(
            jobs = store.jobs.len(),
            companies = store.companies.len(),
            "loaded bundled catalog"
        );
        Ok(store)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut store = Self::from_json(&raw)?;
        store.source = Some(path.to_path_buf());
        tracing::info!(
            path = %path.display(),
            jobs = store.jobs.len(),
            companies = store.companies.len(),
            "loaded catalog"
        );
        Ok(store)
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let catalog: CatalogFile = serde_json::from_str(raw)?;
        Self::new(catalog.jobs, catalog.companies)
    }

    pub fn new(jobs: Vec<JobPosting>, companies: Vec<CompanyProfile>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::with_capacity(jobs.len());
        for job in &jobs {
            if !seen.insert(job.id.as_str()) {
                return Err(CatalogError::DuplicateId(job.id.clone()));
            }
            if job.posted_at().is_none() {
                tracing::warn!(id = %job.id, posted = %job.posted_date, "unparseable posted date");
            }
        }
        Ok(Self {
            jobs: jobs.into(),
            companies,
            source: None,
        })
    }

    /// Where the catalog came from; `None` for the bundled fixtures.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn jobs(&self) -> &Arc<[JobPosting]> {
        &self.jobs
    }

    pub fn companies(&self) -> &[CompanyProfile] {
        &self.companies
    }

    pub fn get_job(&self, id: &str) -> Option<&JobPosting> {
        self.jobs.iter().find(|j| j.id == id)
    }

    /// Looks a company up by id, then by case-insensitive name.
    pub fn find_company(&self, key: &str) -> Option<&CompanyProfile> {
        self.companies
            .iter()
            .find(|c| c.id == key)
            .or_else(|| self.companies.iter().find(|c| c.name.eq_ignore_ascii_case(key)))
    }

    /// Resolves the posting's company. The explicit `company_id` wins; jobs
    /// without one fall back to a display-name match. Either may miss, since
    /// fixtures do not guarantee referential integrity.
    pub fn company_for(&self, job: &JobPosting) -> Option<&CompanyProfile> {
        if let Some(id) = &job.company_id {
            let hit = self.companies.iter().find(|c| &c.id == id);
            if hit.is_none() {
                tracing::warn!(job = %job.id, company_id = %id, "dangling company reference");
            }
            return hit;
        }
        self.companies
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(&job.company))
    }

    pub fn jobs_for_company(&self, company: &CompanyProfile) -> Vec<&JobPosting> {
        self.jobs
            .iter()
            .filter(|j| match &j.company_id {
                Some(id) => *id == company.id,
                None => j.company.eq_ignore_ascii_case(&company.name),
            })
            .collect()
    }

    /// Number of postings per category, sorted by category name.
    pub fn category_counts(&self) -> Vec<(String, usize)> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for job in self.jobs.iter() {
            *counts.entry(job.category.as_str()).or_default() += 1;
        }
        counts.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    pub fn categories(&self) -> Vec<String> {
        self.category_counts().into_iter().map(|(c, _)| c).collect()
    }

    /// Distinct location keys, sorted.
    pub fn location_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .jobs
            .iter()
            .map(|j| j.location_key().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }
}
