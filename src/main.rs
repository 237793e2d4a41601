mod config;
mod controller;
mod error;
mod models;
mod query;
mod saved;
mod session;
mod store;
mod tui;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

use config::Settings;
use controller::{FilterController, FilterFamily, ScalarUpdate};
use models::{EmploymentKind, JobPosting, WorkMode};
use query::SortKey;
use session::{Session, ViewMode};
use store::ListingStore;

#[derive(Parser)]
#[command(name = "stazhove")]
#[command(about = "Browse internships and entry-level jobs from a local catalog")]
struct Cli {
    /// JSON catalog to load instead of the bundled one
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List jobs matching the given filters
    List {
        #[command(flatten)]
        filters: FilterArgs,

        /// Sort order (recent, salary, applicants)
        #[arg(short, long)]
        sort: Option<SortKey>,
    },

    /// Show job details
    Show {
        /// Job ID
        id: String,
    },

    /// Partner companies
    Companies {
        #[command(subcommand)]
        command: Option<CompanyCommands>,
    },

    /// Job counts per category
    Categories,

    /// Interactive browser
    Browse {
        #[command(flatten)]
        filters: FilterArgs,

        /// Initial sort order (recent, salary, applicants)
        #[arg(short, long)]
        sort: Option<SortKey>,

        /// Card layout (grid, list)
        #[arg(long)]
        view: Option<ViewMode>,
    },
}

#[derive(Subcommand)]
enum CompanyCommands {
    /// List all companies
    List,

    /// Show a company profile and its open positions
    Show {
        /// Company id or name
        name: String,
    },
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// Search title, company, description and tags
    #[arg(short, long)]
    query: Option<String>,

    /// City (text before the comma), or "All"
    #[arg(short, long)]
    location: Option<String>,

    /// Internship, Entry Level, Graduate Program (repeatable)
    #[arg(short, long)]
    kind: Vec<EmploymentKind>,

    /// Remote, On-site, Hybrid (repeatable)
    #[arg(short, long)]
    work_mode: Vec<WorkMode>,

    /// Category (repeatable)
    #[arg(short, long)]
    category: Vec<String>,

    /// Only paid positions
    #[arg(long, conflicts_with = "unpaid")]
    paid: bool,

    /// Only unpaid positions
    #[arg(long)]
    unpaid: bool,

    /// Only featured positions
    #[arg(long)]
    featured: bool,

    /// Minimum monthly pay
    #[arg(long)]
    salary_min: Option<u32>,

    /// Maximum monthly pay
    #[arg(long)]
    salary_max: Option<u32>,
}

impl FilterArgs {
    /// Feeds the flags through the controller as the front-end would.
    fn apply(&self, ctl: &mut FilterController, store: &ListingStore) {
        if let Some(loc) = &self.location {
            hint("location", loc, &store.location_keys());
        }
        for cat in &self.category {
            hint("category", cat, &store.categories());
        }

        match (&self.query, &self.location) {
            (Some(q), Some(loc)) => ctl.hero_search(q, loc),
            (Some(q), None) => ctl.set_text_query(q),
            (None, Some(loc)) => ctl.set_location_hint(loc),
            (None, None) => {}
        }

        for kind in &self.kind {
            if !ctl.filters().employment_kinds.contains(kind) {
                ctl.toggle(FilterFamily::EmploymentKind, kind.label());
            }
        }
        for mode in &self.work_mode {
            if !ctl.filters().work_modes.contains(mode) {
                ctl.toggle(FilterFamily::WorkMode, mode.label());
            }
        }
        for cat in &self.category {
            if !ctl.filters().categories.contains(cat) {
                ctl.toggle_multi_select("category", cat);
            }
        }

        if self.paid {
            ctl.set_scalar(ScalarUpdate::IsPaid(Some(true)));
        } else if self.unpaid {
            ctl.set_scalar(ScalarUpdate::IsPaid(Some(false)));
        }
        if self.featured {
            ctl.set_scalar(ScalarUpdate::FeaturedOnly(true));
        }
        if self.salary_min.is_some() {
            ctl.set_scalar(ScalarUpdate::SalaryMin(self.salary_min));
        }
        if self.salary_max.is_some() {
            ctl.set_scalar(ScalarUpdate::SalaryMax(self.salary_max));
        }
    }
}

/// Closest known value to `value`, if it is not itself known.
fn suggest<'a>(value: &str, known: &'a [String]) -> Option<&'a str> {
    if known.iter().any(|k| k == value) {
        return None;
    }
    let needle = value.to_lowercase();
    known
        .iter()
        .map(|k| (k, strsim::normalized_levenshtein(&needle, &k.to_lowercase())))
        .filter(|(_, score)| *score >= 0.6)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(k, _)| k.as_str())
}

/// Unknown values are still applied; this only warns.
fn hint(family: &str, value: &str, known: &[String]) {
    if family == "location" && (value.trim().is_empty() || value == controller::ALL_LOCATIONS) {
        return;
    }
    if known.iter().any(|k| k == value) {
        return;
    }
    match suggest(value, known) {
        Some(close) => eprintln!("No {} '{}' in the catalog. Did you mean '{}'?", family, value, close),
        None => eprintln!("No {} '{}' in the catalog.", family, value),
    }
}

fn init_logging(settings: &Settings, to_file: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_level));

    if to_file {
        // The browser owns the terminal, so logs go to a file.
        let path = config::log_file();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file: {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load().context("Failed to load configuration")?;
    init_logging(&settings, matches!(cli.command, Commands::Browse { .. }))?;

    let catalog = cli.catalog.clone().or_else(|| settings.catalog_path.clone());
    let store = ListingStore::open(catalog.as_deref()).with_context(|| match &catalog {
        Some(path) => format!("Failed to load catalog {}", path.display()),
        None => "Failed to load bundled catalog".to_string(),
    })?;
    tracing::debug!(source = ?store.source(), jobs = store.jobs().len(), "catalog ready");

    match cli.command {
        Commands::List { filters, sort } => {
            let mut ctl = FilterController::new(sort.unwrap_or(settings.default_sort));
            filters.apply(&mut ctl, &store);
            let jobs = query::query(store.jobs(), ctl.filters(), ctl.sort_key());
            print_jobs(&jobs, &ctl);
        }

        Commands::Show { id } => match store.get_job(&id) {
            Some(job) => print_job(&store, job),
            None => println!("Job #{} not found.", id),
        },

        Commands::Companies { command } => match command.unwrap_or(CompanyCommands::List) {
            CompanyCommands::List => {
                let companies = store.companies();
                if companies.is_empty() {
                    println!("No companies found.");
                } else {
                    println!("{:<18} {:<22} {:<22} {:<18} {:>5}", "ID", "NAME", "INDUSTRY", "LOCATION", "OPEN");
                    println!("{}", "-".repeat(89));
                    for company in companies {
                        println!(
                            "{:<18} {:<22} {:<22} {:<18} {:>5}",
                            truncate(&company.id, 16),
                            truncate(&company.name, 20),
                            truncate(&company.industry, 20),
                            truncate(&company.location, 16),
                            company.open_positions
                        );
                    }
                }
            }

            CompanyCommands::Show { name } => match store.find_company(&name) {
                Some(company) => {
                    let verified = if company.verified { " (verified)" } else { "" };
                    println!("{}{}", company.name, verified);
                    println!("Industry: {}", company.industry);
                    println!("Location: {}", company.location);
                    println!("Size: {} employees", company.size);
                    if let Some(founded) = company.founded {
                        println!("Founded: {}", founded);
                    }
                    if let Some(website) = &company.website {
                        println!("Website: {}", website);
                    }
                    if let Some(logo) = &company.logo {
                        println!("Logo: {}", logo);
                    }
                    println!("\n{}", textwrap::fill(&company.description, 78));

                    let jobs = store.jobs_for_company(company);
                    if !jobs.is_empty() {
                        println!("\nJobs ({}):", jobs.len());
                        for job in jobs {
                            println!("  #{} - {} ({})", job.id, job.title, job.employment_kind);
                        }
                    }
                }
                None => {
                    println!("Company '{}' not found.", name);
                }
            },
        },

        Commands::Categories => {
            let counts = store.category_counts();
            if counts.is_empty() {
                println!("No categories found.");
            } else {
                println!("{:<20} {:>5}", "CATEGORY", "JOBS");
                println!("{}", "-".repeat(26));
                for (category, count) in counts {
                    println!("{:<20} {:>5}", truncate(&category, 18), count);
                }
            }
        }

        Commands::Browse { filters, sort, view } => {
            let session = browse_session(
                Arc::new(store),
                &filters,
                sort.unwrap_or(settings.default_sort),
                view.unwrap_or(settings.view_mode),
            );
            tui::run_browse(session)?;
        }
    }

    Ok(())
}

/// Session for the browser, seeded from the command-line filters.
fn browse_session(store: Arc<ListingStore>, filters: &FilterArgs, sort: SortKey, view: ViewMode) -> Session {
    let mut session = Session::new(Arc::clone(&store), sort, view);
    filters.apply(&mut session.controller, &store);
    session
}

fn print_jobs(jobs: &[&JobPosting], ctl: &FilterController) {
    if jobs.is_empty() {
        println!("No jobs found.");
        println!("Try adjusting your filters or search criteria, or drop them to see every listing.");
        return;
    }

    println!(
        "{:<5} {:<17} {:<30} {:<18} {:<10} {:>24}",
        "ID", "TYPE", "TITLE", "COMPANY", "LOCATION", "SALARY"
    );
    println!("{}", "-".repeat(109));
    for job in jobs {
        let marker = if job.featured { "*" } else { "" };
        println!(
            "{:<5} {:<17} {:<30} {:<18} {:<10} {:>24}",
            format!("{}{}", job.id, marker),
            job.employment_kind,
            truncate(&job.title, 28),
            truncate(&job.company, 16),
            truncate(job.location_key(), 10),
            truncate(&job.salary_display(), 24)
        );
    }

    let mut summary = format!("\n{} jobs found", jobs.len());
    let active = ctl.active_filter_count();
    if active > 0 {
        summary.push_str(&format!(" ({} filters active)", active));
    }
    summary.push_str(&format!(", sorted by {}", ctl.sort_key()));
    println!("{}", summary);
}

fn print_job(store: &ListingStore, job: &JobPosting) {
    println!("Job #{}", job.id);
    println!("Title: {}", job.title);
    println!("Company: {}", job.company);
    println!("Location: {}", job.location);
    println!("Type: {} / {}", job.employment_kind, job.work_mode);
    println!("Category: {}", job.category);
    println!("Salary: {}", job.salary_display());
    println!("Posted: {} ({})", job.posted_date, job.posted_ago(chrono::Utc::now()));
    if let Some(deadline) = &job.deadline {
        let closed = job
            .deadline_at()
            .is_some_and(|d| d < chrono::Utc::now());
        println!("Deadline: {}{}", deadline, if closed { " (closed)" } else { "" });
    }
    println!("Applicants: {}", job.applicant_count);
    if job.featured {
        println!("Featured");
    }
    if !job.tags.is_empty() {
        println!("Tags: {}", job.tags_display());
    }

    println!("\n{}", textwrap::fill(&job.description, 78));
    for (heading, items) in [("Requirements", &job.requirements), ("Benefits", &job.benefits)] {
        if !items.is_empty() {
            println!("\n{}:", heading);
            for item in items {
                println!("  - {}", item);
            }
        }
    }

    if let Some(company) = store.company_for(job) {
        println!("\n--- About {} ---", company.name);
        println!("{} · {} employees · {} open positions", company.industry, company.size, company.open_positions);
        println!("{}", textwrap::fill(&company.description, 78));
    }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_suggest_close_match() {
        let locations = known(&["Burgas", "Plovdiv", "Remote", "Sofia", "Varna"]);
        assert_eq!(suggest("Sofa", &locations), Some("Sofia"));
        assert_eq!(suggest("sofia", &locations), Some("Sofia"));
        assert_eq!(suggest("Sofia", &locations), None);
        assert_eq!(suggest("Tokyo", &locations), None);
    }

    #[test]
    fn test_filter_args_drive_controller() {
        let store = ListingStore::bundled().unwrap();
        let args = FilterArgs {
            query: Some("developer".to_string()),
            location: Some("Sofia".to_string()),
            kind: vec![EmploymentKind::Internship, EmploymentKind::Internship],
            category: vec!["Technology".to_string()],
            paid: true,
            salary_min: Some(1000),
            ..Default::default()
        };
        let mut ctl = FilterController::default();
        args.apply(&mut ctl, &store);

        let f = ctl.filters();
        assert_eq!(f.query.as_deref(), Some("developer"));
        assert_eq!(f.locations.len(), 1);
        assert_eq!(f.employment_kinds.len(), 1);
        assert_eq!(f.is_paid, Some(true));
        assert_eq!(ctl.active_filter_count(), 5);
    }

    #[test]
    fn test_location_all_clears() {
        let store = ListingStore::bundled().unwrap();
        let args = FilterArgs {
            location: Some("All".to_string()),
            ..Default::default()
        };
        let mut ctl = FilterController::default();
        args.apply(&mut ctl, &store);
        assert!(ctl.filters().is_empty());
    }

    #[test]
    fn test_browse_session_starts_with_cli_filters() {
        let store = Arc::new(ListingStore::bundled().unwrap());
        let args = FilterArgs {
            category: vec!["Finance".to_string()],
            featured: true,
            ..Default::default()
        };
        let mut session = browse_session(Arc::clone(&store), &args, SortKey::HighestSalary, ViewMode::List);
        assert_eq!(session.controller.active_filter_count(), 2);
        assert_eq!(session.controller.sort_key(), SortKey::HighestSalary);
        assert_eq!(session.view_mode, ViewMode::List);
        assert!(session.view().iter().all(|j| j.category == "Finance" && j.featured));
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Разработчик на софтуер", 10), "Разрабо...");
    }
}
