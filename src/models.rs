use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EmploymentKind {
    Internship,
    #[serde(rename = "Entry Level")]
    EntryLevel,
    #[serde(rename = "Graduate Program")]
    GraduateProgram,
}

impl EmploymentKind {
    pub const ALL: [EmploymentKind; 3] = [
        EmploymentKind::Internship,
        EmploymentKind::EntryLevel,
        EmploymentKind::GraduateProgram,
    ];

    pub fn label(self) -> &'static str {
        match self {
            EmploymentKind::Internship => "Internship",
            EmploymentKind::EntryLevel => "Entry Level",
            EmploymentKind::GraduateProgram => "Graduate Program",
        }
    }
}

impl fmt::Display for EmploymentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for EmploymentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "internship" => Ok(EmploymentKind::Internship),
            "entrylevel" => Ok(EmploymentKind::EntryLevel),
            "graduateprogram" | "graduate" => Ok(EmploymentKind::GraduateProgram),
            _ => Err(format!(
                "unknown job type '{}' (expected: Internship, Entry Level, Graduate Program)",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WorkMode {
    Remote,
    #[serde(rename = "On-site")]
    OnSite,
    Hybrid,
}

impl WorkMode {
    pub const ALL: [WorkMode; 3] = [WorkMode::Remote, WorkMode::OnSite, WorkMode::Hybrid];

    pub fn label(self) -> &'static str {
        match self {
            WorkMode::Remote => "Remote",
            WorkMode::OnSite => "On-site",
            WorkMode::Hybrid => "Hybrid",
        }
    }
}

impl fmt::Display for WorkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for WorkMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "remote" => Ok(WorkMode::Remote),
            "onsite" => Ok(WorkMode::OnSite),
            "hybrid" => Ok(WorkMode::Hybrid),
            _ => Err(format!(
                "unknown work type '{}' (expected: Remote, On-site, Hybrid)",
                s
            )),
        }
    }
}

/// Lowercases and drops separators so "Entry Level", "entry-level" and
/// "entry_level" all parse the same.
fn normalize_label(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "BGN")]
    Bgn,
    #[serde(rename = "EUR")]
    Eur,
    #[serde(rename = "USD")]
    Usd,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Currency::Bgn => "BGN",
            Currency::Eur => "EUR",
            Currency::Usd => "USD",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayPeriod {
    Month,
    Hour,
}

impl fmt::Display for PayPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PayPeriod::Month => "month",
            PayPeriod::Hour => "hour",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compensation {
    #[serde(default)]
    pub min: Option<u32>,
    #[serde(default)]
    pub max: Option<u32>,
    pub currency: Currency,
    pub period: PayPeriod,
}

impl Compensation {
    /// Upper bound if known, else lower bound, else zero. A zero bound
    /// counts as unknown.
    pub fn sort_value(&self) -> u32 {
        self.max
            .filter(|&v| v > 0)
            .or(self.min.filter(|&v| v > 0))
            .unwrap_or(0)
    }

    /// "1,200 - 1,800 BGN/month", or just the bound that exists.
    pub fn display(&self) -> String {
        let min = self.min.filter(|&v| v > 0).map(group_thousands);
        let max = self.max.filter(|&v| v > 0).map(group_thousands);
        let range = match (min, max) {
            (Some(min), Some(max)) => format!("{} - {}", min, max),
            (Some(one), None) | (None, Some(one)) => one,
            (None, None) => String::new(),
        };
        format!("{} {}/{}", range, self.currency, self.period)
            .trim_start()
            .to_string()
    }
}

fn group_thousands(value: u32) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: String,
    pub title: String,
    pub company: String,
    /// Explicit reference to `CompanyProfile::id`. Older fixtures only carry
    /// the display name in `company`.
    #[serde(default)]
    pub company_id: Option<String>,
    #[serde(default)]
    pub company_logo: Option<String>,
    pub location: String,
    pub employment_kind: EmploymentKind,
    pub work_mode: WorkMode,
    #[serde(default)]
    pub compensation: Option<Compensation>,
    pub is_paid: bool,
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub category: String,
    pub posted_date: String,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub applicant_count: u32,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub verified: bool,
}

pub const VISIBLE_TAGS: usize = 4;

impl JobPosting {
    /// Text before the first comma of `location`, trimmed.
    pub fn location_key(&self) -> &str {
        location_key(&self.location)
    }

    pub fn posted_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.posted_date)
    }

    /// How long ago the posting went up, e.g. "3 days ago". Falls back to the
    /// raw date when it does not parse.
    pub fn posted_ago(&self, now: DateTime<Utc>) -> String {
        let Some(posted) = self.posted_at() else {
            return self.posted_date.clone();
        };
        let days = (now - posted).num_days();
        let (n, unit) = match days {
            ..=0 => return "today".to_string(),
            1..=29 => (days, "day"),
            30..=364 => (days / 30, "month"),
            _ => (days / 365, "year"),
        };
        if n == 1 {
            format!("1 {} ago", unit)
        } else {
            format!("{} {}s ago", n, unit)
        }
    }

    pub fn deadline_at(&self) -> Option<DateTime<Utc>> {
        self.deadline.as_deref().and_then(parse_timestamp)
    }

    pub fn salary_sort_value(&self) -> u32 {
        self.compensation.as_ref().map_or(0, Compensation::sort_value)
    }

    /// Everything the free-text search looks at, lowercased.
    pub fn searchable_text(&self) -> String {
        format!(
            "{} {} {} {}",
            self.title,
            self.company,
            self.description,
            self.tags.join(" ")
        )
        .to_lowercase()
    }

    /// First few tags plus how many were left out.
    pub fn visible_tags(&self) -> (&[String], usize) {
        let shown = self.tags.len().min(VISIBLE_TAGS);
        (&self.tags[..shown], self.tags.len() - shown)
    }

    pub fn tags_display(&self) -> String {
        let (shown, hidden) = self.visible_tags();
        let mut out = shown.join(", ");
        if hidden > 0 {
            out.push_str(&format!(" +{} more", hidden));
        }
        out
    }

    pub fn salary_display(&self) -> String {
        match &self.compensation {
            Some(comp) => comp.display(),
            None if self.is_paid => "Paid".to_string(),
            None => "Unpaid".to_string(),
        }
    }

    /// Logo stand-in: the first letter of the company name.
    pub fn company_initial(&self) -> char {
        self.company.chars().next().unwrap_or('?')
    }
}

pub fn location_key(location: &str) -> &str {
    location.split(',').next().unwrap_or("").trim()
}

/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub logo: Option<String>,
    pub description: String,
    #[serde(default)]
    pub website: Option<String>,
    pub location: String,
    pub size: String,
    pub industry: String,
    #[serde(default)]
    pub founded: Option<u16>,
    #[serde(default)]
    pub open_positions: u32,
    #[serde(default)]
    pub verified: bool,
}
