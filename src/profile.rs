//! Researcher profile records and their funded projects.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A funded project (grant) attached to a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Project {
    /// Registry project number.
    pub project_number: String,
    /// Project abstract.
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,
    /// Keyword terms attached by the registry.
    #[serde(default)]
    pub terms: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Administering agency / institute code.
    #[serde(default)]
    pub agency: Option<String>,
    /// Grant activity code (e.g. `R01`).
    #[serde(default)]
    pub activity_code: Option<String>,
}

impl Project {
    /// Whether the project is active on `date`.
    ///
    /// Projects without both a start and an end date are never considered
    /// funded.
    pub fn is_funded_on(&self, date: NaiveDate) -> bool {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => start <= date && date <= end,
            _ => false,
        }
    }
}

/// One researcher profile: structured labels plus free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProfileRecord {
    pub name: String,
    pub school: String,
    /// One department, or a comma-separated sorted list after merging.
    pub department: String,
    #[serde(default)]
    pub about: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub profile_url: Option<String>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub has_funding: bool,
    /// Id of this profile's vector in the vector index. Assigned by the
    /// population workflow after the vector has been appended.
    #[serde(default)]
    pub embedding_id: Option<u64>,
}

impl ProfileRecord {
    /// Identity used to detect the same person listed by several departments.
    pub fn identity(&self) -> (&str, &str, Option<&str>) {
        (&self.name, &self.school, self.email.as_deref())
    }

    /// Fold another department listing of the same person into this record.
    ///
    /// Departments are kept as a sorted, de-duplicated, comma-joined list.
    pub fn merge_department(&mut self, department: &str) {
        let mut departments: Vec<&str> = self
            .department
            .split(',')
            .chain(std::iter::once(department))
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .collect();
        departments.sort_unstable();
        departments.dedup();
        self.department = departments.join(",");
    }

    /// Recompute `has_funding` from the project dates.
    pub fn refresh_funding(&mut self, today: NaiveDate) {
        self.has_funding = self.projects.iter().any(|p| p.is_funded_on(today));
    }

    /// Free-text fields searched by exact-word queries.
    pub fn free_text_fields(&self) -> impl Iterator<Item = &str> {
        self.about.as_deref().into_iter().chain(
            self.projects.iter().flat_map(|p| {
                p.abstract_text
                    .as_deref()
                    .into_iter()
                    .chain(p.terms.as_deref())
            }),
        )
    }
}
