//! Metadata predicates that restrict a search.

use serde::{Deserialize, Serialize};

use crate::profile::ProfileRecord;

/// Structured restrictions applied by the metadata store.
///
/// Absent and empty-string options are not applied. `has_funding` only
/// restricts when `true`; `false` means "funded or not".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilter {
    /// Exact school match.
    #[serde(default)]
    pub school: Option<String>,
    /// Case-insensitive substring of the department list.
    #[serde(default)]
    pub department: Option<String>,
    /// Exact match against any project's activity code.
    #[serde(default)]
    pub activity_code: Option<String>,
    /// Exact match against any project's administering agency.
    #[serde(default)]
    pub agency: Option<String>,
    /// Keep only profiles with an active funded project.
    #[serde(default)]
    pub has_funding: bool,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl SearchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_school(mut self, school: impl Into<String>) -> Self {
        self.school = Some(school.into());
        self
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn with_activity_code(mut self, activity_code: impl Into<String>) -> Self {
        self.activity_code = Some(activity_code.into());
        self
    }

    pub fn with_agency(mut self, agency: impl Into<String>) -> Self {
        self.agency = Some(agency.into());
        self
    }

    pub fn with_has_funding(mut self, has_funding: bool) -> Self {
        self.has_funding = has_funding;
        self
    }

    pub fn school(&self) -> Option<&str> {
        non_empty(&self.school)
    }

    pub fn department(&self) -> Option<&str> {
        non_empty(&self.department)
    }

    pub fn activity_code(&self) -> Option<&str> {
        non_empty(&self.activity_code)
    }

    pub fn agency(&self) -> Option<&str> {
        non_empty(&self.agency)
    }

    /// True when no predicate would be applied.
    pub fn is_empty(&self) -> bool {
        self.school().is_none()
            && self.department().is_none()
            && self.activity_code().is_none()
            && self.agency().is_none()
            && !self.has_funding
    }

    /// Whether `record` satisfies every applied predicate.
    pub fn matches(&self, record: &ProfileRecord) -> bool {
        if let Some(school) = self.school()
            && record.school != school
        {
            return false;
        }

        if let Some(department) = self.department()
            && !record
                .department
                .to_lowercase()
                .contains(&department.to_lowercase())
        {
            return false;
        }

        if let Some(code) = self.activity_code()
            && !record
                .projects
                .iter()
                .any(|p| p.activity_code.as_deref() == Some(code))
        {
            return false;
        }

        if let Some(agency) = self.agency()
            && !record
                .projects
                .iter()
                .any(|p| p.agency.as_deref() == Some(agency))
        {
            return false;
        }

        !self.has_funding || record.has_funding
    }
}
