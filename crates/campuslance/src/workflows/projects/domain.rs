use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::outbound::StoredFileRef;

/// Identifier wrapper for published projects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(pub String);

/// Identifier wrapper for student profiles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StudentId(pub String);

/// Identifier wrapper for company profiles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompanyId(pub String);

/// Identifier wrapper for application records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Identifier wrapper for payment records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentId(pub String);

/// Identifier wrapper for authenticated users (auth subject, any role).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Closed category list for project listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectCategory {
    WebDevelopment,
    MobileDevelopment,
    DataScience,
    AiMl,
    CloudDevops,
    BackendDevelopment,
    FrontendDevelopment,
    FullStack,
    Blockchain,
    Iot,
    Cybersecurity,
    Other,
}

impl ProjectCategory {
    pub const fn label(self) -> &'static str {
        match self {
            ProjectCategory::WebDevelopment => "Web Development",
            ProjectCategory::MobileDevelopment => "Mobile Development",
            ProjectCategory::DataScience => "Data Science",
            ProjectCategory::AiMl => "AI/ML",
            ProjectCategory::CloudDevops => "Cloud & DevOps",
            ProjectCategory::BackendDevelopment => "Backend Development",
            ProjectCategory::FrontendDevelopment => "Frontend Development",
            ProjectCategory::FullStack => "Full Stack",
            ProjectCategory::Blockchain => "Blockchain",
            ProjectCategory::Iot => "IoT",
            ProjectCategory::Cybersecurity => "Cybersecurity",
            ProjectCategory::Other => "Other",
        }
    }
}

/// Fixed project duration buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectDuration {
    OneWeek,
    TwoWeeks,
    OneMonth,
    TwoMonths,
    ThreeMonths,
    SixMonths,
    OneYear,
}

impl ProjectDuration {
    pub const fn label(self) -> &'static str {
        match self {
            ProjectDuration::OneWeek => "1 week",
            ProjectDuration::TwoWeeks => "2 weeks",
            ProjectDuration::OneMonth => "1 month",
            ProjectDuration::TwoMonths => "2 months",
            ProjectDuration::ThreeMonths => "3 months",
            ProjectDuration::SixMonths => "6 months",
            ProjectDuration::OneYear => "1 year",
        }
    }
}

/// Project lifecycle states.
///
/// `Submitted` and `Approved` are held only transiently: a submission moves
/// the project straight to `UnderReview`, and approval folds directly into
/// `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectStatus {
    Open,
    Assigned,
    InProgress,
    Submitted,
    UnderReview,
    RevisionRequested,
    Approved,
    Completed,
    Disputed,
    Cancelled,
    Closed,
}

impl ProjectStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ProjectStatus::Open => "open",
            ProjectStatus::Assigned => "assigned",
            ProjectStatus::InProgress => "in-progress",
            ProjectStatus::Submitted => "submitted",
            ProjectStatus::UnderReview => "under-review",
            ProjectStatus::RevisionRequested => "revision-requested",
            ProjectStatus::Approved => "approved",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Disputed => "disputed",
            ProjectStatus::Cancelled => "cancelled",
            ProjectStatus::Closed => "closed",
        }
    }

    /// States that require an assigned student.
    pub const fn requires_assignee(self) -> bool {
        matches!(
            self,
            ProjectStatus::Assigned
                | ProjectStatus::InProgress
                | ProjectStatus::Submitted
                | ProjectStatus::UnderReview
                | ProjectStatus::RevisionRequested
                | ProjectStatus::Approved
                | ProjectStatus::Completed
                | ProjectStatus::Disputed
        )
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            ProjectStatus::Completed
                | ProjectStatus::Cancelled
                | ProjectStatus::Closed
                | ProjectStatus::Disputed
        )
    }
}

const TITLE_MAX: usize = 100;
const DESCRIPTION_MAX: usize = 5000;

/// Company-supplied payload for publishing a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDraft {
    pub title: String,
    pub description: String,
    pub category: ProjectCategory,
    pub required_skills: Vec<String>,
    pub budget_min: u64,
    pub budget_max: u64,
    pub duration: ProjectDuration,
    pub deadline: DateTime<Utc>,
}

impl ProjectDraft {
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), ValidationError> {
        let title = self.title.trim();
        if title.is_empty() || title.len() > TITLE_MAX {
            return Err(ValidationError::TitleLength { max: TITLE_MAX });
        }
        let description = self.description.trim();
        if description.is_empty() || description.len() > DESCRIPTION_MAX {
            return Err(ValidationError::DescriptionLength {
                max: DESCRIPTION_MAX,
            });
        }
        if self.required_skills.iter().all(|s| s.trim().is_empty()) {
            return Err(ValidationError::NoRequiredSkills);
        }
        if self.budget_min > self.budget_max {
            return Err(ValidationError::BudgetRange {
                min: self.budget_min,
                max: self.budget_max,
            });
        }
        if self.deadline <= now {
            return Err(ValidationError::DeadlineNotFuture);
        }
        Ok(())
    }
}

/// Input validation failures shared by the marketplace drafts and actions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("title must be 1-{max} characters")]
    TitleLength { max: usize },
    #[error("description must be 1-{max} characters")]
    DescriptionLength { max: usize },
    #[error("at least one required skill is needed")]
    NoRequiredSkills,
    #[error("budget_min ({min}) cannot exceed budget_max ({max})")]
    BudgetRange { min: u64, max: u64 },
    #[error("deadline must be in the future")]
    DeadlineNotFuture,
    #[error("cover letter must be {min}-{max} characters")]
    CoverLetterLength { min: usize, max: usize },
    #[error("proposed price must be greater than zero")]
    ProposedPriceZero,
    #[error("{field} must be {min}-{max} characters")]
    ReasonLength {
        field: &'static str,
        min: usize,
        max: usize,
    },
    #[error("provide at least one file or one external link")]
    EmptySubmission,
    #[error("too many files: {found} exceeds the limit of {max}")]
    TooManyFiles { found: usize, max: usize },
    #[error("refund amount {requested} exceeds the original payment {original}")]
    RefundExceedsOriginal { requested: u64, original: u64 },
    #[error("project has no assigned student")]
    NoAssignedStudent,
}

/// Review state of a single work submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubmissionStatus {
    Submitted,
    Approved,
    RevisionRequested,
    Rejected,
}

impl SubmissionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            SubmissionStatus::Submitted => "submitted",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::RevisionRequested => "revision-requested",
            SubmissionStatus::Rejected => "rejected",
        }
    }
}

/// One delivered iteration of the work. Versions start at 1 and are never
/// reused, even across revision cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub version: u32,
    pub files: Vec<StoredFileRef>,
    pub links: Vec<String>,
    pub message: String,
    pub submitted_by: StudentId,
    pub submitted_at: DateTime<Utc>,
    pub status: SubmissionStatus,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<UserId>,
    pub feedback: Option<String>,
}

/// Pointer to the submission currently in play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentSubmission {
    pub version: u32,
    pub submission_id: String,
    pub status: SubmissionStatus,
}

/// Audit entry for a revision request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionEntry {
    pub submission_version: u32,
    pub requested_by: UserId,
    pub reason: String,
    pub requested_at: DateTime<Utc>,
}
