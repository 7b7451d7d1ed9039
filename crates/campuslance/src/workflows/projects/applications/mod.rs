//! Student applications and the company-side selection workflow.

pub mod domain;
pub mod repository;
pub mod router;
pub mod selection;

#[cfg(test)]
mod tests;

pub use domain::{
    ApplicationDraft, ApplicationError, ApplicationId, ApplicationRecord, ApplicationStats,
    ApplicationStatus, ApplicationStatusView, EstimatedTime, StudentSnapshot,
};
pub use repository::ApplicationRepository;
pub use router::application_router;
pub use selection::{SelectionCoordinator, SelectionError};
