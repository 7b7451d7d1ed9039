//! Work delivery and review cycle for assigned projects.

pub mod coordinator;
pub mod router;

pub use coordinator::{
    AttachmentUpload, CurrentSubmissionView, SubmissionError, SubmissionHistoryView,
    WorkSubmission, WorkSubmissionCoordinator,
};
pub use router::workspace_router;
