//! Marketplace core for student/company project work.
//!
//! The `workflows` tree holds the domain records and coordinators: project
//! publication and assignment, application selection, work submission review,
//! and escrow-style payment settlement. Storage and outbound collaborators
//! (notifications, payment gateway, file store) are traits so the service
//! shell can wire real or in-memory implementations.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
