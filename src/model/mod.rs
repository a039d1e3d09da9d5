//! Domain model
//!
//! Persisted record types for the onboarding CRM. Derived workflow state
//! (current step, status, blocked) is intentionally absent from these types;
//! see [`crate::engine::steps`].

mod audit;
mod client;
mod compliance;
mod cost;
mod play_console;
mod task;
mod user;

pub use audit::{AuditAction, AuditEntry};
pub use client::{Client, CompanyType, OnboardingStatus, PublishingStatus};
pub use compliance::{CertStatus, Certificate, ComplianceDocument};
pub use cost::OrganizationCost;
pub use play_console::PlayConsoleStatus;
pub use task::{
    AppDevelopmentTask, PaymentMilestone, PlayStoreAsset, Responsibility, SubmissionReview,
    TaskStatus, WebsiteTask,
};
pub use user::{TeamMemberView, User, UserRole};
