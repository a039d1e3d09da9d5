//! Task & Milestone Records
//!
//! The status-based task model that runs alongside the boolean stage flags on
//! [`Client`](crate::model::Client). Website, app-development, and store-asset
//! tasks share one status vocabulary; blocked tasks carry a permanent
//! CLIENT/COMPANY responsibility tag. Payment milestones are explicit,
//! amount-bearing eligibility records independent of the flag workflow.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Shared status vocabulary for all task rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    NotStarted,
    PendingClient,
    PendingVerification,
    InProgress,
    Completed,
    Failed,
    Blocked,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "NOT_STARTED",
            Self::PendingClient => "PENDING_CLIENT",
            Self::PendingVerification => "PENDING_VERIFICATION",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Blocked => "BLOCKED",
        }
    }

    /// Statuses that mean progress is waiting on the client
    pub fn waits_on_client(&self) -> bool {
        matches!(self, Self::PendingClient | Self::Blocked)
    }
}

/// Whose fault a blocking event is. Written once, never re-derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Responsibility {
    Client,
    Company,
}

impl Responsibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "CLIENT",
            Self::Company => "COMPANY",
        }
    }
}

/// A website-build task (design, development, search-console setup, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebsiteTask {
    pub id: Uuid,
    pub client_id: Uuid,
    pub name: String,
    pub status: TaskStatus,
    pub responsibility: Option<Responsibility>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WebsiteTask {
    pub fn new(client_id: Uuid, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            client_id,
            name: name.into(),
            status: TaskStatus::NotStarted,
            responsibility: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// An app-development task (UI, build, testing, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppDevelopmentTask {
    pub id: Uuid,
    pub client_id: Uuid,
    pub name: String,
    pub status: TaskStatus,
    pub responsibility: Option<Responsibility>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AppDevelopmentTask {
    pub fn new(client_id: Uuid, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            client_id,
            name: name.into(),
            status: TaskStatus::NotStarted,
            responsibility: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A store-upload asset (icon set, screenshots, APK, privacy policy page)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayStoreAsset {
    pub id: Uuid,
    pub client_id: Uuid,
    pub name: String,
    pub url: Option<String>,
    pub status: TaskStatus,
    pub responsibility: Option<Responsibility>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Review/submission state of the app with the store, one row per client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionReview {
    pub client_id: Uuid,
    pub status: TaskStatus,
    pub published: bool,
    pub submitted_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl SubmissionReview {
    pub fn new(client_id: Uuid) -> Self {
        Self {
            client_id,
            status: TaskStatus::NotStarted,
            published: false,
            submitted_at: None,
            notes: None,
            updated_at: Utc::now(),
        }
    }
}

/// An explicit, named, amount-bearing payment-eligibility record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMilestone {
    pub id: Uuid,
    pub client_id: Uuid,
    pub name: String,
    pub amount: Decimal,
    pub eligible_for_payment: bool,
    pub released: bool,
    pub released_at: Option<DateTime<Utc>>,
    pub released_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl PaymentMilestone {
    pub fn new(client_id: Uuid, name: impl Into<String>, amount: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_id,
            name: name.into(),
            amount,
            eligible_for_payment: false,
            released: false,
            released_at: None,
            released_by: None,
            created_at: Utc::now(),
        }
    }
}
