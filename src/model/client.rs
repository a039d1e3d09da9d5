//! Client Entity
//!
//! The root record of the onboarding workflow. Carries the per-stage boolean
//! flags the state deriver reads. The current step, status, and blocked flag
//! are NEVER stored here — they are re-derived on every read so the displayed
//! step can never drift from the underlying facts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Legal structure of the client company
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompanyType {
    Individual,
    Firm,
    PvtLtd,
}

impl CompanyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Individual => "INDIVIDUAL",
            Self::Firm => "FIRM",
            Self::PvtLtd => "PVT_LTD",
        }
    }
}

/// Where the app stands with the store review pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublishingStatus {
    NotSubmitted,
    InReview,
    Production,
}

/// Intake lifecycle of the client application itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OnboardingStatus {
    Draft,
    Submitted,
    Verified,
    Rejected,
}

/// A company being onboarded onto app-store publishing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub legal_name: String,
    /// PAN-style tax id, uppercase, 5 letters + 4 digits + 1 letter
    pub pan: String,
    pub company_type: CompanyType,
    pub email: String,
    pub phone: Option<String>,

    // Stage flags. The deriver is the only consumer; mutation handlers are
    // the only writers.
    pub website_design_done: bool,
    pub website_dev_done: bool,
    pub website_search_console_done: bool,
    pub app_ui_done: bool,
    pub app_dev_done: bool,
    pub app_testing_done: bool,
    pub upload_assets_done: bool,
    pub upload_screenshots_done: bool,
    pub upload_apk_done: bool,
    pub privacy_policy_done: bool,
    pub app_approved: bool,
    pub published: bool,
    pub website_verified: bool,

    pub website_url: Option<String>,
    pub assets_url: Option<String>,
    pub apk_url: Option<String>,
    pub privacy_policy_page_url: Option<String>,
    pub live_url: Option<String>,

    pub publishing_status: PublishingStatus,
    pub onboarding_status: OnboardingStatus,

    /// Team member who owns this record; drives access scoping
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    /// New client at stage 1, all flags down, all sub-entities empty.
    pub fn new(
        legal_name: String,
        pan: String,
        company_type: CompanyType,
        email: String,
        phone: Option<String>,
        created_by: Uuid,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            legal_name,
            pan,
            company_type,
            email,
            phone,
            website_design_done: false,
            website_dev_done: false,
            website_search_console_done: false,
            app_ui_done: false,
            app_dev_done: false,
            app_testing_done: false,
            upload_assets_done: false,
            upload_screenshots_done: false,
            upload_apk_done: false,
            privacy_policy_done: false,
            app_approved: false,
            published: false,
            website_verified: false,
            website_url: None,
            assets_url: None,
            apk_url: None,
            privacy_policy_page_url: None,
            live_url: None,
            publishing_status: PublishingStatus::NotSubmitted,
            onboarding_status: OnboardingStatus::Draft,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// A domain counts as acquired when the site is verified or a URL exists.
    pub fn has_domain(&self) -> bool {
        self.website_verified
            || self
                .website_url
                .as_deref()
                .is_some_and(|url| !url.is_empty())
    }
}
