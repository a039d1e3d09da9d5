//! Step Mutation Handlers
//!
//! One typed payload per workflow step. Each handler validates its input
//! fail-fast (first violating field only) and then writes only the fields
//! belonging to that step. State never advances any other way.

use std::sync::OnceLock;

use chrono::Utc;
use regex::Regex;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{CrmError, Result};
use crate::model::{
    CertStatus, Certificate, Client, CompanyType, ComplianceDocument, OnboardingStatus,
    OrganizationCost, PlayConsoleStatus,
};

fn pan_regex() -> &'static Regex {
    static PAN: OnceLock<Regex> = OnceLock::new();
    PAN.get_or_init(|| Regex::new(r"^[A-Z]{5}[0-9]{4}[A-Z]$").expect("valid PAN pattern"))
}

pub(crate) fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email pattern"))
}

/// Step-1 payload: client identity
#[derive(Debug, Clone, Deserialize)]
pub struct ClientInfoInput {
    pub legal_name: String,
    pub pan: String,
    pub company_type: CompanyType,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl ClientInfoInput {
    pub fn validate(&self) -> Result<()> {
        if self.legal_name.trim().chars().count() < 2 {
            return Err(CrmError::validation(
                "legal_name",
                "must be at least 2 characters",
            ));
        }
        if !pan_regex().is_match(&self.pan) {
            return Err(CrmError::validation(
                "pan",
                "must be 5 uppercase letters, 4 digits, 1 uppercase letter",
            ));
        }
        if !email_regex().is_match(&self.email) {
            return Err(CrmError::validation("email", "must be a valid email"));
        }
        Ok(())
    }

    pub fn apply(&self, client: &mut Client) {
        client.legal_name = self.legal_name.trim().to_string();
        client.pan = self.pan.clone();
        client.company_type = self.company_type;
        client.email = self.email.clone();
        client.phone = self.phone.clone();
        client.updated_at = Utc::now();
    }
}

/// Steps 2 and 3 share one payload shape: a certificate status plus optional
/// document URL and registration number.
#[derive(Debug, Clone, Deserialize)]
pub struct CertificateInput {
    pub status: CertStatus,
    #[serde(default)]
    pub document_url: Option<String>,
    #[serde(default)]
    pub registration_number: Option<String>,
}

impl CertificateInput {
    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.document_url {
            if url.trim().is_empty() {
                return Err(CrmError::validation(
                    "document_url",
                    "must not be empty when provided",
                ));
            }
        }
        Ok(())
    }

    /// Write the certificate fields and stamp `last_verified_at` on approval.
    pub fn apply(&self, compliance: &mut ComplianceDocument, certificate: Certificate) {
        match certificate {
            Certificate::Msme => {
                compliance.msme_status = self.status;
                if self.document_url.is_some() {
                    compliance.msme_document_url = self.document_url.clone();
                }
                if self.registration_number.is_some() {
                    compliance.msme_registration_number = self.registration_number.clone();
                }
            }
            Certificate::Duns => {
                compliance.duns_status = self.status;
                if self.document_url.is_some() {
                    compliance.duns_document_url = self.document_url.clone();
                }
                if self.registration_number.is_some() {
                    compliance.duns_number = self.registration_number.clone();
                }
            }
        }
        if self.status == CertStatus::Approved {
            compliance.last_verified_at = Some(Utc::now());
        }
    }
}

/// Step-5 payload: Play Console account sub-flags
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlayConsoleInput {
    pub account_created: bool,
    pub account_paid: bool,
    pub identity_verified: bool,
    pub company_verified: bool,
    pub payment_profile_set: bool,
    pub developer_invited: bool,
    pub developer_invite_email: Option<String>,
}

impl PlayConsoleInput {
    pub fn validate(&self) -> Result<()> {
        if self.developer_invited {
            match &self.developer_invite_email {
                Some(email) if email_regex().is_match(email) => {}
                _ => {
                    return Err(CrmError::validation(
                        "developer_invite_email",
                        "must be a valid email when a developer is invited",
                    ))
                }
            }
        }
        Ok(())
    }

    /// Write the flags and recompute the stored `console_ready`
    /// denormalization through the same predicate the deriver uses.
    pub fn apply(&self, console: &mut PlayConsoleStatus) {
        console.account_created = self.account_created;
        console.account_paid = self.account_paid;
        console.identity_verified = self.identity_verified;
        console.company_verified = self.company_verified;
        console.payment_profile_set = self.payment_profile_set;
        console.developer_invited = self.developer_invited;
        console.developer_invite_email = self.developer_invite_email.clone();
        console.console_ready = console.ready();
    }
}

/// Step-6 payload: domain acquisition. The URL is relaxed — it may be empty
/// and needs no protocol prefix.
#[derive(Debug, Clone, Deserialize)]
pub struct DomainInput {
    #[serde(default)]
    pub website_url: String,
    #[serde(default)]
    pub website_verified: bool,
}

impl DomainInput {
    pub fn apply(&self, client: &mut Client) {
        client.website_url = Some(self.website_url.trim().to_string());
        client.website_verified = self.website_verified;
        client.updated_at = Utc::now();
    }
}

/// Step-7 payload: the parallel-work phase. Touches three records — console
/// sale fields, client flags/URLs, and the organization cost row — which the
/// service commits as one atomic store operation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ParallelWorkInput {
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

    pub assets_url: Option<String>,
    pub apk_url: Option<String>,
    pub privacy_policy_page_url: Option<String>,
    pub live_url: Option<String>,

    pub account_sale_complete: bool,
    pub account_sale_amount: Option<Decimal>,

    pub domain_cost: Option<Decimal>,
    pub other_costs: Option<Decimal>,
    pub cost_notes: Option<String>,
}

impl ParallelWorkInput {
    pub fn validate(&self) -> Result<()> {
        if let Some(amount) = self.account_sale_amount {
            if amount < Decimal::ZERO {
                return Err(CrmError::validation(
                    "account_sale_amount",
                    "must not be negative",
                ));
            }
        }
        if self.account_sale_complete && self.account_sale_amount.is_none() {
            return Err(CrmError::validation(
                "account_sale_amount",
                "required when the account sale is complete",
            ));
        }
        for (field, value) in [
            ("domain_cost", self.domain_cost),
            ("other_costs", self.other_costs),
        ] {
            if value.is_some_and(|v| v < Decimal::ZERO) {
                return Err(CrmError::validation(field, "must not be negative"));
            }
        }
        Ok(())
    }

    pub fn apply_to_client(&self, client: &mut Client) {
        client.website_design_done = self.website_design_done;
        client.website_dev_done = self.website_dev_done;
        client.website_search_console_done = self.website_search_console_done;
        client.app_ui_done = self.app_ui_done;
        client.app_dev_done = self.app_dev_done;
        client.app_testing_done = self.app_testing_done;
        client.upload_assets_done = self.upload_assets_done;
        client.upload_screenshots_done = self.upload_screenshots_done;
        client.upload_apk_done = self.upload_apk_done;
        client.privacy_policy_done = self.privacy_policy_done;
        client.app_approved = self.app_approved;
        client.published = self.published;
        if self.assets_url.is_some() {
            client.assets_url = self.assets_url.clone();
        }
        if self.apk_url.is_some() {
            client.apk_url = self.apk_url.clone();
        }
        if self.privacy_policy_page_url.is_some() {
            client.privacy_policy_page_url = self.privacy_policy_page_url.clone();
        }
        if self.live_url.is_some() {
            client.live_url = self.live_url.clone();
        }
        client.updated_at = Utc::now();
    }

    pub fn apply_to_console(&self, console: &mut PlayConsoleStatus) {
        console.account_sale_complete = self.account_sale_complete;
        if self.account_sale_amount.is_some() {
            console.account_sale_amount = self.account_sale_amount;
        }
    }

    pub fn apply_to_cost(&self, cost: &mut OrganizationCost) {
        if let Some(domain_cost) = self.domain_cost {
            cost.domain_cost = domain_cost;
        }
        if let Some(other_costs) = self.other_costs {
            cost.other_costs = other_costs;
        }
        if self.cost_notes.is_some() {
            cost.cost_notes = self.cost_notes.clone();
        }
    }
}

/// Typed per-step payloads for `update_step`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepUpdate {
    ClientInfo(ClientInfoInput),
    Msme(CertificateInput),
    Duns(CertificateInput),
    ReviewSubmit,
    PlayConsole(PlayConsoleInput),
    Domain(DomainInput),
    ParallelWork(ParallelWorkInput),
}

impl StepUpdate {
    /// The workflow step this payload belongs to
    pub fn step_number(&self) -> u8 {
        match self {
            Self::ClientInfo(_) => 1,
            Self::Msme(_) => 2,
            Self::Duns(_) => 3,
            Self::ReviewSubmit => 4,
            Self::PlayConsole(_) => 5,
            Self::Domain(_) => 6,
            Self::ParallelWork(_) => 7,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::ClientInfo(input) => input.validate(),
            Self::Msme(input) | Self::Duns(input) => input.validate(),
            Self::ReviewSubmit => Ok(()),
            Self::PlayConsole(input) => input.validate(),
            Self::Domain(_) => Ok(()),
            Self::ParallelWork(input) => input.validate(),
        }
    }
}

/// Mark the application submitted. Step 4 has no other fields.
pub fn apply_submission(client: &mut Client) {
    client.onboarding_status = OnboardingStatus::Submitted;
    client.updated_at = Utc::now();
}
