//! Compliance Certificates
//!
//! MSME and D-U-N-S registrations, one row per client. Each certificate has
//! its own NOT_CREATED → PENDING → APPROVED lifecycle; the workflow cannot
//! pass steps 2 and 3 until the respective certificate is APPROVED.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a single compliance certificate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CertStatus {
    NotCreated,
    Pending,
    Approved,
}

impl CertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotCreated => "NOT_CREATED",
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
        }
    }
}

/// Which certificate a compliance mutation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Certificate {
    Msme,
    Duns,
}

impl Certificate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Msme => "MSME",
            Self::Duns => "D-U-N-S",
        }
    }
}

/// Per-client compliance record, created empty at client creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceDocument {
    pub client_id: Uuid,
    pub msme_status: CertStatus,
    pub msme_document_url: Option<String>,
    pub msme_registration_number: Option<String>,
    pub duns_status: CertStatus,
    pub duns_document_url: Option<String>,
    pub duns_number: Option<String>,
    pub last_verified_at: Option<DateTime<Utc>>,
}

impl ComplianceDocument {
    pub fn empty(client_id: Uuid) -> Self {
        Self {
            client_id,
            msme_status: CertStatus::NotCreated,
            msme_document_url: None,
            msme_registration_number: None,
            duns_status: CertStatus::NotCreated,
            duns_document_url: None,
            duns_number: None,
            last_verified_at: None,
        }
    }

    pub fn status_of(&self, certificate: Certificate) -> CertStatus {
        match certificate {
            Certificate::Msme => self.msme_status,
            Certificate::Duns => self.duns_status,
        }
    }
}
