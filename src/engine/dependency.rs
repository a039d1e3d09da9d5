//! Dependency Checker & Fault Attribution
//!
//! Decides whether the next workflow action is blocked, why, and whose fault
//! it is. Attribution follows a fixed classification table:
//! document/asset/policy failures are always the client's, technical
//! failures are always the company's. The verdict is written permanently to
//! the audit trail at the moment it is made; it is never re-derived.

use serde::Serialize;

use crate::model::{CertStatus, ComplianceDocument, PlayConsoleStatus, Responsibility};

/// Result of a dependency check
#[derive(Debug, Clone, Serialize)]
pub struct DependencyCheck {
    pub can_proceed: bool,
    pub blocked_reason: Option<String>,
    pub responsibility: Option<Responsibility>,
    pub missing_dependencies: Vec<String>,
}

impl DependencyCheck {
    fn clear() -> Self {
        Self {
            can_proceed: true,
            blocked_reason: None,
            responsibility: None,
            missing_dependencies: Vec::new(),
        }
    }
}

/// Categories of blocking failures, each with a fixed fault assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureCategory {
    MissingDocument,
    InvalidDocument,
    PolicyViolation,
    AssetRejected,
    AppCrash,
    AnrRate,
    BuildFailure,
    TechnicalError,
}

impl FailureCategory {
    /// Fixed classification: paperwork is the client's problem, broken
    /// software is ours.
    pub fn responsibility(&self) -> Responsibility {
        match self {
            Self::MissingDocument
            | Self::InvalidDocument
            | Self::PolicyViolation
            | Self::AssetRejected => Responsibility::Client,
            Self::AppCrash | Self::AnrRate | Self::BuildFailure | Self::TechnicalError => {
                Responsibility::Company
            }
        }
    }
}

/// Check whether the client's compliance and console sub-states allow the
/// workflow to proceed.
///
/// A PENDING certificate means the company is waiting on a client-submitted
/// document or number, so the block is attributed to the client. The same
/// holds for outstanding console verifications once the account exists and
/// is paid for.
pub fn check_dependency(
    compliance: &ComplianceDocument,
    console: &PlayConsoleStatus,
) -> DependencyCheck {
    let mut missing = Vec::new();

    if compliance.msme_status == CertStatus::Pending {
        missing.push("MSME certificate approval".to_string());
    }
    if compliance.duns_status == CertStatus::Pending {
        missing.push("D-U-N-S number approval".to_string());
    }

    if console.account_created && console.account_paid {
        if !console.identity_verified {
            missing.push("Play Console identity verification".to_string());
        }
        if !console.company_verified {
            missing.push("Play Console company verification".to_string());
        }
    }

    if missing.is_empty() {
        return DependencyCheck::clear();
    }

    DependencyCheck {
        can_proceed: false,
        blocked_reason: Some(format!("Waiting on: {}", missing.join(", "))),
        responsibility: Some(Responsibility::Client),
        missing_dependencies: missing,
    }
}
