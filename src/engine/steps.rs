//! Step Completion Predicates & Workflow State Deriver
//!
//! The workflow has seven ordered steps. A client's current step, status
//! label, and blocked flag are derived on every read from the persisted
//! facts; nothing here is ever stored back. Evaluation is strictly
//! sequential and short-circuiting: the earliest unsatisfied gate wins,
//! with one exception — a published app overrides everything.

use serde::Serialize;

use crate::model::{CertStatus, Client, ComplianceDocument, OnboardingStatus, PlayConsoleStatus};

/// The seven workflow steps, in gate order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStep {
    ClientInfo,
    Msme,
    Duns,
    ReviewSubmit,
    PlayConsole,
    Domain,
    ParallelWork,
}

impl WorkflowStep {
    pub fn number(&self) -> u8 {
        match self {
            Self::ClientInfo => 1,
            Self::Msme => 2,
            Self::Duns => 3,
            Self::ReviewSubmit => 4,
            Self::PlayConsole => 5,
            Self::Domain => 6,
            Self::ParallelWork => 7,
        }
    }

    pub fn from_number(step: u8) -> Option<Self> {
        match step {
            1 => Some(Self::ClientInfo),
            2 => Some(Self::Msme),
            3 => Some(Self::Duns),
            4 => Some(Self::ReviewSubmit),
            5 => Some(Self::PlayConsole),
            6 => Some(Self::Domain),
            7 => Some(Self::ParallelWork),
            _ => None,
        }
    }
}

/// Derived workflow position for a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivedState {
    /// 1..=7
    pub current_step: u8,
    pub status: String,
    pub blocked: bool,
}

impl DerivedState {
    fn at(step: WorkflowStep, status: &str, blocked: bool) -> Self {
        Self {
            current_step: step.number(),
            status: status.to_string(),
            blocked,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == "Completed"
    }
}

// Per-step completion predicates. Step 1 is satisfied by existence of the
// record itself.

pub fn client_info_complete(_client: &Client) -> bool {
    true
}

pub fn msme_complete(compliance: &ComplianceDocument) -> bool {
    compliance.msme_status == CertStatus::Approved
}

pub fn duns_complete(compliance: &ComplianceDocument) -> bool {
    compliance.duns_status == CertStatus::Approved
}

pub fn review_complete(client: &Client) -> bool {
    client.onboarding_status != OnboardingStatus::Draft
}

pub fn console_complete(console: &PlayConsoleStatus) -> bool {
    console.ready()
}

pub fn domain_complete(client: &Client) -> bool {
    client.has_domain()
}

pub fn published(client: &Client) -> bool {
    client.published
}

/// Derive the client's workflow position from the persisted facts.
///
/// Pure and idempotent. Publication is an override, not a normal gate:
/// `published == true` yields "Completed" even if an earlier certificate
/// has regressed to PENDING.
pub fn derive_state(
    client: &Client,
    compliance: &ComplianceDocument,
    console: &PlayConsoleStatus,
) -> DerivedState {
    if published(client) {
        return DerivedState::at(WorkflowStep::ParallelWork, "Completed", false);
    }

    match compliance.msme_status {
        CertStatus::Approved => {}
        CertStatus::Pending => return DerivedState::at(WorkflowStep::Msme, "MSME Pending", true),
        CertStatus::NotCreated => {
            return DerivedState::at(WorkflowStep::Msme, "MSME Registration", false)
        }
    }

    match compliance.duns_status {
        CertStatus::Approved => {}
        CertStatus::Pending => return DerivedState::at(WorkflowStep::Duns, "DUNS Pending", true),
        CertStatus::NotCreated => {
            return DerivedState::at(WorkflowStep::Duns, "DUNS Registration", false)
        }
    }

    if !review_complete(client) {
        return DerivedState::at(WorkflowStep::ReviewSubmit, "Review & Submit", false);
    }

    if !console.account_created {
        return DerivedState::at(WorkflowStep::PlayConsole, "Play Console Setup", false);
    }
    if !console.account_paid {
        return DerivedState::at(WorkflowStep::PlayConsole, "Play Console Payment", true);
    }
    if !(console.identity_verified && console.company_verified) {
        return DerivedState::at(WorkflowStep::PlayConsole, "Play Console Verification", true);
    }

    if !domain_complete(client) {
        return DerivedState::at(WorkflowStep::Domain, "Domain Purchase", false);
    }

    DerivedState::at(WorkflowStep::ParallelWork, "Parallel Work", false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CompanyType;
    use uuid::Uuid;

    fn fixtures() -> (Client, ComplianceDocument, PlayConsoleStatus) {
        let client = Client::new(
            "Acme Apps".to_string(),
            "ABCDE1234F".to_string(),
            CompanyType::Firm,
            "ops@acme.example".to_string(),
            None,
            Uuid::new_v4(),
        );
        let compliance = ComplianceDocument::empty(client.id);
        let console = PlayConsoleStatus::empty(client.id);
        (client, compliance, console)
    }

    fn pass_compliance(compliance: &mut ComplianceDocument) {
        compliance.msme_status = CertStatus::Approved;
        compliance.duns_status = CertStatus::Approved;
    }

    fn pass_console(console: &mut PlayConsoleStatus) {
        console.account_created = true;
        console.account_paid = true;
        console.identity_verified = true;
        console.company_verified = true;
        console.console_ready = true;
    }

    #[test]
    fn test_fresh_client_sits_at_msme_registration() {
        let (client, compliance, console) = fixtures();
        let state = derive_state(&client, &compliance, &console);
        assert_eq!(state.current_step, 2);
        assert_eq!(state.status, "MSME Registration");
        assert!(!state.blocked);
    }

    #[test]
    fn test_msme_pending_blocks_at_step_two() {
        let (mut client, mut compliance, mut console) = fixtures();
        compliance.msme_status = CertStatus::Pending;
        // Later-step facts must not matter: dominance of the earliest gate.
        compliance.duns_status = CertStatus::Approved;
        client.onboarding_status = OnboardingStatus::Submitted;
        pass_console(&mut console);

        let state = derive_state(&client, &compliance, &console);
        assert_eq!(state.current_step, 2);
        assert_eq!(state.status, "MSME Pending");
        assert!(state.blocked);
    }

    #[test]
    fn test_duns_gated_on_msme() {
        let (client, mut compliance, console) = fixtures();
        compliance.msme_status = CertStatus::Approved;
        compliance.duns_status = CertStatus::Pending;
        let state = derive_state(&client, &compliance, &console);
        assert_eq!(state.current_step, 3);
        assert_eq!(state.status, "DUNS Pending");
        assert!(state.blocked);
    }

    #[test]
    fn test_draft_waits_at_review_submit() {
        let (client, mut compliance, console) = fixtures();
        pass_compliance(&mut compliance);
        let state = derive_state(&client, &compliance, &console);
        assert_eq!(state.current_step, 4);
        assert_eq!(state.status, "Review & Submit");
        assert!(!state.blocked);
    }

    #[test]
    fn test_console_partial_states() {
        let (mut client, mut compliance, mut console) = fixtures();
        pass_compliance(&mut compliance);
        client.onboarding_status = OnboardingStatus::Submitted;

        let state = derive_state(&client, &compliance, &console);
        assert_eq!(
            (state.current_step, state.status.as_str(), state.blocked),
            (5, "Play Console Setup", false)
        );

        console.account_created = true;
        let state = derive_state(&client, &compliance, &console);
        assert_eq!(
            (state.current_step, state.status.as_str(), state.blocked),
            (5, "Play Console Payment", true)
        );

        console.account_paid = true;
        console.identity_verified = true;
        let state = derive_state(&client, &compliance, &console);
        assert_eq!(
            (state.current_step, state.status.as_str(), state.blocked),
            (5, "Play Console Verification", true)
        );
    }

    #[test]
    fn test_domain_then_parallel_work() {
        let (mut client, mut compliance, mut console) = fixtures();
        pass_compliance(&mut compliance);
        pass_console(&mut console);
        client.onboarding_status = OnboardingStatus::Submitted;

        let state = derive_state(&client, &compliance, &console);
        assert_eq!(
            (state.current_step, state.status.as_str(), state.blocked),
            (6, "Domain Purchase", false)
        );

        client.website_url = Some("acme.example".to_string());
        let state = derive_state(&client, &compliance, &console);
        assert_eq!(
            (state.current_step, state.status.as_str(), state.blocked),
            (7, "Parallel Work", false)
        );
    }

    #[test]
    fn test_published_overrides_pending_compliance() {
        let (mut client, mut compliance, console) = fixtures();
        compliance.msme_status = CertStatus::Pending;
        client.published = true;

        let state = derive_state(&client, &compliance, &console);
        assert_eq!(state.current_step, 7);
        assert_eq!(state.status, "Completed");
        assert!(!state.blocked);
        assert!(state.is_completed());
    }

    #[test]
    fn test_derivation_is_idempotent() {
        let (mut client, mut compliance, mut console) = fixtures();
        compliance.msme_status = CertStatus::Approved;
        compliance.duns_status = CertStatus::Pending;
        client.onboarding_status = OnboardingStatus::Submitted;
        console.account_created = true;

        let first = derive_state(&client, &compliance, &console);
        let second = derive_state(&client, &compliance, &console);
        assert_eq!(first, second);
    }

    #[test]
    fn test_backward_recomputation_after_submission_is_not_prevented() {
        let (mut client, mut compliance, mut console) = fixtures();
        pass_compliance(&mut compliance);
        pass_console(&mut console);
        client.onboarding_status = OnboardingStatus::Submitted;
        client.website_url = Some("acme.example".to_string());
        assert_eq!(derive_state(&client, &compliance, &console).current_step, 7);

        // Regressing a certificate pulls the derived step back; the deriver
        // reports the facts as they stand.
        compliance.msme_status = CertStatus::Pending;
        let state = derive_state(&client, &compliance, &console);
        assert_eq!(state.current_step, 2);
        assert!(state.blocked);
    }

    #[test]
    fn test_step_number_round_trip() {
        for n in 1..=7u8 {
            assert_eq!(WorkflowStep::from_number(n).unwrap().number(), n);
        }
        assert!(WorkflowStep::from_number(0).is_none());
        assert!(WorkflowStep::from_number(8).is_none());
    }
}
