//! Play Console Account State
//!
//! Tracks the developer-account setup required before publication: account
//! creation, the one-time registration payment, and the two verification
//! tracks. Also carries the account-sale side of the ledger.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-client Play Console record, created empty at client creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayConsoleStatus {
    pub client_id: Uuid,
    pub account_created: bool,
    pub account_paid: bool,
    pub identity_verified: bool,
    pub company_verified: bool,
    pub payment_profile_set: bool,
    pub developer_invited: bool,
    pub developer_invite_email: Option<String>,

    /// Stored denormalization of [`PlayConsoleStatus::ready`], recomputed on
    /// every step-5 write. Must always agree with the predicate.
    pub console_ready: bool,

    pub account_sale_complete: bool,
    pub account_sale_amount: Option<Decimal>,
}

impl PlayConsoleStatus {
    pub fn empty(client_id: Uuid) -> Self {
        Self {
            client_id,
            account_created: false,
            account_paid: false,
            identity_verified: false,
            company_verified: false,
            payment_profile_set: false,
            developer_invited: false,
            developer_invite_email: None,
            console_ready: false,
            account_sale_complete: false,
            account_sale_amount: None,
        }
    }

    /// The single source of truth for console readiness. Both the state
    /// deriver and the step-5 mutation handler go through this predicate.
    pub fn ready(&self) -> bool {
        self.account_created && self.account_paid && self.identity_verified && self.company_verified
    }
}
