//! Organizational Cost Liability
//!
//! What the organization has spent on a client's behalf. Created lazily by
//! the stage-7 handler; the Play Console fee defaults to the configured
//! platform fee.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-client cost record, upserted by the parallel-work handler only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationCost {
    pub client_id: Uuid,
    pub domain_cost: Decimal,
    pub play_console_fee: Decimal,
    pub other_costs: Decimal,
    pub cost_notes: Option<String>,
}

impl OrganizationCost {
    pub fn new(client_id: Uuid, play_console_fee: Decimal) -> Self {
        Self {
            client_id,
            domain_cost: Decimal::ZERO,
            play_console_fee,
            other_costs: Decimal::ZERO,
            cost_notes: None,
        }
    }

    pub fn total(&self) -> Decimal {
        self.domain_cost + self.play_console_fee + self.other_costs
    }
}
