//! Financial Aggregator
//!
//! Rolls up account-sale revenue against organizational cost liability for a
//! set of clients. The period filter bounds the CLIENT's creation date, not
//! the transaction date — the window selects a client cohort, so a sale
//! completed yesterday for a client created 31 days ago falls outside the
//! 30-day view.

use std::collections::HashSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::model::{Client, OrganizationCost, PlayConsoleStatus};

/// Reporting window over the client cohort
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Days30,
    Days60,
    All,
}

impl Period {
    /// Creation-date lower bound for the window, if any
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Days30 => Some(now - chrono::Duration::days(30)),
            Self::Days60 => Some(now - chrono::Duration::days(60)),
            Self::All => None,
        }
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "30" => Ok(Self::Days30),
            "60" => Ok(Self::Days60),
            "all" => Ok(Self::All),
            other => Err(format!("unknown period: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountSaleSummary {
    pub total: Decimal,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LiabilitySummary {
    pub total: Decimal,
    pub domain: Decimal,
    pub play_console: Decimal,
    pub other: Decimal,
}

/// Dashboard rollup for the caller's visible client set
#[derive(Debug, Clone, Serialize)]
pub struct FinancialSummary {
    pub account_sale: AccountSaleSummary,
    pub org_liability: LiabilitySummary,
    /// May be negative
    pub net_profit: Decimal,
}

/// Roll up sales and liabilities for `clients` (already scoped to the
/// caller's visibility) over the given period.
pub fn summarize(
    clients: &[Client],
    consoles: &[PlayConsoleStatus],
    costs: &[OrganizationCost],
    period: Period,
    now: DateTime<Utc>,
) -> FinancialSummary {
    let cutoff = period.cutoff(now);
    let in_scope: HashSet<Uuid> = clients
        .iter()
        .filter(|c| cutoff.is_none_or(|bound| c.created_at >= bound))
        .map(|c| c.id)
        .collect();

    let mut sale_total = Decimal::ZERO;
    let mut sale_count = 0usize;
    for console in consoles {
        if console.account_sale_complete && in_scope.contains(&console.client_id) {
            sale_total += console.account_sale_amount.unwrap_or(Decimal::ZERO);
            sale_count += 1;
        }
    }

    let mut domain = Decimal::ZERO;
    let mut play_console = Decimal::ZERO;
    let mut other = Decimal::ZERO;
    for cost in costs {
        if in_scope.contains(&cost.client_id) {
            domain += cost.domain_cost;
            play_console += cost.play_console_fee;
            other += cost.other_costs;
        }
    }
    let liability_total = domain + play_console + other;

    FinancialSummary {
        account_sale: AccountSaleSummary {
            total: sale_total,
            count: sale_count,
        },
        org_liability: LiabilitySummary {
            total: liability_total,
            domain,
            play_console,
            other,
        },
        net_profit: sale_total - liability_total,
    }
}
