//! Payment Release Engine
//!
//! Eligibility is an ordered OR of three independent qualifying conditions,
//! first match wins: publication, full website completion, or an explicit
//! eligible milestone. A website task waiting on the client short-circuits
//! the whole evaluation to "not eligible" — it does not fall through to the
//! milestone check. Timeline extensions are a coarse count of client-caused
//! blocking events in the audit trail, one day each.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::model::{AuditEntry, PaymentMilestone, SubmissionReview, TaskStatus, WebsiteTask};

/// Outcome of a payment-eligibility evaluation
#[derive(Debug, Clone, Serialize)]
pub struct PaymentEligibility {
    pub eligible: bool,
    pub reason: String,
    pub blocked_by: Vec<String>,
    pub milestone_id: Option<Uuid>,
    pub amount: Option<Decimal>,
}

impl PaymentEligibility {
    fn eligible(reason: &str) -> Self {
        Self {
            eligible: true,
            reason: reason.to_string(),
            blocked_by: Vec::new(),
            milestone_id: None,
            amount: None,
        }
    }
}

/// Evaluate payment-release eligibility for a client.
///
/// `milestones` must be in creation-time ascending order; the first eligible
/// unreleased milestone wins when the earlier conditions do not apply.
pub fn evaluate_eligibility(
    review: Option<&SubmissionReview>,
    live_url: Option<&str>,
    website_tasks: &[WebsiteTask],
    milestones: &[PaymentMilestone],
) -> PaymentEligibility {
    // Condition 1: published with a live URL.
    let published = review.is_some_and(|r| r.published);
    if published && live_url.is_some_and(|url| !url.is_empty()) {
        return PaymentEligibility::eligible("App successfully published");
    }

    // Condition 2: website fully delivered. A task waiting on the client
    // kills the evaluation outright.
    let waiting_on_client: Vec<&WebsiteTask> = website_tasks
        .iter()
        .filter(|t| t.status.waits_on_client())
        .collect();
    if !waiting_on_client.is_empty() {
        return PaymentEligibility {
            eligible: false,
            reason: "Website tasks blocked due to pending client action".to_string(),
            blocked_by: waiting_on_client.iter().map(|t| t.name.clone()).collect(),
            milestone_id: None,
            amount: None,
        };
    }
    if !website_tasks.is_empty()
        && website_tasks
            .iter()
            .all(|t| t.status == TaskStatus::Completed)
    {
        return PaymentEligibility::eligible("Website live and all tasks verified");
    }

    // Condition 3: an explicit eligible milestone.
    if let Some(milestone) = milestones
        .iter()
        .find(|m| m.eligible_for_payment && !m.released)
    {
        return PaymentEligibility {
            eligible: true,
            reason: format!("Milestone '{}' eligible for release", milestone.name),
            blocked_by: Vec::new(),
            milestone_id: Some(milestone.id),
            amount: Some(milestone.amount),
        };
    }

    // Nothing qualifies: report everything standing in the way.
    let mut blocked_by = vec!["App not yet published".to_string()];
    if review.is_some_and(|r| r.status == TaskStatus::PendingClient) {
        blocked_by.push("App review waiting on client action".to_string());
    }
    let incomplete = website_tasks
        .iter()
        .filter(|t| t.status != TaskStatus::Completed)
        .count();
    if incomplete > 0 {
        blocked_by.push(format!("{incomplete} website task(s) incomplete"));
    }

    PaymentEligibility {
        eligible: false,
        reason: "Not eligible for payment release".to_string(),
        blocked_by,
        milestone_id: None,
        amount: None,
    }
}

/// One client-caused delay event, lifted from the audit trail
#[derive(Debug, Clone, Serialize)]
pub struct ExtensionEvent {
    pub occurred_at: DateTime<Utc>,
    pub reason: String,
}

/// Timeline extension owed to client-caused delays
#[derive(Debug, Clone, Serialize)]
pub struct TimelineExtension {
    pub days_extended: i64,
    pub events: Vec<ExtensionEvent>,
}

/// Count blocking events in the audit trail, in chronological order.
///
/// Each event contributes `days_per_event` (minimum one day) — a coarse
/// approximation rather than an interval measurement.
pub fn calculate_timeline_extension(
    entries: &[AuditEntry],
    days_per_event: i64,
) -> TimelineExtension {
    let days_per_event = days_per_event.max(1);

    let mut blocking: Vec<&AuditEntry> = entries
        .iter()
        .filter(|e| e.action.is_blocking_event())
        .collect();
    blocking.sort_by_key(|e| e.changed_at);

    let events: Vec<ExtensionEvent> = blocking
        .iter()
        .map(|e| ExtensionEvent {
            occurred_at: e.changed_at,
            reason: format!(
                "{} on {} at {}",
                e.action.as_str(),
                e.table_name,
                e.changed_at.format("%Y-%m-%d")
            ),
        })
        .collect();

    TimelineExtension {
        days_extended: events.len() as i64 * days_per_event,
        events,
    }
}
