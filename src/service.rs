//! Service Facade
//!
//! The transport-agnostic operations the CRM exposes. Every operation
//! resolves the caller, applies access scoping, and only then touches the
//! store; reads re-derive workflow state on the way out, writes go through
//! the step mutation handlers and leave an audit entry behind.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::engine::access::{require_client_access, require_removable, require_super_admin};
use crate::engine::dependency::{check_dependency, DependencyCheck, FailureCategory};
use crate::engine::finance::{self, FinancialSummary, Period};
use crate::engine::mutation::{self, ClientInfoInput, StepUpdate};
use crate::engine::payment::{self, PaymentEligibility, TimelineExtension};
use crate::engine::steps::{derive_state, DerivedState, WorkflowStep};
use crate::error::{CrmError, Result};
use crate::identity::PasswordHasher;
use crate::model::{
    AppDevelopmentTask, AuditAction, AuditEntry, Client, ComplianceDocument, OrganizationCost,
    PaymentMilestone, PlayConsoleStatus, PlayStoreAsset, PublishingStatus, Responsibility,
    SubmissionReview, TaskStatus, TeamMemberView, User, UserRole, WebsiteTask,
};
use crate::rate_limit::{RateCategory, RateLimiter};
use crate::store::EntityStore;

/// A client with its derived workflow position and dependency annotation
#[derive(Debug, Clone, Serialize)]
pub struct ClientView {
    pub client: Client,
    pub state: DerivedState,
    pub dependency: DependencyCheck,
}

/// List-row projection of a client
#[derive(Debug, Clone, Serialize)]
pub struct ClientSummary {
    pub id: Uuid,
    pub legal_name: String,
    pub email: String,
    pub pan: String,
    pub current_step: u8,
    pub status: String,
    pub blocked: bool,
}

/// Derived-status filter for client listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusFilter {
    All,
    Ongoing,
    Completed,
    Blocked,
}

impl StatusFilter {
    fn matches(&self, state: &DerivedState) -> bool {
        match self {
            Self::All => true,
            Self::Ongoing => !state.is_completed(),
            Self::Completed => state.is_completed(),
            Self::Blocked => state.blocked,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PageMeta {
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

/// Team-member creation payload
#[derive(Debug, Clone, Deserialize)]
pub struct TeamMemberInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
}

/// Partial team-member update
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TeamMemberUpdate {
    pub name: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

/// The CRM core, wired to its collaborators
pub struct CrmService {
    store: Arc<dyn EntityStore>,
    hasher: Arc<dyn PasswordHasher>,
    limiter: Arc<dyn RateLimiter>,
    config: EngineConfig,
}

impl CrmService {
    pub fn new(
        store: Arc<dyn EntityStore>,
        hasher: Arc<dyn PasswordHasher>,
        limiter: Arc<dyn RateLimiter>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            hasher,
            limiter,
            config,
        }
    }

    /// Resolve the caller or fail with `Unauthenticated`. Deactivated
    /// accounts do not count as callers.
    async fn caller(&self, caller_id: Uuid) -> Result<User> {
        match self.store.user(caller_id).await? {
            Some(user) if user.is_active => Ok(user),
            _ => Err(CrmError::Unauthenticated),
        }
    }

    async fn check_rate(&self, category: RateCategory, key: &str) -> Result<()> {
        if self.limiter.allow(category, key).await? {
            Ok(())
        } else {
            warn!(key, "rate limit exceeded");
            Err(CrmError::RateLimited)
        }
    }

    /// Fetch a client and its 1:1 sub-entities. A missing sub-entity is a
    /// storage invariant violation, surfaced as `Internal`.
    async fn load_bundle(
        &self,
        client_id: Uuid,
    ) -> Result<(Client, ComplianceDocument, PlayConsoleStatus)> {
        let client = self
            .store
            .client(client_id)
            .await?
            .ok_or(CrmError::NotFound("client"))?;
        let compliance = self.store.compliance(client_id).await?.ok_or_else(|| {
            warn!(%client_id, "client has no compliance row");
            CrmError::Internal("missing compliance row".to_string())
        })?;
        let console = self.store.console(client_id).await?.ok_or_else(|| {
            warn!(%client_id, "client has no play console row");
            CrmError::Internal("missing play console row".to_string())
        })?;
        Ok((client, compliance, console))
    }

    fn view(client: Client, compliance: &ComplianceDocument, console: &PlayConsoleStatus) -> ClientView {
        let state = derive_state(&client, compliance, console);
        let dependency = check_dependency(compliance, console);
        ClientView {
            client,
            state,
            dependency,
        }
    }

    // ── Clients ──────────────────────────────────────────────────────────

    pub async fn get_client(&self, client_id: Uuid, caller_id: Uuid) -> Result<ClientView> {
        let caller = self.caller(caller_id).await?;
        let (client, compliance, console) = self.load_bundle(client_id).await?;
        require_client_access(&caller, &client)?;
        Ok(Self::view(client, &compliance, &console))
    }

    /// Full fetch, then derived-status filtering and pagination in memory.
    pub async fn list_clients(
        &self,
        caller_id: Uuid,
        page: usize,
        limit: Option<usize>,
        filter: StatusFilter,
        search: Option<&str>,
    ) -> Result<Page<ClientSummary>> {
        let caller = self.caller(caller_id).await?;
        let page = page.max(1);
        let limit = limit.unwrap_or(self.config.default_page_limit).max(1);
        let needle = search.map(str::to_lowercase);

        let mut rows = Vec::new();
        for client in self.store.clients().await? {
            if !crate::engine::access::can_access_client(&caller, &client) {
                continue;
            }
            if let Some(needle) = &needle {
                let hit = client.legal_name.to_lowercase().contains(needle)
                    || client.email.to_lowercase().contains(needle)
                    || client.pan.to_lowercase().contains(needle);
                if !hit {
                    continue;
                }
            }
            let (Some(compliance), Some(console)) = (
                self.store.compliance(client.id).await?,
                self.store.console(client.id).await?,
            ) else {
                warn!(client_id = %client.id, "skipping client with missing sub-entities");
                continue;
            };
            let state = derive_state(&client, &compliance, &console);
            if !filter.matches(&state) {
                continue;
            }
            rows.push(ClientSummary {
                id: client.id,
                legal_name: client.legal_name,
                email: client.email,
                pan: client.pan,
                current_step: state.current_step,
                status: state.status,
                blocked: state.blocked,
            });
        }

        let total = rows.len();
        let total_pages = total.div_ceil(limit).max(1);
        let data = rows
            .into_iter()
            .skip((page - 1) * limit)
            .take(limit)
            .collect();
        Ok(Page {
            data,
            meta: PageMeta {
                total,
                page,
                limit,
                total_pages,
            },
        })
    }

    pub async fn create_client(
        &self,
        input: ClientInfoInput,
        caller_id: Uuid,
    ) -> Result<ClientView> {
        let caller = self.caller(caller_id).await?;
        if caller.role == UserRole::Client {
            return Err(CrmError::Forbidden);
        }
        input.validate()?;

        let client = Client::new(
            input.legal_name.trim().to_string(),
            input.pan.clone(),
            input.company_type,
            input.email.clone(),
            input.phone.clone(),
            caller.id,
        );
        let client_id = client.id;
        self.store.create_client(client).await?;
        self.store
            .append_audit(
                AuditEntry::new(
                    client_id,
                    "clients",
                    client_id,
                    AuditAction::Created,
                    caller.id,
                )
                .with_snapshots(None, serde_json::to_value(&input.legal_name).ok()),
            )
            .await?;
        info!(%client_id, caller = %caller.id, "client created");

        let (client, compliance, console) = self.load_bundle(client_id).await?;
        Ok(Self::view(client, &compliance, &console))
    }

    /// Apply one step mutation. The only way workflow state advances.
    pub async fn update_step(
        &self,
        client_id: Uuid,
        step: u8,
        payload: StepUpdate,
        caller_id: Uuid,
    ) -> Result<ClientView> {
        let caller = self.caller(caller_id).await?;
        self.check_rate(RateCategory::Mutation, &caller.id.to_string())
            .await?;

        if WorkflowStep::from_number(step).is_none() {
            return Err(CrmError::validation("step", "must be between 1 and 7"));
        }
        if payload.step_number() != step {
            return Err(CrmError::validation(
                "step",
                "payload does not match the requested step",
            ));
        }

        let (mut client, mut compliance, mut console) = self.load_bundle(client_id).await?;
        require_client_access(&caller, &client)?;
        payload.validate()?;

        match payload {
            StepUpdate::ClientInfo(input) => {
                let old = serde_json::to_value(&client).ok();
                input.apply(&mut client);
                let new = serde_json::to_value(&client).ok();
                self.store.save_client(client).await?;
                self.audit_step(client_id, "clients", client_id, caller.id, old, new)
                    .await?;
            }
            StepUpdate::Msme(input) | StepUpdate::Duns(input) => {
                let certificate = match step {
                    2 => crate::model::Certificate::Msme,
                    _ => crate::model::Certificate::Duns,
                };
                let old = serde_json::to_value(&compliance).ok();
                let previous = compliance.status_of(certificate);
                input.apply(&mut compliance, certificate);
                let current = compliance.status_of(certificate);
                let new = serde_json::to_value(&compliance).ok();
                self.store.save_compliance(compliance).await?;
                self.audit_step(client_id, "compliance_documents", client_id, caller.id, old, new)
                    .await?;

                // A certificate entering PENDING is a client-caused blocking
                // event; attribute the fault permanently.
                if current == crate::model::CertStatus::Pending
                    && previous != crate::model::CertStatus::Pending
                {
                    self.append_blocking_event(
                        client_id,
                        "compliance_documents",
                        client_id,
                        AuditAction::StatusChangedToPendingClient,
                        Responsibility::Client,
                        caller.id,
                    )
                    .await?;
                }
            }
            StepUpdate::ReviewSubmit => {
                let old = serde_json::to_value(&client.onboarding_status).ok();
                mutation::apply_submission(&mut client);
                let new = serde_json::to_value(&client.onboarding_status).ok();
                self.store.save_client(client).await?;
                self.store
                    .append_audit(
                        AuditEntry::new(
                            client_id,
                            "clients",
                            client_id,
                            AuditAction::Submitted,
                            caller.id,
                        )
                        .with_snapshots(old, new),
                    )
                    .await?;
            }
            StepUpdate::PlayConsole(input) => {
                let old = serde_json::to_value(&console).ok();
                input.apply(&mut console);
                let new = serde_json::to_value(&console).ok();
                self.store.save_console(console).await?;
                self.audit_step(client_id, "play_console_status", client_id, caller.id, old, new)
                    .await?;
            }
            StepUpdate::Domain(input) => {
                let old = serde_json::to_value(&client).ok();
                input.apply(&mut client);
                let new = serde_json::to_value(&client).ok();
                self.store.save_client(client).await?;
                self.audit_step(client_id, "clients", client_id, caller.id, old, new)
                    .await?;
            }
            StepUpdate::ParallelWork(input) => {
                let old_client = serde_json::to_value(&client).ok();
                let old_console = serde_json::to_value(&console).ok();
                let mut cost = self
                    .store
                    .cost(client_id)
                    .await?
                    .unwrap_or_else(|| OrganizationCost::new(client_id, self.config.play_console_fee));
                let old_cost = serde_json::to_value(&cost).ok();

                input.apply_to_client(&mut client);
                input.apply_to_console(&mut console);
                input.apply_to_cost(&mut cost);

                let audit = vec![
                    AuditEntry::new(
                        client_id,
                        "clients",
                        client_id,
                        AuditAction::StepUpdated,
                        caller.id,
                    )
                    .with_snapshots(old_client, serde_json::to_value(&client).ok()),
                    AuditEntry::new(
                        client_id,
                        "play_console_status",
                        client_id,
                        AuditAction::StepUpdated,
                        caller.id,
                    )
                    .with_snapshots(old_console, serde_json::to_value(&console).ok()),
                    AuditEntry::new(
                        client_id,
                        "organization_costs",
                        client_id,
                        AuditAction::StepUpdated,
                        caller.id,
                    )
                    .with_snapshots(old_cost, serde_json::to_value(&cost).ok()),
                ];
                // One transaction: client flags, console sale fields, and the
                // cost upsert land together or not at all.
                self.store
                    .commit_parallel_work(client, console, cost, audit)
                    .await?;
            }
        }

        info!(%client_id, step, caller = %caller.id, "step updated");
        let (client, compliance, console) = self.load_bundle(client_id).await?;
        Ok(Self::view(client, &compliance, &console))
    }

    pub async fn submit_application(&self, client_id: Uuid, caller_id: Uuid) -> Result<ClientView> {
        self.update_step(client_id, 4, StepUpdate::ReviewSubmit, caller_id)
            .await
    }

    pub async fn delete_client(&self, client_id: Uuid, caller_id: Uuid) -> Result<()> {
        let caller = self.caller(caller_id).await?;
        require_super_admin(&caller)?;
        self.store.delete_client(client_id).await?;
        // The trail outlives the record.
        self.store
            .append_audit(AuditEntry::new(
                client_id,
                "clients",
                client_id,
                AuditAction::Deleted,
                caller.id,
            ))
            .await?;
        info!(%client_id, caller = %caller.id, "client deleted");
        Ok(())
    }

    // ── Task model ───────────────────────────────────────────────────────

    /// Upsert a website task by name and record its status. A transition
    /// into a client-waiting status leaves a permanent blocking event with
    /// its fault attribution in the audit trail.
    pub async fn record_website_task(
        &self,
        client_id: Uuid,
        name: &str,
        status: TaskStatus,
        responsibility: Option<Responsibility>,
        caller_id: Uuid,
    ) -> Result<WebsiteTask> {
        let caller = self.caller(caller_id).await?;
        let (client, _, _) = self.load_bundle(client_id).await?;
        require_client_access(&caller, &client)?;

        let existing = self
            .store
            .website_tasks(client_id)
            .await?
            .into_iter()
            .find(|t| t.name == name);
        let was_waiting = existing
            .as_ref()
            .is_some_and(|t| t.status.waits_on_client());
        let mut task = existing.unwrap_or_else(|| WebsiteTask::new(client_id, name));
        task.status = status;
        task.responsibility = responsibility;
        task.updated_at = Utc::now();
        self.store.save_website_task(task.clone()).await?;

        if status.waits_on_client() && !was_waiting {
            let action = match status {
                TaskStatus::PendingClient => AuditAction::StatusChangedToPendingClient,
                _ => AuditAction::StatusChangedToBlocked,
            };
            self.append_blocking_event(
                client_id,
                "website_tasks",
                task.id,
                action,
                responsibility.unwrap_or(Responsibility::Client),
                caller.id,
            )
            .await?;
        }
        Ok(task)
    }

    /// Upsert an app-development task. When the task fails or blocks, the
    /// failure category fixes the responsibility: paperwork on the client,
    /// broken builds on the company.
    pub async fn record_app_task(
        &self,
        client_id: Uuid,
        name: &str,
        status: TaskStatus,
        failure: Option<FailureCategory>,
        caller_id: Uuid,
    ) -> Result<AppDevelopmentTask> {
        let caller = self.caller(caller_id).await?;
        let (client, _, _) = self.load_bundle(client_id).await?;
        require_client_access(&caller, &client)?;

        let existing = self
            .store
            .app_tasks(client_id)
            .await?
            .into_iter()
            .find(|t| t.name == name);
        let was_waiting = existing
            .as_ref()
            .is_some_and(|t| t.status.waits_on_client());
        let mut task = existing.unwrap_or_else(|| AppDevelopmentTask::new(client_id, name));
        task.status = status;
        task.responsibility = failure.map(|f| f.responsibility());
        task.updated_at = Utc::now();
        self.store.save_app_task(task.clone()).await?;

        if status.waits_on_client() && !was_waiting {
            let action = match status {
                TaskStatus::PendingClient => AuditAction::StatusChangedToPendingClient,
                _ => AuditAction::StatusChangedToBlocked,
            };
            self.append_blocking_event(
                client_id,
                "app_development_tasks",
                task.id,
                action,
                task.responsibility.unwrap_or(Responsibility::Client),
                caller.id,
            )
            .await?;
        }
        Ok(task)
    }

    /// Upsert a store-upload asset record (icon set, screenshots, APK, ...).
    pub async fn record_store_asset(
        &self,
        client_id: Uuid,
        name: &str,
        url: Option<String>,
        status: TaskStatus,
        caller_id: Uuid,
    ) -> Result<PlayStoreAsset> {
        let caller = self.caller(caller_id).await?;
        let (client, _, _) = self.load_bundle(client_id).await?;
        require_client_access(&caller, &client)?;

        let existing = self
            .store
            .store_assets(client_id)
            .await?
            .into_iter()
            .find(|a| a.name == name);
        let mut asset = existing.unwrap_or_else(|| PlayStoreAsset {
            id: Uuid::new_v4(),
            client_id,
            name: name.to_string(),
            url: None,
            status: TaskStatus::NotStarted,
            responsibility: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
        if url.is_some() {
            asset.url = url;
        }
        // A rejected asset is always the client's to fix.
        asset.responsibility = match status {
            TaskStatus::Failed | TaskStatus::Blocked => {
                Some(FailureCategory::AssetRejected.responsibility())
            }
            _ => None,
        };
        asset.status = status;
        asset.updated_at = Utc::now();
        self.store.save_store_asset(asset.clone()).await?;
        Ok(asset)
    }

    pub async fn record_submission_review(
        &self,
        client_id: Uuid,
        status: TaskStatus,
        published: bool,
        notes: Option<String>,
        caller_id: Uuid,
    ) -> Result<SubmissionReview> {
        let caller = self.caller(caller_id).await?;
        let (mut client, _, _) = self.load_bundle(client_id).await?;
        require_client_access(&caller, &client)?;

        let mut review = self
            .store
            .submission_review(client_id)
            .await?
            .unwrap_or_else(|| SubmissionReview::new(client_id));
        let was_waiting = review.status.waits_on_client();
        review.status = status;
        review.published = published;
        if notes.is_some() {
            review.notes = notes;
        }
        if review.submitted_at.is_none() && status != TaskStatus::NotStarted {
            review.submitted_at = Some(Utc::now());
        }
        review.updated_at = Utc::now();
        self.store.save_submission_review(review.clone()).await?;

        // Keep the client's publishing status in step with the review row.
        client.publishing_status = if published {
            PublishingStatus::Production
        } else if status == TaskStatus::NotStarted {
            PublishingStatus::NotSubmitted
        } else {
            PublishingStatus::InReview
        };
        client.updated_at = Utc::now();
        self.store.save_client(client).await?;

        if status == TaskStatus::PendingClient && !was_waiting {
            self.append_blocking_event(
                client_id,
                "submission_reviews",
                client_id,
                AuditAction::StatusChangedToPendingClient,
                Responsibility::Client,
                caller.id,
            )
            .await?;
        }
        Ok(review)
    }

    pub async fn create_milestone(
        &self,
        client_id: Uuid,
        name: &str,
        amount: rust_decimal::Decimal,
        eligible_for_payment: bool,
        caller_id: Uuid,
    ) -> Result<PaymentMilestone> {
        let caller = self.caller(caller_id).await?;
        let (client, _, _) = self.load_bundle(client_id).await?;
        require_client_access(&caller, &client)?;
        if amount < rust_decimal::Decimal::ZERO {
            return Err(CrmError::validation("amount", "must not be negative"));
        }

        let mut milestone = PaymentMilestone::new(client_id, name, amount);
        milestone.eligible_for_payment = eligible_for_payment;
        self.store.save_milestone(milestone.clone()).await?;
        Ok(milestone)
    }

    // ── Payment release ──────────────────────────────────────────────────

    pub async fn check_payment_eligibility(
        &self,
        client_id: Uuid,
        caller_id: Uuid,
    ) -> Result<PaymentEligibility> {
        let caller = self.caller(caller_id).await?;
        let (client, _, _) = self.load_bundle(client_id).await?;
        require_client_access(&caller, &client)?;

        let review = self.store.submission_review(client_id).await?;
        let tasks = self.store.website_tasks(client_id).await?;
        let milestones = self.store.milestones(client_id).await?;
        Ok(payment::evaluate_eligibility(
            review.as_ref(),
            client.live_url.as_deref(),
            &tasks,
            &milestones,
        ))
    }

    pub async fn release_payment(
        &self,
        milestone_id: Uuid,
        caller_id: Uuid,
    ) -> Result<PaymentMilestone> {
        let caller = self.caller(caller_id).await?;
        let milestone = self
            .store
            .milestone(milestone_id)
            .await?
            .ok_or(CrmError::NotFound("milestone"))?;
        let (client, _, _) = self.load_bundle(milestone.client_id).await?;
        require_client_access(&caller, &client)?;

        let released = self.store.release_milestone(milestone_id, caller.id).await?;
        info!(%milestone_id, caller = %caller.id, amount = %released.amount, "payment released");
        Ok(released)
    }

    pub async fn timeline_extension(
        &self,
        client_id: Uuid,
        caller_id: Uuid,
    ) -> Result<TimelineExtension> {
        let caller = self.caller(caller_id).await?;
        let (client, _, _) = self.load_bundle(client_id).await?;
        require_client_access(&caller, &client)?;

        let entries = self.store.audit_log(client_id).await?;
        Ok(payment::calculate_timeline_extension(
            &entries,
            self.config.extension_days_per_event,
        ))
    }

    // ── Finance ──────────────────────────────────────────────────────────

    pub async fn dashboard_stats(
        &self,
        period: Period,
        caller_id: Uuid,
    ) -> Result<FinancialSummary> {
        let caller = self.caller(caller_id).await?;
        let clients: Vec<Client> = self
            .store
            .clients()
            .await?
            .into_iter()
            .filter(|c| {
                caller.role == UserRole::SuperAdmin || c.created_by == caller.id
            })
            .collect();
        let consoles = self.store.consoles().await?;
        let costs = self.store.costs().await?;
        Ok(finance::summarize(
            &clients,
            &consoles,
            &costs,
            period,
            Utc::now(),
        ))
    }

    // ── Team management ──────────────────────────────────────────────────

    pub async fn list_team(&self, caller_id: Uuid) -> Result<Vec<TeamMemberView>> {
        let caller = self.caller(caller_id).await?;
        require_super_admin(&caller)?;
        Ok(self
            .store
            .users()
            .await?
            .iter()
            .filter(|u| u.role != UserRole::Client)
            .map(TeamMemberView::from)
            .collect())
    }

    pub async fn create_team_member(
        &self,
        input: TeamMemberInput,
        caller_id: Uuid,
    ) -> Result<TeamMemberView> {
        let caller = self.caller(caller_id).await?;
        require_super_admin(&caller)?;
        self.check_rate(RateCategory::UserCreation, &caller.id.to_string())
            .await?;

        if input.name.trim().chars().count() < 2 {
            return Err(CrmError::validation(
                "name",
                "must be at least 2 characters",
            ));
        }
        if !mutation::email_regex().is_match(&input.email) {
            return Err(CrmError::validation("email", "must be a valid email"));
        }
        if input.password.chars().count() < 8 {
            return Err(CrmError::validation(
                "password",
                "must be at least 8 characters",
            ));
        }
        if !matches!(input.role, UserRole::TeamMember | UserRole::Member) {
            return Err(CrmError::validation(
                "role",
                "must be TEAM_MEMBER or MEMBER",
            ));
        }

        let user = User::new(
            input.name.trim(),
            input.email.clone(),
            self.hasher.hash(&input.password),
            input.role,
        );
        self.store.save_user(user.clone()).await?;
        info!(user_id = %user.id, caller = %caller.id, "team member created");
        Ok(TeamMemberView::from(&user))
    }

    pub async fn update_team_member(
        &self,
        user_id: Uuid,
        update: TeamMemberUpdate,
        caller_id: Uuid,
    ) -> Result<TeamMemberView> {
        let caller = self.caller(caller_id).await?;
        require_super_admin(&caller)?;
        let mut target = self
            .store
            .user(user_id)
            .await?
            .ok_or(CrmError::NotFound("user"))?;

        // Deactivation and role changes fall under the SUPER_ADMIN
        // protection; renames do not.
        if update.is_active == Some(false) || update.role.is_some() {
            require_removable(&caller, &target)?;
        }

        if let Some(name) = update.name {
            target.name = name;
        }
        if let Some(role) = update.role {
            if !matches!(role, UserRole::TeamMember | UserRole::Member) {
                return Err(CrmError::validation(
                    "role",
                    "must be TEAM_MEMBER or MEMBER",
                ));
            }
            target.role = role;
        }
        if let Some(is_active) = update.is_active {
            target.is_active = is_active;
        }
        self.store.save_user(target.clone()).await?;
        Ok(TeamMemberView::from(&target))
    }

    pub async fn delete_team_member(&self, user_id: Uuid, caller_id: Uuid) -> Result<()> {
        let caller = self.caller(caller_id).await?;
        require_super_admin(&caller)?;
        let target = self
            .store
            .user(user_id)
            .await?
            .ok_or(CrmError::NotFound("user"))?;
        require_removable(&caller, &target)?;
        self.store.delete_user(user_id).await?;
        info!(%user_id, caller = %caller.id, "team member deleted");
        Ok(())
    }

    pub async fn change_own_password(
        &self,
        current_password: &str,
        new_password: &str,
        caller_id: Uuid,
    ) -> Result<()> {
        let mut caller = self.caller(caller_id).await?;
        self.check_rate(RateCategory::PasswordChange, &caller.id.to_string())
            .await?;

        if !self.hasher.verify(current_password, &caller.password_hash) {
            return Err(CrmError::validation(
                "current_password",
                "current password is incorrect",
            ));
        }
        if new_password.chars().count() < 8 {
            return Err(CrmError::validation(
                "new_password",
                "must be at least 8 characters",
            ));
        }
        caller.password_hash = self.hasher.hash(new_password);
        self.store.save_user(caller).await?;
        Ok(())
    }

    // ── Internals ────────────────────────────────────────────────────────

    async fn audit_step(
        &self,
        client_id: Uuid,
        table_name: &str,
        record_id: Uuid,
        changed_by: Uuid,
        old_value: Option<serde_json::Value>,
        new_value: Option<serde_json::Value>,
    ) -> Result<()> {
        self.store
            .append_audit(
                AuditEntry::new(
                    client_id,
                    table_name,
                    record_id,
                    AuditAction::StepUpdated,
                    changed_by,
                )
                .with_snapshots(old_value, new_value),
            )
            .await
    }

    /// Write-once fault attribution alongside the blocking event.
    async fn append_blocking_event(
        &self,
        client_id: Uuid,
        table_name: &str,
        record_id: Uuid,
        action: AuditAction,
        responsibility: Responsibility,
        changed_by: Uuid,
    ) -> Result<()> {
        self.store
            .append_audit(
                AuditEntry::new(client_id, table_name, record_id, action, changed_by)
                    .with_snapshots(
                        None,
                        Some(serde_json::json!({
                            "responsibility": responsibility.as_str(),
                        })),
                    ),
            )
            .await
    }
}
