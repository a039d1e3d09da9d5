//! Entity Store
//!
//! Abstract record store for the CRM core. Implementations can target a
//! relational backend; the in-memory store here backs tests and the POC
//! service. The two multi-statement writes that matter — the parallel-work
//! three-way write and the payment release with its audit entry — are single
//! trait methods so an implementation can make them atomic.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{CrmError, Result};
use crate::model::{
    AppDevelopmentTask, AuditAction, AuditEntry, Client, ComplianceDocument, OrganizationCost,
    PaymentMilestone, PlayConsoleStatus, PlayStoreAsset, SubmissionReview, User, WebsiteTask,
};

/// Abstract persistence for all CRM records
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Insert a client plus its empty compliance and console rows.
    /// Fails with `DuplicatePan` / `DuplicateEmail` on unique-key violation.
    async fn create_client(&self, client: Client) -> Result<()>;
    async fn client(&self, id: Uuid) -> Result<Option<Client>>;
    async fn clients(&self) -> Result<Vec<Client>>;
    async fn save_client(&self, client: Client) -> Result<()>;
    /// Hard delete, cascading to every sub-entity.
    async fn delete_client(&self, id: Uuid) -> Result<()>;

    async fn compliance(&self, client_id: Uuid) -> Result<Option<ComplianceDocument>>;
    async fn save_compliance(&self, doc: ComplianceDocument) -> Result<()>;

    async fn console(&self, client_id: Uuid) -> Result<Option<PlayConsoleStatus>>;
    async fn save_console(&self, console: PlayConsoleStatus) -> Result<()>;
    async fn consoles(&self) -> Result<Vec<PlayConsoleStatus>>;

    async fn cost(&self, client_id: Uuid) -> Result<Option<OrganizationCost>>;
    async fn costs(&self) -> Result<Vec<OrganizationCost>>;

    async fn website_tasks(&self, client_id: Uuid) -> Result<Vec<WebsiteTask>>;
    async fn save_website_task(&self, task: WebsiteTask) -> Result<()>;
    async fn app_tasks(&self, client_id: Uuid) -> Result<Vec<AppDevelopmentTask>>;
    async fn save_app_task(&self, task: AppDevelopmentTask) -> Result<()>;
    async fn store_assets(&self, client_id: Uuid) -> Result<Vec<PlayStoreAsset>>;
    async fn save_store_asset(&self, asset: PlayStoreAsset) -> Result<()>;

    async fn submission_review(&self, client_id: Uuid) -> Result<Option<SubmissionReview>>;
    async fn save_submission_review(&self, review: SubmissionReview) -> Result<()>;

    async fn milestone(&self, id: Uuid) -> Result<Option<PaymentMilestone>>;
    /// Milestones for a client, creation-time ascending.
    async fn milestones(&self, client_id: Uuid) -> Result<Vec<PaymentMilestone>>;
    async fn save_milestone(&self, milestone: PaymentMilestone) -> Result<()>;

    /// Atomically mark a milestone released and append the audit entry
    /// recording the before/after of the `released` field. Fails with
    /// `NotFound` / `NotEligible` / `AlreadyReleased` without writing.
    async fn release_milestone(
        &self,
        milestone_id: Uuid,
        released_by: Uuid,
    ) -> Result<PaymentMilestone>;

    /// Atomically commit the stage-7 three-way write: client flags, console
    /// sale fields, and the organization cost upsert, plus audit entries.
    async fn commit_parallel_work(
        &self,
        client: Client,
        console: PlayConsoleStatus,
        cost: OrganizationCost,
        audit: Vec<AuditEntry>,
    ) -> Result<()>;

    async fn append_audit(&self, entry: AuditEntry) -> Result<()>;
    /// Audit entries for a client, append order.
    async fn audit_log(&self, client_id: Uuid) -> Result<Vec<AuditEntry>>;

    async fn user(&self, id: Uuid) -> Result<Option<User>>;
    async fn user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn users(&self) -> Result<Vec<User>>;
    /// Upsert by id. Fails with `DuplicateEmail` if another user holds the email.
    async fn save_user(&self, user: User) -> Result<()>;
    async fn delete_user(&self, id: Uuid) -> Result<()>;
}

#[derive(Default)]
struct Inner {
    clients: HashMap<Uuid, Client>,
    compliance: HashMap<Uuid, ComplianceDocument>,
    consoles: HashMap<Uuid, PlayConsoleStatus>,
    costs: HashMap<Uuid, OrganizationCost>,
    website_tasks: HashMap<Uuid, WebsiteTask>,
    app_tasks: HashMap<Uuid, AppDevelopmentTask>,
    store_assets: HashMap<Uuid, PlayStoreAsset>,
    reviews: HashMap<Uuid, SubmissionReview>,
    milestones: HashMap<Uuid, PaymentMilestone>,
    audit: Vec<AuditEntry>,
    users: HashMap<Uuid, User>,
}

/// In-memory reference store. One `RwLock` over the whole dataset, so the
/// composite operations are genuinely atomic.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn create_client(&self, client: Client) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.clients.values().any(|c| c.pan == client.pan) {
            return Err(CrmError::DuplicatePan);
        }
        if inner.clients.values().any(|c| c.email == client.email) {
            return Err(CrmError::DuplicateEmail);
        }
        let id = client.id;
        inner
            .compliance
            .insert(id, ComplianceDocument::empty(id));
        inner.consoles.insert(id, PlayConsoleStatus::empty(id));
        inner.clients.insert(id, client);
        Ok(())
    }

    async fn client(&self, id: Uuid) -> Result<Option<Client>> {
        Ok(self.inner.read().await.clients.get(&id).cloned())
    }

    async fn clients(&self) -> Result<Vec<Client>> {
        let inner = self.inner.read().await;
        let mut all: Vec<Client> = inner.clients.values().cloned().collect();
        all.sort_by_key(|c| c.created_at);
        Ok(all)
    }

    async fn save_client(&self, client: Client) -> Result<()> {
        self.inner.write().await.clients.insert(client.id, client);
        Ok(())
    }

    async fn delete_client(&self, id: Uuid) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.clients.remove(&id).is_none() {
            return Err(CrmError::NotFound("client"));
        }
        inner.compliance.remove(&id);
        inner.consoles.remove(&id);
        inner.costs.remove(&id);
        inner.reviews.remove(&id);
        inner.website_tasks.retain(|_, t| t.client_id != id);
        inner.app_tasks.retain(|_, t| t.client_id != id);
        inner.store_assets.retain(|_, a| a.client_id != id);
        inner.milestones.retain(|_, m| m.client_id != id);
        Ok(())
    }

    async fn compliance(&self, client_id: Uuid) -> Result<Option<ComplianceDocument>> {
        Ok(self.inner.read().await.compliance.get(&client_id).cloned())
    }

    async fn save_compliance(&self, doc: ComplianceDocument) -> Result<()> {
        self.inner
            .write()
            .await
            .compliance
            .insert(doc.client_id, doc);
        Ok(())
    }

    async fn console(&self, client_id: Uuid) -> Result<Option<PlayConsoleStatus>> {
        Ok(self.inner.read().await.consoles.get(&client_id).cloned())
    }

    async fn save_console(&self, console: PlayConsoleStatus) -> Result<()> {
        self.inner
            .write()
            .await
            .consoles
            .insert(console.client_id, console);
        Ok(())
    }

    async fn consoles(&self) -> Result<Vec<PlayConsoleStatus>> {
        Ok(self.inner.read().await.consoles.values().cloned().collect())
    }

    async fn cost(&self, client_id: Uuid) -> Result<Option<OrganizationCost>> {
        Ok(self.inner.read().await.costs.get(&client_id).cloned())
    }

    async fn costs(&self) -> Result<Vec<OrganizationCost>> {
        Ok(self.inner.read().await.costs.values().cloned().collect())
    }

    async fn website_tasks(&self, client_id: Uuid) -> Result<Vec<WebsiteTask>> {
        let inner = self.inner.read().await;
        let mut tasks: Vec<WebsiteTask> = inner
            .website_tasks
            .values()
            .filter(|t| t.client_id == client_id)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.created_at);
        Ok(tasks)
    }

    async fn save_website_task(&self, task: WebsiteTask) -> Result<()> {
        self.inner.write().await.website_tasks.insert(task.id, task);
        Ok(())
    }

    async fn app_tasks(&self, client_id: Uuid) -> Result<Vec<AppDevelopmentTask>> {
        let inner = self.inner.read().await;
        let mut tasks: Vec<AppDevelopmentTask> = inner
            .app_tasks
            .values()
            .filter(|t| t.client_id == client_id)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.created_at);
        Ok(tasks)
    }

    async fn save_app_task(&self, task: AppDevelopmentTask) -> Result<()> {
        self.inner.write().await.app_tasks.insert(task.id, task);
        Ok(())
    }

    async fn store_assets(&self, client_id: Uuid) -> Result<Vec<PlayStoreAsset>> {
        let inner = self.inner.read().await;
        let mut assets: Vec<PlayStoreAsset> = inner
            .store_assets
            .values()
            .filter(|a| a.client_id == client_id)
            .cloned()
            .collect();
        assets.sort_by_key(|a| a.created_at);
        Ok(assets)
    }

    async fn save_store_asset(&self, asset: PlayStoreAsset) -> Result<()> {
        self.inner.write().await.store_assets.insert(asset.id, asset);
        Ok(())
    }

    async fn submission_review(&self, client_id: Uuid) -> Result<Option<SubmissionReview>> {
        Ok(self.inner.read().await.reviews.get(&client_id).cloned())
    }

    async fn save_submission_review(&self, review: SubmissionReview) -> Result<()> {
        self.inner
            .write()
            .await
            .reviews
            .insert(review.client_id, review);
        Ok(())
    }

    async fn milestone(&self, id: Uuid) -> Result<Option<PaymentMilestone>> {
        Ok(self.inner.read().await.milestones.get(&id).cloned())
    }

    async fn milestones(&self, client_id: Uuid) -> Result<Vec<PaymentMilestone>> {
        let inner = self.inner.read().await;
        let mut all: Vec<PaymentMilestone> = inner
            .milestones
            .values()
            .filter(|m| m.client_id == client_id)
            .cloned()
            .collect();
        all.sort_by_key(|m| m.created_at);
        Ok(all)
    }

    async fn save_milestone(&self, milestone: PaymentMilestone) -> Result<()> {
        self.inner
            .write()
            .await
            .milestones
            .insert(milestone.id, milestone);
        Ok(())
    }

    async fn release_milestone(
        &self,
        milestone_id: Uuid,
        released_by: Uuid,
    ) -> Result<PaymentMilestone> {
        let mut inner = self.inner.write().await;
        let milestone = inner
            .milestones
            .get(&milestone_id)
            .ok_or(CrmError::NotFound("milestone"))?;
        if !milestone.eligible_for_payment {
            return Err(CrmError::NotEligible);
        }
        if milestone.released {
            return Err(CrmError::AlreadyReleased);
        }

        let now = Utc::now();
        let old_value = json!({ "released": false });
        let mut updated = milestone.clone();
        updated.released = true;
        updated.released_at = Some(now);
        updated.released_by = Some(released_by);

        let entry = AuditEntry::new(
            updated.client_id,
            "payment_milestones",
            updated.id,
            AuditAction::PaymentReleased,
            released_by,
        )
        .with_snapshots(
            Some(old_value),
            Some(json!({
                "released": true,
                "released_at": updated.released_at,
                "released_by": released_by,
            })),
        );

        // Both writes under the same lock: no released milestone without its
        // audit entry.
        inner.milestones.insert(milestone_id, updated.clone());
        inner.audit.push(entry);
        Ok(updated)
    }

    async fn commit_parallel_work(
        &self,
        client: Client,
        console: PlayConsoleStatus,
        cost: OrganizationCost,
        audit: Vec<AuditEntry>,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.clients.contains_key(&client.id) {
            return Err(CrmError::NotFound("client"));
        }
        inner.consoles.insert(console.client_id, console);
        inner.costs.insert(cost.client_id, cost);
        inner.clients.insert(client.id, client);
        inner.audit.extend(audit);
        Ok(())
    }

    async fn append_audit(&self, entry: AuditEntry) -> Result<()> {
        self.inner.write().await.audit.push(entry);
        Ok(())
    }

    async fn audit_log(&self, client_id: Uuid) -> Result<Vec<AuditEntry>> {
        Ok(self
            .inner
            .read()
            .await
            .audit
            .iter()
            .filter(|e| e.client_id == client_id)
            .cloned()
            .collect())
    }

    async fn user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .inner
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn users(&self) -> Result<Vec<User>> {
        let inner = self.inner.read().await;
        let mut all: Vec<User> = inner.users.values().cloned().collect();
        all.sort_by_key(|u| u.created_at);
        Ok(all)
    }

    async fn save_user(&self, user: User) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner
            .users
            .values()
            .any(|u| u.email == user.email && u.id != user.id)
        {
            return Err(CrmError::DuplicateEmail);
        }
        inner.users.insert(user.id, user);
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> Result<()> {
        if self.inner.write().await.users.remove(&id).is_none() {
            return Err(CrmError::NotFound("user"));
        }
        Ok(())
    }
}
