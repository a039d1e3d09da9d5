//! End-to-end scenarios against the service facade and the in-memory store.

use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use launchdesk::engine::dependency::FailureCategory;
use launchdesk::engine::finance::Period;
use launchdesk::engine::mutation::{
    CertificateInput, ClientInfoInput, DomainInput, ParallelWorkInput, PlayConsoleInput, StepUpdate,
};
use launchdesk::error::CrmError;
use launchdesk::identity::{PasswordHasher, Sha256Hasher};
use launchdesk::model::{
    CertStatus, CompanyType, PublishingStatus, Responsibility, TaskStatus, User, UserRole,
};
use launchdesk::rate_limit::NoopRateLimiter;
use launchdesk::service::{StatusFilter, TeamMemberInput, TeamMemberUpdate};
use launchdesk::store::{EntityStore, MemoryStore};
use launchdesk::{CrmService, EngineConfig};

struct Harness {
    service: CrmService,
    store: Arc<MemoryStore>,
    admin: User,
    member: User,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn harness() -> Harness {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let hasher = Sha256Hasher;
    let admin = User::new(
        "Root",
        "root@launchdesk.example",
        hasher.hash("rootpassword"),
        UserRole::SuperAdmin,
    );
    let member = User::new(
        "Meera",
        "meera@launchdesk.example",
        hasher.hash("meerapassword"),
        UserRole::TeamMember,
    );
    store.save_user(admin.clone()).await.unwrap();
    store.save_user(member.clone()).await.unwrap();

    let service = CrmService::new(
        store.clone(),
        Arc::new(hasher),
        Arc::new(NoopRateLimiter),
        EngineConfig::default(),
    );
    Harness {
        service,
        store,
        admin,
        member,
    }
}

fn intake(pan: &str, email: &str) -> ClientInfoInput {
    ClientInfoInput {
        legal_name: "Acme Apps Pvt Ltd".to_string(),
        pan: pan.to_string(),
        company_type: CompanyType::PvtLtd,
        email: email.to_string(),
        phone: Some("+91-9999999999".to_string()),
    }
}

fn approved() -> CertificateInput {
    CertificateInput {
        status: CertStatus::Approved,
        document_url: None,
        registration_number: Some("REG-001".to_string()),
    }
}

#[tokio::test]
async fn test_full_workflow_to_completion() {
    let h = harness().await;
    let caller = h.member.id;
    let view = h
        .service
        .create_client(intake("ABCDE1234F", "ops@acme.example"), caller)
        .await
        .unwrap();
    let id = view.client.id;
    assert_eq!(view.state.current_step, 2);
    assert_eq!(view.state.status, "MSME Registration");

    let view = h
        .service
        .update_step(id, 2, StepUpdate::Msme(approved()), caller)
        .await
        .unwrap();
    assert_eq!(view.state.current_step, 3);

    let view = h
        .service
        .update_step(id, 3, StepUpdate::Duns(approved()), caller)
        .await
        .unwrap();
    assert_eq!(view.state.current_step, 4);
    assert_eq!(view.state.status, "Review & Submit");

    let view = h.service.submit_application(id, caller).await.unwrap();
    assert_eq!(view.state.current_step, 5);

    let console = PlayConsoleInput {
        account_created: true,
        account_paid: true,
        identity_verified: true,
        company_verified: true,
        ..Default::default()
    };
    let view = h
        .service
        .update_step(id, 5, StepUpdate::PlayConsole(console), caller)
        .await
        .unwrap();
    assert_eq!(view.state.current_step, 6);
    assert_eq!(view.state.status, "Domain Purchase");

    let view = h
        .service
        .update_step(
            id,
            6,
            StepUpdate::Domain(DomainInput {
                website_url: "acme.example".to_string(),
                website_verified: true,
            }),
            caller,
        )
        .await
        .unwrap();
    assert_eq!(view.state.current_step, 7);
    assert_eq!(view.state.status, "Parallel Work");

    let parallel = ParallelWorkInput {
        published: true,
        live_url: Some("https://play.example/acme".to_string()),
        account_sale_complete: true,
        account_sale_amount: Some(Decimal::from(900)),
        domain_cost: Some(Decimal::from(12)),
        ..Default::default()
    };
    let view = h
        .service
        .update_step(id, 7, StepUpdate::ParallelWork(parallel), caller)
        .await
        .unwrap();
    assert_eq!(view.state.status, "Completed");
    assert!(!view.state.blocked);
}

#[tokio::test]
async fn test_console_ready_consistency_after_step_five_write() {
    let h = harness().await;
    let caller = h.member.id;
    let id = h
        .service
        .create_client(intake("ABCDE1234F", "ops@acme.example"), caller)
        .await
        .unwrap()
        .client
        .id;

    let partial = PlayConsoleInput {
        account_created: true,
        account_paid: true,
        identity_verified: true,
        company_verified: false,
        ..Default::default()
    };
    h.service
        .update_step(id, 5, StepUpdate::PlayConsole(partial), caller)
        .await
        .unwrap();

    let stored = h.store.console(id).await.unwrap().unwrap();
    assert_eq!(stored.console_ready, stored.ready());
    assert!(!stored.console_ready);
}

#[tokio::test]
async fn test_ownership_scoping_on_get_client() {
    let h = harness().await;
    let id = h
        .service
        .create_client(intake("ABCDE1234F", "ops@acme.example"), h.member.id)
        .await
        .unwrap()
        .client
        .id;

    // A different team member is shut out.
    let stranger = User::new(
        "Dev",
        "dev@launchdesk.example",
        Sha256Hasher.hash("devpassword"),
        UserRole::TeamMember,
    );
    h.store.save_user(stranger.clone()).await.unwrap();
    assert!(matches!(
        h.service.get_client(id, stranger.id).await,
        Err(CrmError::Forbidden)
    ));

    // The super admin is not.
    assert!(h.service.get_client(id, h.admin.id).await.is_ok());

    // A portal user linked to the client sees their own record.
    let mut portal = User::new(
        "Acme Portal",
        "portal@acme.example",
        Sha256Hasher.hash("portalpass"),
        UserRole::Client,
    );
    portal.client_id = Some(id);
    h.store.save_user(portal.clone()).await.unwrap();
    assert!(h.service.get_client(id, portal.id).await.is_ok());
}

#[tokio::test]
async fn test_duplicate_pan_and_email_conflicts() {
    let h = harness().await;
    h.service
        .create_client(intake("ABCDE1234F", "ops@acme.example"), h.member.id)
        .await
        .unwrap();

    assert!(matches!(
        h.service
            .create_client(intake("ABCDE1234F", "other@acme.example"), h.member.id)
            .await,
        Err(CrmError::DuplicatePan)
    ));
    assert!(matches!(
        h.service
            .create_client(intake("FGHIJ5678K", "ops@acme.example"), h.member.id)
            .await,
        Err(CrmError::DuplicateEmail)
    ));
}

#[tokio::test]
async fn test_list_clients_filters_and_paginates() {
    let h = harness().await;
    let caller = h.member.id;
    let blocked_id = h
        .service
        .create_client(intake("ABCDE1234F", "one@acme.example"), caller)
        .await
        .unwrap()
        .client
        .id;
    h.service
        .create_client(intake("FGHIJ5678K", "two@acme.example"), caller)
        .await
        .unwrap();
    h.service
        .update_step(
            blocked_id,
            2,
            StepUpdate::Msme(CertificateInput {
                status: CertStatus::Pending,
                document_url: None,
                registration_number: None,
            }),
            caller,
        )
        .await
        .unwrap();

    let all = h
        .service
        .list_clients(caller, 1, Some(1), StatusFilter::All, None)
        .await
        .unwrap();
    assert_eq!(all.meta.total, 2);
    assert_eq!(all.meta.total_pages, 2);
    assert_eq!(all.data.len(), 1);

    let blocked = h
        .service
        .list_clients(caller, 1, None, StatusFilter::Blocked, None)
        .await
        .unwrap();
    assert_eq!(blocked.meta.total, 1);
    assert_eq!(blocked.data[0].id, blocked_id);
    assert_eq!(blocked.data[0].status, "MSME Pending");

    let searched = h
        .service
        .list_clients(caller, 1, None, StatusFilter::All, Some("two@"))
        .await
        .unwrap();
    assert_eq!(searched.meta.total, 1);

    // Another member sees none of them.
    let stranger = User::new(
        "Dev",
        "dev@launchdesk.example",
        Sha256Hasher.hash("devpassword"),
        UserRole::TeamMember,
    );
    h.store.save_user(stranger.clone()).await.unwrap();
    let none = h
        .service
        .list_clients(stranger.id, 1, None, StatusFilter::All, None)
        .await
        .unwrap();
    assert_eq!(none.meta.total, 0);
}

#[tokio::test]
async fn test_payment_release_path_and_double_release() {
    let h = harness().await;
    let caller = h.member.id;
    let id = h
        .service
        .create_client(intake("ABCDE1234F", "ops@acme.example"), caller)
        .await
        .unwrap()
        .client
        .id;

    // A blocked website task gates eligibility and names itself.
    h.service
        .record_website_task(id, "Design", TaskStatus::Completed, None, caller)
        .await
        .unwrap();
    h.service
        .record_website_task(
            id,
            "Search console setup",
            TaskStatus::Blocked,
            Some(Responsibility::Client),
            caller,
        )
        .await
        .unwrap();
    let eligibility = h.service.check_payment_eligibility(id, caller).await.unwrap();
    assert!(!eligibility.eligible);
    assert_eq!(
        eligibility.blocked_by,
        vec!["Search console setup".to_string()]
    );

    // Unblock: all tasks complete makes the website condition pass.
    h.service
        .record_website_task(id, "Search console setup", TaskStatus::Completed, None, caller)
        .await
        .unwrap();
    let eligibility = h.service.check_payment_eligibility(id, caller).await.unwrap();
    assert!(eligibility.eligible);
    assert_eq!(eligibility.reason, "Website live and all tasks verified");

    // Milestone release is atomic with its audit entry and refuses a rerun.
    let milestone = h
        .service
        .create_milestone(id, "Go-live", Decimal::from(500), true, caller)
        .await
        .unwrap();
    let released = h.service.release_payment(milestone.id, caller).await.unwrap();
    assert!(released.released);
    assert!(matches!(
        h.service.release_payment(milestone.id, caller).await,
        Err(CrmError::AlreadyReleased)
    ));

    let audit = h.store.audit_log(id).await.unwrap();
    let release_entries = audit
        .iter()
        .filter(|e| e.action == launchdesk::model::AuditAction::PaymentReleased)
        .count();
    assert_eq!(release_entries, 1);
}

#[tokio::test]
async fn test_timeline_extension_counts_blocking_events() {
    let h = harness().await;
    let caller = h.member.id;
    let id = h
        .service
        .create_client(intake("ABCDE1234F", "ops@acme.example"), caller)
        .await
        .unwrap()
        .client
        .id;

    h.service
        .record_website_task(
            id,
            "Content upload",
            TaskStatus::PendingClient,
            Some(Responsibility::Client),
            caller,
        )
        .await
        .unwrap();
    h.service
        .update_step(
            id,
            2,
            StepUpdate::Msme(CertificateInput {
                status: CertStatus::Pending,
                document_url: None,
                registration_number: None,
            }),
            caller,
        )
        .await
        .unwrap();

    let extension = h.service.timeline_extension(id, caller).await.unwrap();
    assert_eq!(extension.days_extended, 2);
    assert_eq!(extension.events.len(), 2);
}

#[tokio::test]
async fn test_app_task_fault_attribution() {
    let h = harness().await;
    let caller = h.member.id;
    let id = h
        .service
        .create_client(intake("ABCDE1234F", "ops@acme.example"), caller)
        .await
        .unwrap()
        .client
        .id;

    // A build failure is the company's fault; no blocking event is written
    // for an in-progress retry.
    let task = h
        .service
        .record_app_task(
            id,
            "Release build",
            TaskStatus::Blocked,
            Some(FailureCategory::BuildFailure),
            caller,
        )
        .await
        .unwrap();
    assert_eq!(task.responsibility, Some(Responsibility::Company));

    // Missing paperwork blocks on the client.
    let task = h
        .service
        .record_app_task(
            id,
            "Signing key paperwork",
            TaskStatus::PendingClient,
            Some(FailureCategory::MissingDocument),
            caller,
        )
        .await
        .unwrap();
    assert_eq!(task.responsibility, Some(Responsibility::Client));

    // Both transitions left permanent blocking events behind.
    let extension = h.service.timeline_extension(id, caller).await.unwrap();
    assert_eq!(extension.days_extended, 2);

    // Asset rejection pins responsibility on the client.
    let asset = h
        .service
        .record_store_asset(
            id,
            "Screenshots",
            Some("https://cdn.example/shots.zip".to_string()),
            TaskStatus::Failed,
            caller,
        )
        .await
        .unwrap();
    assert_eq!(asset.responsibility, Some(Responsibility::Client));
    let asset = h
        .service
        .record_store_asset(id, "Screenshots", None, TaskStatus::Completed, caller)
        .await
        .unwrap();
    assert!(asset.responsibility.is_none());
    assert_eq!(asset.url.as_deref(), Some("https://cdn.example/shots.zip"));
}

#[tokio::test]
async fn test_submission_review_tracks_publishing_status() {
    let h = harness().await;
    let caller = h.member.id;
    let id = h
        .service
        .create_client(intake("ABCDE1234F", "ops@acme.example"), caller)
        .await
        .unwrap()
        .client
        .id;
    assert_eq!(
        h.store.client(id).await.unwrap().unwrap().publishing_status,
        PublishingStatus::NotSubmitted
    );

    h.service
        .record_submission_review(id, TaskStatus::InProgress, false, None, caller)
        .await
        .unwrap();
    assert_eq!(
        h.store.client(id).await.unwrap().unwrap().publishing_status,
        PublishingStatus::InReview
    );

    h.service
        .record_submission_review(id, TaskStatus::Completed, true, None, caller)
        .await
        .unwrap();
    assert_eq!(
        h.store.client(id).await.unwrap().unwrap().publishing_status,
        PublishingStatus::Production
    );
}

#[tokio::test]
async fn test_dashboard_stats_scoped_by_caller() {
    let h = harness().await;
    let member_client = h
        .service
        .create_client(intake("ABCDE1234F", "one@acme.example"), h.member.id)
        .await
        .unwrap()
        .client
        .id;
    let admin_client = h
        .service
        .create_client(intake("FGHIJ5678K", "two@acme.example"), h.admin.id)
        .await
        .unwrap()
        .client
        .id;

    for (id, caller, amount) in [
        (member_client, h.member.id, 900),
        (admin_client, h.admin.id, 400),
    ] {
        let sale = ParallelWorkInput {
            account_sale_complete: true,
            account_sale_amount: Some(Decimal::from(amount)),
            domain_cost: Some(Decimal::from(10)),
            ..Default::default()
        };
        h.service
            .update_step(id, 7, StepUpdate::ParallelWork(sale), caller)
            .await
            .unwrap();
    }

    // Super admin sees both sales and both cost rows (fee defaults to 25).
    let stats = h
        .service
        .dashboard_stats(Period::Days30, h.admin.id)
        .await
        .unwrap();
    assert_eq!(stats.account_sale.total, Decimal::from(1300));
    assert_eq!(stats.account_sale.count, 2);
    assert_eq!(stats.org_liability.play_console, Decimal::from(50));
    assert_eq!(stats.org_liability.total, Decimal::from(70));
    assert_eq!(stats.net_profit, Decimal::from(1230));

    // The team member sees only their own client.
    let stats = h
        .service
        .dashboard_stats(Period::Days30, h.member.id)
        .await
        .unwrap();
    assert_eq!(stats.account_sale.total, Decimal::from(900));
    assert_eq!(stats.account_sale.count, 1);
}

#[tokio::test]
async fn test_team_management_protections() {
    let h = harness().await;

    // Non-admin cannot manage the team.
    assert!(matches!(
        h.service.list_team(h.member.id).await,
        Err(CrmError::Forbidden)
    ));

    // Team-member emails go through the same validation as client emails.
    assert!(matches!(
        h.service
            .create_team_member(
                TeamMemberInput {
                    name: "Dev".to_string(),
                    email: "dev@launchdesk".to_string(),
                    password: "devpassword".to_string(),
                    role: UserRole::TeamMember,
                },
                h.admin.id,
            )
            .await,
        Err(CrmError::Validation { field: "email", .. })
    ));

    let created = h
        .service
        .create_team_member(
            TeamMemberInput {
                name: "Dev".to_string(),
                email: "dev@launchdesk.example".to_string(),
                password: "devpassword".to_string(),
                role: UserRole::TeamMember,
            },
            h.admin.id,
        )
        .await
        .unwrap();

    // Deactivating or deleting a SUPER_ADMIN always fails, self included.
    let second_admin = User::new(
        "Root2",
        "root2@launchdesk.example",
        Sha256Hasher.hash("rootpassword2"),
        UserRole::SuperAdmin,
    );
    h.store.save_user(second_admin.clone()).await.unwrap();
    assert!(matches!(
        h.service.delete_team_member(second_admin.id, h.admin.id).await,
        Err(CrmError::Forbidden)
    ));
    assert!(matches!(
        h.service
            .update_team_member(
                h.admin.id,
                TeamMemberUpdate {
                    is_active: Some(false),
                    ..Default::default()
                },
                h.admin.id,
            )
            .await,
        Err(CrmError::Forbidden)
    ));

    // Ordinary members can be deactivated and deleted.
    h.service
        .update_team_member(
            created.id,
            TeamMemberUpdate {
                is_active: Some(false),
                ..Default::default()
            },
            h.admin.id,
        )
        .await
        .unwrap();
    h.service
        .delete_team_member(created.id, h.admin.id)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_change_own_password() {
    let h = harness().await;
    assert!(matches!(
        h.service
            .change_own_password("wrong", "newpassword1", h.member.id)
            .await,
        Err(CrmError::Validation { field: "current_password", .. })
    ));
    assert!(matches!(
        h.service
            .change_own_password("meerapassword", "short", h.member.id)
            .await,
        Err(CrmError::Validation { field: "new_password", .. })
    ));
    h.service
        .change_own_password("meerapassword", "newpassword1", h.member.id)
        .await
        .unwrap();

    let stored = h.store.user(h.member.id).await.unwrap().unwrap();
    assert!(Sha256Hasher.verify("newpassword1", &stored.password_hash));
}

#[tokio::test]
async fn test_delete_client_requires_super_admin_and_cascades() {
    let h = harness().await;
    let id = h
        .service
        .create_client(intake("ABCDE1234F", "ops@acme.example"), h.member.id)
        .await
        .unwrap()
        .client
        .id;
    h.service
        .create_milestone(id, "Go-live", Decimal::from(100), false, h.member.id)
        .await
        .unwrap();

    assert!(matches!(
        h.service.delete_client(id, h.member.id).await,
        Err(CrmError::Forbidden)
    ));
    h.service.delete_client(id, h.admin.id).await.unwrap();
    assert!(h.store.client(id).await.unwrap().is_none());
    assert!(h.store.milestones(id).await.unwrap().is_empty());
    // The audit trail outlives the record.
    assert!(!h.store.audit_log(id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_deactivated_caller_is_unauthenticated() {
    let h = harness().await;
    let mut disabled = User::new(
        "Gone",
        "gone@launchdesk.example",
        Sha256Hasher.hash("gonepassword"),
        UserRole::TeamMember,
    );
    disabled.is_active = false;
    h.store.save_user(disabled.clone()).await.unwrap();

    assert!(matches!(
        h.service
            .list_clients(disabled.id, 1, None, StatusFilter::All, None)
            .await,
        Err(CrmError::Unauthenticated)
    ));
    assert!(matches!(
        h.service
            .list_clients(Uuid::new_v4(), 1, None, StatusFilter::All, None)
            .await,
        Err(CrmError::Unauthenticated)
    ));
}

#[tokio::test]
async fn test_step_payload_mismatch_rejected() {
    let h = harness().await;
    let id = h
        .service
        .create_client(intake("ABCDE1234F", "ops@acme.example"), h.member.id)
        .await
        .unwrap()
        .client
        .id;

    assert!(matches!(
        h.service
            .update_step(id, 3, StepUpdate::Msme(approved()), h.member.id)
            .await,
        Err(CrmError::Validation { field: "step", .. })
    ));
    assert!(matches!(
        h.service
            .update_step(id, 9, StepUpdate::ReviewSubmit, h.member.id)
            .await,
        Err(CrmError::Validation { field: "step", .. })
    ));
}
