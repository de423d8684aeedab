//! End-to-end tests of the pairing workflow against a live PostgreSQL.
//!
//! Each test provisions its own parent and family so tests can run in any
//! order against a shared database. All tests skip (with a note) when
//! DATABASE_URL is unset.

use sqlx::PgPool;
use uuid::Uuid;

use antbox_api::error::ApiError;
use antbox_api::models::link_request::{
    ApprovalMode, CreateLinkRequestRequest, ParentApprovalPayload, DEFAULT_REJECTION_REASON,
};
use antbox_api::services::devices::DevicePreferenceService;
use antbox_api::services::family::FamilyService;
use antbox_api::services::link_requests::LinkRequestService;

macro_rules! require_db {
    () => {
        match test_pool().await {
            Some(pool) => pool,
            None => {
                eprintln!("skipping: DATABASE_URL not set");
                return;
            }
        }
    };
}

async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("could not connect to DATABASE_URL");
    antbox_api::db::run_migrations(&pool)
        .await
        .expect("migrations failed");
    Some(pool)
}

async fn new_parent(pool: &PgPool) -> Uuid {
    let email = format!("parent-{}@test.antbox.app", Uuid::new_v4());
    sqlx::query_scalar(
        "INSERT INTO parents (email, password_hash, display_name)
         VALUES ($1, 'not-a-real-hash', '보호자') RETURNING id",
    )
    .bind(email)
    .fetch_one(pool)
    .await
    .expect("insert parent")
}

async fn new_family(pool: &PgPool) -> (Uuid, String) {
    let parent_id = new_parent(pool).await;
    let code = FamilyService::create_family_group(pool, parent_id)
        .await
        .expect("create family group");
    (parent_id, code)
}

fn submit(code: &str, device_id: Option<String>) -> CreateLinkRequestRequest {
    CreateLinkRequestRequest {
        family_code: code.to_string(),
        child_nickname: "토토".into(),
        child_avatar: "🐼".into(),
        child_age: Some(5),
        device_id,
    }
}

fn approval_payload() -> ParentApprovalPayload {
    ParentApprovalPayload {
        confirmed_nickname: "토토".into(),
        confirmed_age: 5,
        service_terms_agreed: true,
        privacy_agreed: true,
        push_agreed: false,
        reward_enabled: true,
        base_coin_reward: 10,
        approval_mode: ApprovalMode::Manual,
        recovery_email: None,
        usage_start_time: "07:00".into(),
        usage_end_time: "20:00".into(),
        daily_max_completion: 10,
    }
}

async fn roster_len(pool: &PgPool, code: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM group_children WHERE family_code = $1")
        .bind(code)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn child_submission_creates_pending_request() {
    let pool = require_db!();
    let (_parent, code) = new_family(&pool).await;

    let request = LinkRequestService::create(&pool, &submit(&code, None))
        .await
        .expect("create request");

    assert_eq!(request.status, "pending");
    assert_eq!(request.family_code, code);
    assert_eq!(request.child_nickname, "토토");
    assert_eq!(request.child_avatar, "🐼");
    assert_eq!(request.child_age, Some(5));
    assert!(request.parent_id.is_none());
    assert!(request.child_id.is_none());
}

#[tokio::test]
async fn family_code_is_normalized_on_submission() {
    let pool = require_db!();
    let (_parent, code) = new_family(&pool).await;

    let lowered = format!("  {} ", code.to_lowercase());
    let request = LinkRequestService::create(&pool, &submit(&lowered, None))
        .await
        .expect("create request with unnormalized code");
    assert_eq!(request.family_code, code);
}

#[tokio::test]
async fn unknown_code_fails_and_writes_nothing() {
    let pool = require_db!();

    // 36^6 space: treat ZZZZZZ as reserved-for-tests and make sure of it.
    assert!(FamilyService::is_code_unique(&pool, "ZZZZZZ").await.unwrap());

    let err = LinkRequestService::create(&pool, &submit("ZZZZZZ", None))
        .await
        .expect_err("unknown code must fail");
    assert!(matches!(err, ApiError::InvalidFamilyCode));

    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM link_requests WHERE family_code = 'ZZZZZZ'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn approval_creates_child_updates_roster_and_resolves_request() {
    let pool = require_db!();
    let (parent_id, code) = new_family(&pool).await;

    let request = LinkRequestService::create(&pool, &submit(&code, None))
        .await
        .unwrap();

    // The parent sees it in the pending list first.
    let pending = LinkRequestService::list_pending_for_parent(&pool, parent_id)
        .await
        .unwrap();
    assert!(pending.iter().any(|r| r.id == request.id));

    let child = LinkRequestService::approve(&pool, parent_id, request.id, &approval_payload())
        .await
        .expect("approve");

    assert_eq!(child.family_code, code);
    assert_eq!(child.nickname, "토토");
    assert_eq!(child.avatar, "🐼");
    assert_eq!(child.age, Some(5));
    assert_eq!(child.base_coin_reward, 10);
    assert_eq!(child.approval_mode, "manual");

    let on_roster: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM group_children WHERE family_code = $1 AND child_id = $2)",
    )
    .bind(&code)
    .bind(child.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert!(on_roster);

    let resolved = LinkRequestService::get_by_id(&pool, request.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(resolved.status, "approved");
    assert_eq!(resolved.child_id, Some(child.id));
    assert_eq!(resolved.parent_id, Some(parent_id));
    assert!(resolved.parent_approval.is_some());

    // Resolved requests drop out of the pending list.
    let pending = LinkRequestService::list_pending_for_parent(&pool, parent_id)
        .await
        .unwrap();
    assert!(!pending.iter().any(|r| r.id == request.id));
}

#[tokio::test]
async fn second_approval_fails_without_duplicating_the_child() {
    let pool = require_db!();
    let (parent_id, code) = new_family(&pool).await;

    let request = LinkRequestService::create(&pool, &submit(&code, None))
        .await
        .unwrap();
    LinkRequestService::approve(&pool, parent_id, request.id, &approval_payload())
        .await
        .unwrap();

    let err = LinkRequestService::approve(&pool, parent_id, request.id, &approval_payload())
        .await
        .expect_err("double approval must fail");
    assert!(matches!(err, ApiError::RequestNotPending));

    let children: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM children WHERE family_code = $1")
            .bind(&code)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(children, 1);
}

#[tokio::test]
async fn rejection_stores_reason_verbatim_and_leaves_no_side_effects() {
    let pool = require_db!();
    let (parent_id, code) = new_family(&pool).await;

    let request = LinkRequestService::create(&pool, &submit(&code, None))
        .await
        .unwrap();

    let rejected = LinkRequestService::reject(
        &pool,
        parent_id,
        request.id,
        Some("코드를 다시 확인해주세요".into()),
    )
    .await
    .expect("reject");

    assert_eq!(rejected.status, "rejected");
    assert_eq!(
        rejected.rejection_reason.as_deref(),
        Some("코드를 다시 확인해주세요")
    );

    let children: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM children WHERE family_code = $1")
            .bind(&code)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(children, 0);
    assert_eq!(roster_len(&pool, &code).await, 0);

    // And the terminal state is sticky: no approval after rejection.
    let err = LinkRequestService::approve(&pool, parent_id, request.id, &approval_payload())
        .await
        .expect_err("approve after reject must fail");
    assert!(matches!(err, ApiError::RequestNotPending));
}

#[tokio::test]
async fn blank_rejection_reason_falls_back_to_the_canned_message() {
    let pool = require_db!();
    let (parent_id, code) = new_family(&pool).await;

    let request = LinkRequestService::create(&pool, &submit(&code, None))
        .await
        .unwrap();
    let rejected = LinkRequestService::reject(&pool, parent_id, request.id, Some("   ".into()))
        .await
        .unwrap();
    assert_eq!(
        rejected.rejection_reason.as_deref(),
        Some(DEFAULT_REJECTION_REASON)
    );
}

#[tokio::test]
async fn get_or_create_family_code_is_idempotent() {
    let pool = require_db!();
    let parent_id = new_parent(&pool).await;

    let first = FamilyService::get_or_create_family_code(&pool, parent_id)
        .await
        .unwrap();
    let second = FamilyService::get_or_create_family_code(&pool, parent_id)
        .await
        .unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn dangling_family_code_is_healed() {
    let pool = require_db!();
    let parent_id = new_parent(&pool).await;

    // Point the parent at a group that does not exist.
    sqlx::query("UPDATE parents SET group_code = 'GONE00' WHERE id = $1")
        .bind(parent_id)
        .execute(&pool)
        .await
        .unwrap();

    let healed = FamilyService::get_or_create_family_code(&pool, parent_id)
        .await
        .unwrap();
    assert_ne!(healed, "GONE00");
    assert!(!FamilyService::is_code_unique(&pool, &healed).await.unwrap());
}

#[tokio::test]
async fn a_parent_cannot_resolve_another_familys_request() {
    let pool = require_db!();
    let (_owner, code) = new_family(&pool).await;
    let (intruder, _other_code) = new_family(&pool).await;

    let request = LinkRequestService::create(&pool, &submit(&code, None))
        .await
        .unwrap();

    let err = LinkRequestService::approve(&pool, intruder, request.id, &approval_payload())
        .await
        .expect_err("foreign approval must fail");
    assert!(matches!(err, ApiError::Forbidden));

    let err = LinkRequestService::reject(&pool, intruder, request.id, None)
        .await
        .expect_err("foreign rejection must fail");
    assert!(matches!(err, ApiError::Forbidden));

    // Still pending for the rightful owner.
    let request = LinkRequestService::get_by_id(&pool, request.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(request.status, "pending");
}

#[tokio::test]
async fn device_pointer_tracks_the_active_request_and_resets_when_stale() {
    let pool = require_db!();
    let (_parent, code) = new_family(&pool).await;
    let device_id = format!("test-device-{}", Uuid::new_v4().simple());

    let request = LinkRequestService::create(&pool, &submit(&code, Some(device_id.clone())))
        .await
        .unwrap();

    let resolved = DevicePreferenceService::resolve_active_request(&pool, &device_id)
        .await
        .expect("pointer resolves to the request");
    assert_eq!(resolved.id, request.id);

    // Simulate the request vanishing out from under the pointer.
    sqlx::query("DELETE FROM link_requests WHERE id = $1")
        .bind(request.id)
        .execute(&pool)
        .await
        .unwrap();

    let err = DevicePreferenceService::resolve_active_request(&pool, &device_id)
        .await
        .expect_err("stale pointer must be reported");
    assert!(matches!(err, ApiError::StaleRequestPointer));

    // The stale pointer was cleared, so the device is back to a clean slate.
    let err = DevicePreferenceService::resolve_active_request(&pool, &device_id)
        .await
        .expect_err("no pointer after reset");
    assert!(matches!(err, ApiError::NoActiveRequest));
}
