//! Interactive activity operations and the approval state machine.

mod common;

use assert_matches::assert_matches;
use serde_json::json;

use common::{bored_pile_payload, Harness, SITE};
use pilelog_core::activity::ActivityStatus;
use pilelog_core::error::CoreError;
use pilelog_core::notify::{KIND_ACTIVITY_APPROVED, KIND_ACTIVITY_REJECTED, KIND_LOW_STOCK};
use pilelog_core::patch::CreateActivity;
use pilelog_core::roles::Actor;
use pilelog_engine::EditActivity;
use pilelog_store::{Activity, Store, MOVEMENT_DEDUCT};

async fn create(h: &Harness, actor: &Actor, payload: serde_json::Value) -> Activity {
    let input = CreateActivity::from_payload(&payload).unwrap();
    h.engine.activities.create(actor, input).await.unwrap().activity
}

async fn submitted(h: &Harness, payload: serde_json::Value) -> Activity {
    let a = create(h, &h.operator, payload).await;
    h.engine.activities.submit(&h.operator, &a.id).await.unwrap()
}

fn edit(payload: serde_json::Value) -> EditActivity {
    EditActivity::from_payload(&payload).unwrap()
}

// ---------------------------------------------------------------------------
// Test: create
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_assigns_id_and_derives_quantities() {
    let h = Harness::new().await;
    let a = create(&h, &h.operator, bored_pile_payload()).await;

    assert!(!a.id.is_empty());
    assert_eq!(a.status, ActivityStatus::Draft);
    assert_eq!(a.version, 1);
    assert_eq!(a.details["overconsumptionPct"], 14.9);
    assert_eq!(h.store.current_version().await.unwrap(), 1);
}

#[tokio::test]
async fn create_with_known_client_change_id_returns_existing() {
    let h = Harness::new().await;
    let mut payload = bored_pile_payload();
    payload["clientChangeId"] = json!("dev-42");

    let first = h
        .engine
        .activities
        .create(&h.operator, CreateActivity::from_payload(&payload).unwrap())
        .await
        .unwrap();
    let again = h
        .engine
        .activities
        .create(&h.operator, CreateActivity::from_payload(&payload).unwrap())
        .await
        .unwrap();

    assert!(first.created);
    assert!(!again.created);
    assert_eq!(again.activity.id, first.activity.id);
    assert_eq!(h.store.current_version().await.unwrap(), 1);
}

#[tokio::test]
async fn create_rejects_negative_dimensions() {
    let h = Harness::new().await;
    let mut payload = bored_pile_payload();
    payload["details"]["depth"] = json!(-3);

    let err = h
        .engine
        .activities
        .create(&h.operator, CreateActivity::from_payload(&payload).unwrap())
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::Validation(_));
}

// ---------------------------------------------------------------------------
// Test: state machine
// ---------------------------------------------------------------------------

#[tokio::test]
async fn approve_on_draft_fails() {
    let h = Harness::new().await;
    let a = create(&h, &h.operator, bored_pile_payload()).await;

    let err = h.engine.activities.approve(&h.supervisor, &a.id).await.unwrap_err();
    assert_matches!(err, CoreError::Validation(msg) if msg.contains("DRAFT"));
}

#[tokio::test]
async fn approved_activity_is_frozen() {
    let h = Harness::new().await;
    let a = submitted(&h, bored_pile_payload()).await;
    h.engine.activities.approve(&h.supervisor, &a.id).await.unwrap();

    assert_matches!(
        h.engine.activities.submit(&h.operator, &a.id).await,
        Err(CoreError::Validation(_))
    );
    assert_matches!(
        h.engine
            .activities
            .edit(&h.operator, &a.id, edit(json!({"notes": "after"})))
            .await,
        Err(CoreError::Validation(_))
    );
    assert_matches!(
        h.engine.activities.delete(&h.operator, &a.id).await,
        Err(CoreError::Validation(_))
    );
}

#[tokio::test]
async fn rejected_activity_can_be_edited_and_resubmitted() {
    let h = Harness::new().await;
    let a = submitted(&h, bored_pile_payload()).await;

    let rejected = h
        .engine
        .activities
        .reject(&h.supervisor, &a.id, "depth log missing")
        .await
        .unwrap();
    assert_eq!(rejected.status, ActivityStatus::Rejected);
    assert_eq!(rejected.rejection_notes.as_deref(), Some("depth log missing"));

    let edited = h
        .engine
        .activities
        .edit(&h.operator, &a.id, edit(json!({"notes": "depth log attached"})))
        .await
        .unwrap();
    assert_eq!(edited.status, ActivityStatus::Draft);

    let resubmitted = h.engine.activities.submit(&h.operator, &a.id).await.unwrap();
    assert_eq!(resubmitted.status, ActivityStatus::Submitted);
}

#[tokio::test]
async fn reject_requires_notes() {
    let h = Harness::new().await;
    let a = submitted(&h, bored_pile_payload()).await;

    let err = h
        .engine
        .activities
        .reject(&h.supervisor, &a.id, "   ")
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::Validation(_));
    assert_eq!(
        h.engine.activities.get(&a.id).await.unwrap().status,
        ActivityStatus::Submitted
    );
}

#[tokio::test]
async fn operator_cannot_approve() {
    let h = Harness::new().await;
    let a = submitted(&h, bored_pile_payload()).await;

    assert_matches!(
        h.engine.activities.approve(&h.operator, &a.id).await,
        Err(CoreError::Forbidden(_))
    );
}

// ---------------------------------------------------------------------------
// Test: creator checks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn only_creator_edits_and_deletes() {
    let h = Harness::new().await;
    let a = create(&h, &h.operator, bored_pile_payload()).await;

    assert_matches!(
        h.engine
            .activities
            .edit(&h.other_operator, &a.id, edit(json!({"notes": "x"})))
            .await,
        Err(CoreError::Forbidden(_))
    );
    assert_matches!(
        h.engine.activities.delete(&h.other_operator, &a.id).await,
        Err(CoreError::Forbidden(_))
    );
    assert_matches!(
        h.engine.activities.submit(&h.other_operator, &a.id).await,
        Err(CoreError::Forbidden(_))
    );
}

#[tokio::test]
async fn admin_may_submit_on_behalf_of_creator() {
    let h = Harness::new().await;
    let a = create(&h, &h.operator, bored_pile_payload()).await;

    let s = h.engine.activities.submit(&h.admin, &a.id).await.unwrap();
    assert_eq!(s.status, ActivityStatus::Submitted);
}

#[tokio::test]
async fn deleted_activity_is_not_found() {
    let h = Harness::new().await;
    let a = create(&h, &h.operator, bored_pile_payload()).await;
    h.engine.activities.delete(&h.operator, &a.id).await.unwrap();

    assert_matches!(
        h.engine.activities.get(&a.id).await,
        Err(CoreError::NotFound { .. })
    );
    assert_matches!(
        h.engine.activities.submit(&h.operator, &a.id).await,
        Err(CoreError::NotFound { .. })
    );
}

// ---------------------------------------------------------------------------
// Test: edit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn edit_with_stale_expected_version_conflicts() {
    let h = Harness::new().await;
    let a = create(&h, &h.operator, bored_pile_payload()).await;
    h.engine
        .activities
        .edit(&h.operator, &a.id, edit(json!({"notes": "first"})))
        .await
        .unwrap();

    let err = h
        .engine
        .activities
        .edit(
            &h.operator,
            &a.id,
            edit(json!({"notes": "second", "expectedVersion": 1})),
        )
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::Conflict(_));
}

#[tokio::test]
async fn empty_edit_is_rejected() {
    let h = Harness::new().await;
    let a = create(&h, &h.operator, bored_pile_payload()).await;

    assert_matches!(
        h.engine
            .activities
            .edit(&h.operator, &a.id, edit(json!({"status": "APPROVED"})))
            .await,
        Err(CoreError::Validation(_))
    );
}

// ---------------------------------------------------------------------------
// Test: approval side effects
// ---------------------------------------------------------------------------

#[tokio::test]
async fn approval_deducts_concrete_from_site_stock() {
    let h = Harness::new().await;
    let concrete = h.store.seed_material(SITE, "Concrete C30", "m3", 100.0, 20.0).await;
    let a = submitted(&h, bored_pile_payload()).await;

    let approved = h.engine.activities.approve(&h.supervisor, &a.id).await.unwrap();
    assert_eq!(approved.status, ActivityStatus::Approved);
    assert_eq!(approved.approved_by, Some(h.supervisor.user_id));

    let material = h.store.get_material(concrete.id).await.unwrap().unwrap();
    assert_eq!(material.current_stock, 87.0);
    let history = h.store.stock_history(concrete.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].movement_type, MOVEMENT_DEDUCT);
    assert_eq!(history[0].quantity, -13.0);
    assert_eq!(history[0].activity_id.as_deref(), Some(a.id.as_str()));
    assert!(h.sink.of_kind(KIND_LOW_STOCK).is_empty());
}

#[tokio::test]
async fn deduction_is_not_repeated_for_the_same_activity() {
    let h = Harness::new().await;
    let concrete = h.store.seed_material(SITE, "Concrete C30", "m3", 100.0, 20.0).await;
    let a = submitted(&h, bored_pile_payload()).await;
    let approved = h.engine.activities.approve(&h.supervisor, &a.id).await.unwrap();

    let effects = pilelog_engine::ApprovalEffects::new(h.store.clone(), h.sink.clone());
    effects.deduct_materials(&approved, &h.supervisor).await;

    assert_eq!(
        h.store.get_material(concrete.id).await.unwrap().unwrap().current_stock,
        87.0
    );
    assert_eq!(h.store.stock_history(concrete.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn insufficient_stock_skips_deduction_but_approves() {
    let h = Harness::new().await;
    let concrete = h.store.seed_material(SITE, "Concrete C30", "m3", 5.0, 1.0).await;
    let a = submitted(&h, bored_pile_payload()).await;

    let approved = h.engine.activities.approve(&h.supervisor, &a.id).await.unwrap();

    assert_eq!(approved.status, ActivityStatus::Approved);
    let material = h.store.get_material(concrete.id).await.unwrap().unwrap();
    assert_eq!(material.current_stock, 5.0);
    assert!(h.store.stock_history(concrete.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn low_stock_alerts_admins_and_site_supervisors() {
    let h = Harness::new().await;
    h.store.seed_material(SITE, "Ready-mix concrete", "m3", 25.0, 15.0).await;
    let a = submitted(&h, bored_pile_payload()).await;

    h.engine.activities.approve(&h.supervisor, &a.id).await.unwrap();

    let alerts = h.sink.of_kind(KIND_LOW_STOCK);
    let mut recipients: Vec<i64> = alerts.iter().map(|n| n.user_id).collect();
    recipients.sort();
    assert_eq!(recipients, vec![h.supervisor.user_id, h.admin.user_id]);
    assert_eq!(alerts[0].data["currentStock"], 12.0);
}

#[tokio::test]
async fn approval_recomputes_equipment_hours() {
    let h = Harness::new().await;
    let rig = h.store.seed_equipment(SITE, "Rig BG-28").await;
    let mut payload = bored_pile_payload();
    payload["details"]["equipmentUsed"] = json!([
        {"equipmentId": rig.id, "hours": 8},
        {"equipmentId": rig.id, "hours": 1.5, "isDowntime": true}
    ]);

    let first = submitted(&h, payload.clone()).await;
    h.engine.activities.approve(&h.supervisor, &first.id).await.unwrap();
    let second = submitted(&h, payload).await;
    h.engine.activities.approve(&h.supervisor, &second.id).await.unwrap();

    let rig = h.store.get_equipment(rig.id).await.unwrap().unwrap();
    assert_eq!(rig.usage_hours, 19.0);
    assert_eq!(rig.productive_hours, 16.0);
    assert_eq!(rig.downtime_hours, 3.0);
}

#[tokio::test]
async fn creator_is_notified_of_decisions() {
    let h = Harness::new().await;
    let ok = submitted(&h, bored_pile_payload()).await;
    let bad = submitted(&h, bored_pile_payload()).await;

    h.engine.activities.approve(&h.supervisor, &ok.id).await.unwrap();
    h.engine
        .activities
        .reject(&h.supervisor, &bad.id, "wrong pile ref")
        .await
        .unwrap();

    let approved = h.sink.of_kind(KIND_ACTIVITY_APPROVED);
    assert_eq!(approved.len(), 1);
    assert_eq!(approved[0].user_id, h.operator.user_id);
    assert_eq!(approved[0].data["activityId"], ok.id);

    let rejected = h.sink.of_kind(KIND_ACTIVITY_REJECTED);
    assert_eq!(rejected.len(), 1);
    assert!(rejected[0].message.contains("wrong pile ref"));
}
