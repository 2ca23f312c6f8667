//! Hold-point creation, sequential sign-off, and the approval gate.

mod common;

use assert_matches::assert_matches;

use common::{bored_pile_payload, Harness};
use pilelog_core::activity::ActivityStatus;
use pilelog_core::error::CoreError;
use pilelog_core::hold_point::{ChecklistItem, HoldPointStatus, HoldPointType, SignOff};
use pilelog_core::patch::CreateActivity;
use pilelog_store::HoldPoint;

fn sign_off(name: &str) -> SignOff {
    SignOff {
        checklist: None,
        signature_data: Some("data:image/png;base64,AAAA".to_string()),
        signed_by_name: name.to_string(),
        comments: None,
    }
}

/// A fresh activity with its three hold points, in signing order.
async fn with_hold_points(h: &Harness) -> (String, Vec<HoldPoint>) {
    let input = CreateActivity::from_payload(&bored_pile_payload()).unwrap();
    let a = h.engine.activities.create(&h.operator, input).await.unwrap().activity;
    let (hps, created) = h
        .engine
        .hold_points
        .create_for_activity(&h.operator, &a.id)
        .await
        .unwrap();
    assert!(created);
    (a.id, hps)
}

// ---------------------------------------------------------------------------
// Test: creation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn creates_three_pending_stages_once() {
    let h = Harness::new().await;
    let (id, hps) = with_hold_points(&h).await;

    let kinds: Vec<HoldPointType> = hps.iter().map(|hp| hp.hold_point_type).collect();
    assert_eq!(
        kinds,
        vec![
            HoldPointType::PreBoring,
            HoldPointType::PreCage,
            HoldPointType::PreConcrete
        ]
    );
    assert!(hps.iter().all(|hp| hp.status == HoldPointStatus::Pending));
    assert!(hps.iter().all(|hp| !hp.checklist.is_empty()));

    let (again, created) = h
        .engine
        .hold_points
        .create_for_activity(&h.operator, &id)
        .await
        .unwrap();
    assert!(!created);
    assert_eq!(again, hps);
    assert_eq!(h.engine.hold_points.list(&id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn creation_requires_a_live_activity() {
    let h = Harness::new().await;
    assert_matches!(
        h.engine
            .hold_points
            .create_for_activity(&h.operator, "nope")
            .await,
        Err(CoreError::NotFound { .. })
    );
    assert_matches!(
        h.engine.hold_points.list("nope").await,
        Err(CoreError::NotFound { .. })
    );
}

// ---------------------------------------------------------------------------
// Test: ordering
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pre_boring_can_be_signed_first() {
    let h = Harness::new().await;
    let (_, hps) = with_hold_points(&h).await;

    let signed = h
        .engine
        .hold_points
        .sign(&h.engineer, hps[0].id, sign_off("J. Okafor"))
        .await
        .unwrap();

    assert_eq!(signed.status, HoldPointStatus::Approved);
    assert_eq!(signed.signed_by_id, Some(h.engineer.user_id));
    assert_eq!(signed.signed_by_name.as_deref(), Some("J. Okafor"));
    assert!(signed.signed_at.is_some());
}

#[tokio::test]
async fn pre_cage_before_pre_boring_fails() {
    let h = Harness::new().await;
    let (_, hps) = with_hold_points(&h).await;

    let err = h
        .engine
        .hold_points
        .sign(&h.engineer, hps[1].id, sign_off("J. Okafor"))
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::Validation(msg) if msg.contains("Previous hold point must be approved first"));
}

#[tokio::test]
async fn rejected_stage_blocks_the_next() {
    let h = Harness::new().await;
    let (_, hps) = with_hold_points(&h).await;

    let rejected = h
        .engine
        .hold_points
        .reject(&h.engineer, hps[0].id, "casing not plumb")
        .await
        .unwrap();
    assert_eq!(rejected.status, HoldPointStatus::Rejected);
    assert_eq!(rejected.rejection_notes.as_deref(), Some("casing not plumb"));

    assert_matches!(
        h.engine
            .hold_points
            .sign(&h.engineer, hps[0].id, sign_off("J. Okafor"))
            .await,
        Err(CoreError::Validation(_))
    );
    assert_matches!(
        h.engine
            .hold_points
            .sign(&h.engineer, hps[1].id, sign_off("J. Okafor"))
            .await,
        Err(CoreError::Validation(_))
    );
}

#[tokio::test]
async fn stage_is_decided_once() {
    let h = Harness::new().await;
    let (_, hps) = with_hold_points(&h).await;
    h.engine
        .hold_points
        .sign(&h.engineer, hps[0].id, sign_off("J. Okafor"))
        .await
        .unwrap();

    assert_matches!(
        h.engine
            .hold_points
            .reject(&h.engineer, hps[0].id, "changed my mind")
            .await,
        Err(CoreError::Validation(_))
    );
}

#[tokio::test]
async fn concurrent_signatures_on_one_stage_have_one_winner() {
    let h = Harness::new().await;
    let (_, hps) = with_hold_points(&h).await;

    let (first, second) = tokio::join!(
        h.engine
            .hold_points
            .sign(&h.engineer, hps[0].id, sign_off("J. Okafor")),
        h.engine
            .hold_points
            .sign(&h.engineer, hps[0].id, sign_off("M. Brandt")),
    );

    let (winner, loser) = match (first, second) {
        (Ok(hp), Err(e)) | (Err(e), Ok(hp)) => (hp, e),
        other => panic!("expected exactly one signature to win, got {other:?}"),
    };
    assert_matches!(loser, CoreError::Validation(_));

    let stored = h.engine.hold_points.list(&winner.activity_id).await.unwrap();
    assert_eq!(stored[0].status, HoldPointStatus::Approved);
    assert_eq!(stored[0].signed_by_name, winner.signed_by_name);
}

#[tokio::test]
async fn decisions_return_the_stored_row() {
    let h = Harness::new().await;
    let (id, hps) = with_hold_points(&h).await;

    let signed = h
        .engine
        .hold_points
        .sign(&h.engineer, hps[0].id, sign_off("J. Okafor"))
        .await
        .unwrap();
    let rejected = h
        .engine
        .hold_points
        .reject(&h.engineer, hps[1].id, "cage spacers missing")
        .await
        .unwrap();

    assert!(signed.updated_at >= hps[0].updated_at);
    assert!(rejected.updated_at >= hps[1].updated_at);
    let stored = h.engine.hold_points.list(&id).await.unwrap();
    assert_eq!(stored[0], signed);
    assert_eq!(stored[1], rejected);
}

// ---------------------------------------------------------------------------
// Test: sign-off input
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sign_off_replaces_checklist_and_requires_name() {
    let h = Harness::new().await;
    let (_, hps) = with_hold_points(&h).await;

    assert_matches!(
        h.engine
            .hold_points
            .sign(&h.engineer, hps[0].id, sign_off(" "))
            .await,
        Err(CoreError::Validation(_))
    );

    let checklist = vec![ChecklistItem {
        item: "Setting-out verified".to_string(),
        checked: true,
    }];
    let signed = h
        .engine
        .hold_points
        .sign(
            &h.engineer,
            hps[0].id,
            SignOff {
                checklist: Some(checklist.clone()),
                ..sign_off("J. Okafor")
            },
        )
        .await
        .unwrap();
    assert_eq!(signed.checklist, checklist);
}

#[tokio::test]
async fn operator_cannot_sign() {
    let h = Harness::new().await;
    let (_, hps) = with_hold_points(&h).await;

    assert_matches!(
        h.engine
            .hold_points
            .sign(&h.operator, hps[0].id, sign_off("Op"))
            .await,
        Err(CoreError::Forbidden(_))
    );
}

#[tokio::test]
async fn unknown_hold_point_is_not_found() {
    let h = Harness::new().await;
    assert_matches!(
        h.engine
            .hold_points
            .sign(&h.engineer, 4242, sign_off("J. Okafor"))
            .await,
        Err(CoreError::NotFound { .. })
    );
}

// ---------------------------------------------------------------------------
// Test: approval gate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn approval_waits_for_every_hold_point() {
    let h = Harness::new().await;
    let (id, hps) = with_hold_points(&h).await;
    h.engine.activities.submit(&h.operator, &id).await.unwrap();

    let err = h.engine.activities.approve(&h.supervisor, &id).await.unwrap_err();
    assert_matches!(err, CoreError::Validation(msg) if msg.contains("PRE_BORING"));

    for hp in &hps[..2] {
        h.engine
            .hold_points
            .sign(&h.engineer, hp.id, sign_off("J. Okafor"))
            .await
            .unwrap();
    }
    let err = h.engine.activities.approve(&h.supervisor, &id).await.unwrap_err();
    assert_matches!(err, CoreError::Validation(msg) if msg.contains("PRE_CONCRETE"));

    h.engine
        .hold_points
        .sign(&h.engineer, hps[2].id, sign_off("J. Okafor"))
        .await
        .unwrap();
    let approved = h.engine.activities.approve(&h.supervisor, &id).await.unwrap();
    assert_eq!(approved.status, ActivityStatus::Approved);
}

#[tokio::test]
async fn hold_point_decisions_are_replicated() {
    let h = Harness::new().await;
    let (_, hps) = with_hold_points(&h).await;
    let before = h.engine.sync.status(&h.supervisor, 0).await.unwrap();

    h.engine
        .hold_points
        .sign(&h.engineer, hps[0].id, sign_off("J. Okafor"))
        .await
        .unwrap();

    let pulled = h
        .engine
        .sync
        .pull(&h.supervisor, before.server_version)
        .await
        .unwrap();
    assert_eq!(pulled.changes.len(), 1);
    assert_eq!(pulled.changes[0].entity_type, "hold_point");
    assert_eq!(pulled.changes[0].entity_id, hps[0].id.to_string());
    assert_eq!(pulled.changes[0].payload["status"], "APPROVED");
}
