#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use pilelog_core::notify::{Notification, NotificationSink};
use pilelog_core::roles::{
    Actor, RoleAuthorizer, ROLE_ADMIN, ROLE_OPERATOR, ROLE_SITE_ENGINEER, ROLE_SUPERVISOR,
};
use pilelog_core::sync::{ChangeAction, SyncChange};
use pilelog_engine::{Engine, EngineConfig};
use pilelog_store::MemoryStore;

pub const SITE: i64 = 7;

/// Captures notifications in memory.
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn of_kind(&self, kind: &str) -> Vec<Notification> {
        self.sent().into_iter().filter(|n| n.kind == kind).collect()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, notification: Notification) {
        self.sent.lock().unwrap().push(notification);
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub sink: Arc<RecordingSink>,
    pub engine: Engine<MemoryStore>,
    /// User 1, creates activities.
    pub operator: Actor,
    /// User 2.
    pub other_operator: Actor,
    /// User 3, approves on site 7.
    pub supervisor: Actor,
    /// User 4, signs hold points.
    pub engineer: Actor,
    /// User 5.
    pub admin: Actor,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(EngineConfig::default()).await
    }

    pub async fn with_config(config: EngineConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let sink = Arc::new(RecordingSink::default());
        let engine = Engine::new(
            Arc::clone(&store),
            Arc::new(RoleAuthorizer),
            sink.clone(),
            config,
        );

        store.seed_user(1, ROLE_OPERATOR, &[SITE]).await;
        store.seed_user(2, ROLE_OPERATOR, &[SITE]).await;
        store.seed_user(3, ROLE_SUPERVISOR, &[SITE]).await;
        store.seed_user(4, ROLE_SITE_ENGINEER, &[SITE]).await;
        store.seed_user(5, ROLE_ADMIN, &[]).await;

        Self {
            store,
            sink,
            engine,
            operator: Actor::new(1, ROLE_OPERATOR),
            other_operator: Actor::new(2, ROLE_OPERATOR),
            supervisor: Actor::new(3, ROLE_SUPERVISOR),
            engineer: Actor::new(4, ROLE_SITE_ENGINEER),
            admin: Actor::new(5, ROLE_ADMIN),
        }
    }
}

/// A 1200 mm × 10 m bored pile poured with 13 m³.
pub fn bored_pile_payload() -> Value {
    json!({
        "siteId": SITE,
        "activityType": "BORED_PILING",
        "activityDate": "2026-03-02",
        "details": {"diameter": 1200, "depth": 10, "concreteVolume": 13}
    })
}

pub fn change(ccid: &str, action: ChangeAction, entity_id: &str, payload: Value) -> SyncChange {
    SyncChange {
        client_change_id: ccid.to_string(),
        action,
        entity_type: "activity".to_string(),
        entity_id: entity_id.to_string(),
        payload,
        timestamp: None,
    }
}

pub fn create_change(ccid: &str, entity_id: &str) -> SyncChange {
    change(ccid, ChangeAction::Create, entity_id, bored_pile_payload())
}
