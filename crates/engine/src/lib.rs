//! The pilelog engine: offline sync and the activity approval workflow.
//!
//! Every service is generic over a [`Store`] so the same code runs against
//! Postgres in production and [`MemoryStore`](pilelog_store::MemoryStore)
//! in tests.

use std::sync::Arc;

use pilelog_core::notify::NotificationSink;
use pilelog_core::roles::Authorizer;
use pilelog_store::Store;

pub mod applier;
pub mod effects;
pub mod hold_points;
mod journal;
pub mod sync;
pub mod workflow;

pub use applier::{ActivityApplier, ApplierRegistry, ApplyContext, ApplyOutcome, MutationApplier};
pub use effects::ApprovalEffects;
pub use hold_points::HoldPointGate;
pub use sync::{PullResult, PushError, PushResult, SyncService, SyncStatus};
pub use workflow::{ActivityWorkflow, CreateOutcome, EditActivity};

/// Default maximum number of changes accepted in one push.
pub const DEFAULT_MAX_BATCH: usize = 500;

/// Engine-wide tunables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Pushes with more changes than this are rejected outright.
    pub max_batch: usize,
    /// Make sync UPDATE/DELETE on activities obey the interactive edit lock.
    pub enforce_edit_lock: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_batch: DEFAULT_MAX_BATCH,
            enforce_edit_lock: false,
        }
    }
}

/// All engine services wired to one store, authorizer, and notification sink.
pub struct Engine<S: Store> {
    pub sync: SyncService<S>,
    pub activities: ActivityWorkflow<S>,
    pub hold_points: HoldPointGate<S>,
}

impl<S: Store> Engine<S> {
    pub fn new(
        store: Arc<S>,
        authorizer: Arc<dyn Authorizer>,
        notifier: Arc<dyn NotificationSink>,
        config: EngineConfig,
    ) -> Self {
        let effects = ApprovalEffects::new(Arc::clone(&store), Arc::clone(&notifier));
        Self {
            sync: SyncService::new(
                Arc::clone(&store),
                Arc::clone(&authorizer),
                ApplierRegistry::with_defaults(),
                config,
            ),
            activities: ActivityWorkflow::new(
                Arc::clone(&store),
                Arc::clone(&authorizer),
                notifier,
                effects,
            ),
            hold_points: HoldPointGate::new(store, authorizer),
        }
    }
}
