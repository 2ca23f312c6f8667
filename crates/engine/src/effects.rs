//! Post-approval side effects: material stock deduction and equipment
//! usage-hour recomputation.
//!
//! Both are best-effort. Failures are logged and swallowed; the approval has
//! already committed. Both are idempotent, so re-running them is harmless.

use std::sync::Arc;

use serde_json::json;

use pilelog_core::consumption::{
    is_low_stock, planned_consumption, referenced_equipment, usage_totals, Consumable,
};
use pilelog_core::notify::{Notification, NotificationSink, KIND_LOW_STOCK};
use pilelog_core::roles::Actor;
use pilelog_core::types::DbId;
use pilelog_store::{Activity, DeductionOutcome, Material, MaterialDeduction, Store};

pub struct ApprovalEffects<S: Store> {
    store: Arc<S>,
    notifier: Arc<dyn NotificationSink>,
}

impl<S: Store> ApprovalEffects<S> {
    pub fn new(store: Arc<S>, notifier: Arc<dyn NotificationSink>) -> Self {
        Self { store, notifier }
    }

    pub async fn run(&self, activity: &Activity, actor: &Actor) {
        self.deduct_materials(activity, actor).await;
        self.recompute_equipment_usage(activity).await;
    }

    /// Deduct each consumable from the first site material whose name
    /// matches it.
    pub async fn deduct_materials(&self, activity: &Activity, actor: &Actor) {
        let plan = planned_consumption(&activity.details);
        if plan.is_empty() {
            return;
        }
        let materials = match self.store.site_materials(activity.site_id).await {
            Ok(m) => m,
            Err(e) => {
                tracing::error!(
                    activity_id = %activity.id,
                    site_id = activity.site_id,
                    error = %e,
                    "Failed to load site materials; skipping deduction"
                );
                return;
            }
        };

        for (consumable, quantity) in plan {
            let Some(material) = materials.iter().find(|m| consumable.matches(&m.name)) else {
                tracing::debug!(
                    activity_id = %activity.id,
                    consumable = consumable.name_pattern(),
                    "No matching site material"
                );
                continue;
            };
            self.deduct_one(activity, actor, consumable, material, quantity)
                .await;
        }
    }

    async fn deduct_one(
        &self,
        activity: &Activity,
        actor: &Actor,
        consumable: Consumable,
        material: &Material,
        quantity: f64,
    ) {
        let deduction = MaterialDeduction {
            material_id: material.id,
            activity_id: activity.id.clone(),
            actor_id: actor.user_id,
            quantity,
            note: Some(format!(
                "Auto-deducted on approval of {} activity {}",
                activity.activity_type, activity.id
            )),
        };

        match self.store.deduct_material(&deduction).await {
            Ok(DeductionOutcome::Deducted(updated)) => {
                tracing::info!(
                    activity_id = %activity.id,
                    material_id = updated.id,
                    consumable = consumable.name_pattern(),
                    quantity,
                    current_stock = updated.current_stock,
                    "Material deducted"
                );
                if is_low_stock(updated.current_stock, updated.minimum_stock) {
                    self.alert_low_stock(&updated).await;
                }
            }
            Ok(DeductionOutcome::AlreadyDeducted) => {
                tracing::debug!(
                    activity_id = %activity.id,
                    material_id = material.id,
                    "Material already deducted for this activity"
                );
            }
            Ok(DeductionOutcome::InsufficientStock { available }) => {
                tracing::warn!(
                    activity_id = %activity.id,
                    material_id = material.id,
                    material = %material.name,
                    requested = quantity,
                    available,
                    "Insufficient stock; deduction skipped"
                );
            }
            Err(e) => {
                tracing::error!(
                    activity_id = %activity.id,
                    material_id = material.id,
                    error = %e,
                    "Material deduction failed"
                );
            }
        }
    }

    async fn alert_low_stock(&self, material: &Material) {
        let recipients = match self.store.site_alert_recipients(material.site_id).await {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(
                    material_id = material.id,
                    error = %e,
                    "Failed to resolve low-stock recipients"
                );
                return;
            }
        };
        tracing::warn!(
            material_id = material.id,
            current_stock = material.current_stock,
            minimum_stock = material.minimum_stock,
            recipients = recipients.len(),
            "Material at or below minimum stock"
        );
        for user_id in recipients {
            self.notifier.notify(Notification {
                user_id,
                kind: KIND_LOW_STOCK.to_string(),
                title: format!("Low stock: {}", material.name),
                message: format!(
                    "{} is at {} {} (minimum {})",
                    material.name, material.current_stock, material.unit, material.minimum_stock
                ),
                data: json!({
                    "materialId": material.id,
                    "siteId": material.site_id,
                    "currentStock": material.current_stock,
                    "minimumStock": material.minimum_stock,
                }),
            });
        }
    }

    /// Recompute totals for every equipment the activity references, from
    /// the full approved history.
    pub async fn recompute_equipment_usage(&self, activity: &Activity) {
        for equipment_id in referenced_equipment(&activity.details) {
            if let Err(e) = self.recompute_one(equipment_id).await {
                tracing::error!(
                    activity_id = %activity.id,
                    equipment_id,
                    error = %e,
                    "Equipment usage recalculation failed"
                );
            }
        }
    }

    async fn recompute_one(&self, equipment_id: DbId) -> Result<(), pilelog_store::StoreError> {
        let history = self
            .store
            .approved_activities_using_equipment(equipment_id)
            .await?;
        let totals = usage_totals(equipment_id, history.iter().map(|a| &a.details));
        let found = self
            .store
            .set_equipment_usage(
                equipment_id,
                totals.total_hours,
                totals.productive_hours,
                totals.downtime_hours,
            )
            .await?;
        if found {
            tracing::info!(
                equipment_id,
                total_hours = totals.total_hours,
                productive_hours = totals.productive_hours,
                downtime_hours = totals.downtime_hours,
                "Equipment usage recalculated"
            );
        } else {
            tracing::warn!(equipment_id, "Referenced equipment does not exist");
        }
        Ok(())
    }
}
