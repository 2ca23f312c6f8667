//! Post-approval quantities: consumable usage and equipment hours.

use std::collections::BTreeSet;

use serde::Deserialize;
use serde_json::Value;

use crate::details::KEY_ACTUAL_VOLUME;
use crate::types::DbId;

/// A consumable tracked against site material stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consumable {
    Concrete,
    Bentonite,
    Grout,
}

pub const CONSUMABLES: &[Consumable] =
    &[Consumable::Concrete, Consumable::Bentonite, Consumable::Grout];

impl Consumable {
    /// Case-insensitive substring a material name must contain to match.
    pub fn name_pattern(self) -> &'static str {
        match self {
            Consumable::Concrete => "concrete",
            Consumable::Bentonite => "bentonite",
            Consumable::Grout => "grout",
        }
    }

    /// Quantity used according to an activity's (enriched) details.
    pub fn quantity(self, details: &Value) -> Option<f64> {
        let num = |key: &str| details.get(key).and_then(Value::as_f64);
        let q = match self {
            Consumable::Concrete => num(KEY_ACTUAL_VOLUME).or_else(|| num("concreteVolume")),
            Consumable::Bentonite => num("bentoniteQuantity"),
            Consumable::Grout => num("groutVolume"),
        }?;
        (q.is_finite() && q > 0.0).then_some(q)
    }

    pub fn matches(self, material_name: &str) -> bool {
        material_name
            .to_lowercase()
            .contains(self.name_pattern())
    }
}

/// Every consumable present in `details` with a positive quantity.
pub fn planned_consumption(details: &Value) -> Vec<(Consumable, f64)> {
    CONSUMABLES
        .iter()
        .filter_map(|c| c.quantity(details).map(|q| (*c, q)))
        .collect()
}

/// Stock at or below the minimum threshold triggers an alert.
pub fn is_low_stock(current_stock: f64, minimum_stock: f64) -> bool {
    current_stock <= minimum_stock
}

// ---------------------------------------------------------------------------
// Equipment usage
// ---------------------------------------------------------------------------

/// One entry of `details.equipmentUsed`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentUsage {
    pub equipment_id: DbId,
    #[serde(default)]
    pub hours: f64,
    #[serde(default)]
    pub is_downtime: bool,
}

/// Parsed `equipmentUsed` entries; malformed entries are skipped.
pub fn equipment_usage(details: &Value) -> Vec<EquipmentUsage> {
    details
        .get("equipmentUsed")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| serde_json::from_value(e.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Distinct equipment ids referenced by an activity.
pub fn referenced_equipment(details: &Value) -> BTreeSet<DbId> {
    equipment_usage(details)
        .into_iter()
        .map(|u| u.equipment_id)
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UsageTotals {
    pub total_hours: f64,
    pub productive_hours: f64,
    pub downtime_hours: f64,
}

/// Sum hours for one piece of equipment across many activities' details.
pub fn usage_totals<'a>(
    equipment_id: DbId,
    details: impl IntoIterator<Item = &'a Value>,
) -> UsageTotals {
    let mut totals = UsageTotals::default();
    for d in details {
        for usage in equipment_usage(d) {
            if usage.equipment_id != equipment_id || !usage.hours.is_finite() {
                continue;
            }
            totals.total_hours += usage.hours;
            if usage.is_downtime {
                totals.downtime_hours += usage.hours;
            } else {
                totals.productive_hours += usage.hours;
            }
        }
    }
    totals
}
