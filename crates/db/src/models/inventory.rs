//! Material, stock movement, and equipment rows.

use serde::Deserialize;
use sqlx::FromRow;

use pilelog_core::types::{DbId, Timestamp};
use pilelog_store::{Equipment, Material, StockMovement};

/// A row from the `materials` table.
#[derive(Debug, Clone, FromRow)]
pub struct MaterialRow {
    pub id: DbId,
    pub site_id: DbId,
    pub name: String,
    pub unit: String,
    pub current_stock: f64,
    pub minimum_stock: f64,
}

impl From<MaterialRow> for Material {
    fn from(row: MaterialRow) -> Self {
        Material {
            id: row.id,
            site_id: row.site_id,
            name: row.name,
            unit: row.unit,
            current_stock: row.current_stock,
            minimum_stock: row.minimum_stock,
        }
    }
}

/// DTO for registering a material on a site.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMaterial {
    pub site_id: DbId,
    pub name: String,
    pub unit: String,
    pub current_stock: f64,
    pub minimum_stock: f64,
}

/// A row from the `material_stock_history` table.
#[derive(Debug, Clone, FromRow)]
pub struct StockMovementRow {
    pub id: DbId,
    pub material_id: DbId,
    pub movement_type: String,
    pub quantity: f64,
    pub resulting_stock: f64,
    pub activity_id: Option<String>,
    pub actor_id: Option<DbId>,
    pub note: Option<String>,
    pub created_at: Timestamp,
}

impl From<StockMovementRow> for StockMovement {
    fn from(row: StockMovementRow) -> Self {
        StockMovement {
            id: row.id,
            material_id: row.material_id,
            movement_type: row.movement_type,
            quantity: row.quantity,
            resulting_stock: row.resulting_stock,
            activity_id: row.activity_id,
            actor_id: row.actor_id,
            note: row.note,
            created_at: row.created_at,
        }
    }
}

/// A row from the `equipment` table.
#[derive(Debug, Clone, FromRow)]
pub struct EquipmentRow {
    pub id: DbId,
    pub site_id: DbId,
    pub name: String,
    pub usage_hours: f64,
    pub productive_hours: f64,
    pub downtime_hours: f64,
}

impl From<EquipmentRow> for Equipment {
    fn from(row: EquipmentRow) -> Self {
        Equipment {
            id: row.id,
            site_id: row.site_id,
            name: row.name,
            usage_hours: row.usage_hours,
            productive_hours: row.productive_hours,
            downtime_hours: row.downtime_hours,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEquipment {
    pub site_id: DbId,
    pub name: String,
}
