//! The transactional store seam of the pilelog engine.
//!
//! [`Store`] is implemented by `pilelog_db::PgStore` for production and by
//! [`MemoryStore`] for tests and local tooling.

mod error;
mod memory;
mod record;
mod traits;

pub use error::StoreError;
pub use memory::{MemoryStore, MemoryTx};
pub use record::{
    Activity, ChangeLogEntry, DeductionOutcome, Equipment, HoldPoint,
    Material, MaterialDeduction, NewChangeLogEntry, NewHoldPoint, StockMovement,
    MOVEMENT_DEDUCT,
};
pub use traits::Store;
