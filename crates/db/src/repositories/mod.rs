//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods. Methods
//! that must run inside a caller's transaction take `&mut PgConnection`;
//! standalone reads and writes take `&PgPool`.

pub mod activity_repo;
pub mod change_log_repo;
pub mod hold_point_repo;
pub mod material_repo;
pub mod equipment_repo;
pub mod notification_repo;
pub mod sync_ledger_repo;
pub mod user_repo;

pub use activity_repo::ActivityRepo;
pub use change_log_repo::ChangeLogRepo;
pub use equipment_repo::EquipmentRepo;
pub use hold_point_repo::HoldPointRepo;
pub use material_repo::{DeductResult, MaterialRepo};
pub use notification_repo::NotificationRepo;
pub use sync_ledger_repo::SyncLedgerRepo;
pub use user_repo::{SiteRepo, UserRepo};
