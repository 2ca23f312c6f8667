//! Domain logic for piling-site activity capture.
//!
//! Everything in this crate is pure: no I/O, no async. The store seam lives
//! in `pilelog-store`, orchestration in `pilelog-engine`.

pub mod activity;
pub mod consumption;
pub mod details;
pub mod error;
pub mod hold_point;
pub mod notify;
pub mod patch;
pub mod roles;
pub mod sync;
pub mod types;
