pub mod activity;
pub mod hold_point;
pub mod sync;
