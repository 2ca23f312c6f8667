//! HTTP surface of pilelog: sync endpoints for offline devices, activity
//! approval, and hold-point sign-offs.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
