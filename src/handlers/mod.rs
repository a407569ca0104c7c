//! HTTP handlers, one router per workstation.
//!
//! Routers here carry no auth layers; role gates are applied where the groups
//! are nested in [`crate::api_v1_routes`].

pub mod auth;
pub mod common;
pub mod devices;
pub mod exports;
pub mod health;
pub mod inspections;
pub mod inward;
pub mod outward;
pub mod paint;
pub mod purchase_orders;
pub mod qc;
pub mod repairs;
pub mod reports;
pub mod spares;
pub mod specialist;
pub mod users;
