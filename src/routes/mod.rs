//! HTTP route modules for the analytics service.
//!
//! - `reports`: dashboard, customer, product and sales reports
//! - `insights`: period comparison and the realtime view
//! - `health`: unauthenticated liveness probe
//! - `auth`: bearer presence middleware for the report routes

pub mod auth;
pub mod health;
pub mod insights;
pub mod reports;
