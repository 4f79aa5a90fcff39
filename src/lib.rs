//! HomeServe Marketplace Platform
//!
//! Self-hosted home-services marketplace backend.
//!
//! ## Features
//! - Booking lifecycle: request, provider acceptance, progress, completion
//! - Payment capture with gateway reconciliation
//! - Reviews with incremental provider rating aggregation
//! - Promo codes with validity windows and usage caps
//! - Provider earnings accrual and payout requests

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;

pub use application::error::{CoreError, CoreResult};
