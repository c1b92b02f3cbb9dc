//! RBAC controller service library crate.
//!
//! # Purpose
//! Exposes the resource models, the store seam, the reconcilers, and the
//! service configuration for use by the binary and the integration tests.
//!
//! # Notes
//! Module boundaries mirror the reconcile pipeline: models are what users
//! declare, the store is where shared state lives, and `reconcile` moves one
//! toward the other.
pub mod config;
pub mod model;
pub mod observability;
pub mod reconcile;
pub mod store;
