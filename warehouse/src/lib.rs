//! Ephemeral analytic warehouse orchestration.
//!
//! Provisions a cloud data-warehouse cluster, waits for it to become
//! available, opens network access, resets the staging and dimensional
//! schema, runs the staged ETL pipeline, and tears everything down again
//! without leaving billable resources behind.

pub mod config;
pub mod domain;
pub mod outbound;
