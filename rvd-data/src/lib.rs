//! Aggregation engine for respiratory virus surveillance data.
//!
//! This crate turns parsed records into chart-ready series and matrices:
//! record filters and week windows, time-series and cross-tabulation
//! aggregation with per-100k rates, and the dashboard views built on them.

pub mod aggregate;
pub mod filter;
pub mod models;
pub mod views;
