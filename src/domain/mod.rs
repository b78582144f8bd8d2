//! Core domain types and logic.

pub mod config;
pub mod error;
pub mod metrics;
pub mod trade;
