//! Form response collection service: typed question schemas, per-form access
//! policies, respondent deduplication, and validated response storage.

pub mod config;
pub mod error;
pub mod forms;
pub mod telemetry;
