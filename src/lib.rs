//! Mirrors a housing-offer site into a relational store.
//!
//! One invocation is one cycle: the scheduler compares the stored offer
//! window and assignment count against the live listing, then either idles,
//! polls applicant state, or re-scans the whole offering. The walk retries
//! transient per-item failures in place and gives up only after repeated
//! ingestion failures at one position. All writes are idempotent; state
//! history is append-only.

pub mod config;
pub mod engine;
pub mod models;
pub mod notify;
pub mod scrapers;
pub mod store;

pub use engine::run_cycle;
pub use models::CycleOutcome;
