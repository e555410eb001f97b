use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An apartment as mirrored from the site. `name` is the natural key;
/// descriptive fields are first-write-wins and never updated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Apartment {
    pub id: i64,
    pub name: String,
    pub kind: String,
    pub zone: String,
    pub price: i64,
    pub furnished: bool,
    pub electricity_included: bool,
    pub short_term: bool,
}

/// One listing round on the site, bounded by its validity window.
/// The current offer is the one with the greatest id.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Offer {
    pub id: i64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl Offer {
    /// Whether `at` falls inside this offer's validity window (inclusive).
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.starts_at <= at && at <= self.ends_at
    }
}

/// A timestamped observation of an apartment's demand during an offer.
/// Rows are append-only; the time series is reconstructed by ordering on
/// `observed_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub observed_at: DateTime<Utc>,
    pub apartment_id: i64,
    pub offer_id: i64,
    pub applicants: i32,
    pub top_credit: i32,
}

/// Descriptive fields of one listed apartment, as scraped from the listing
/// page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub name: String,
    pub kind: String,
    pub zone: String,
    pub price: i64,
    pub furnished: bool,
    pub electricity_included: bool,
    pub short_term: bool,
}

/// An apartment's end-of-validity timestamp, as scraped from its detail page
/// while logged in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferingRecord {
    pub name: String,
    pub ends_at: DateTime<Utc>,
}

/// A live observation of applicant pressure on one apartment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    pub observed_at: DateTime<Utc>,
    pub name: String,
    pub applicants: i32,
    pub top_credit: i32,
}

/// The closed set of records a walk can hand to ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScrapeRecord {
    Metadata(MetadataRecord),
    Offering(OfferingRecord),
    State(StateRecord),
}

/// The single result of one reconciliation cycle, handed to the notifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CycleOutcome {
    Success,
    Failure { reason: String },
}

impl CycleOutcome {
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}
