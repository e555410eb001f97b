pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{MetadataRecord, Offer, StateSnapshot};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Relational adapter for the apartment mirror.
///
/// Every operation is transactional on its own: it commits on success and
/// rolls back on any error, surfacing the cause as a [`StoreError`]. No
/// retry lives here; callers decide whether a failed call is worth another
/// attempt.
#[async_trait]
pub trait Store: Send + Sync {
    /// Look up an apartment by name, inserting it first if absent.
    ///
    /// Returns the id either way. Descriptive fields are first-write-wins:
    /// an existing row is never mutated, whatever the new record says.
    async fn upsert_apartment(&self, meta: &MetadataRecord) -> Result<i64, StoreError>;

    /// Resolve an apartment id by its natural key.
    async fn apartment_id(&self, name: &str) -> Result<Option<i64>, StoreError>;

    /// Find the offer whose window contains `at`, or create one spanning
    /// `[at, ends_at]` when none does.
    async fn resolve_or_create_offer(
        &self,
        at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Result<i64, StoreError>;

    /// Record that an apartment was listed under an offer. Set semantics:
    /// re-inserting an existing pair is a no-op, not an error.
    async fn record_assignment(&self, apartment_id: i64, offer_id: i64) -> Result<(), StoreError>;

    /// Append one state observation. Never deduplicates; history only grows.
    async fn append_state(&self, snapshot: &StateSnapshot) -> Result<(), StoreError>;

    /// The most recently created offer, if any.
    async fn current_offer(&self) -> Result<Option<Offer>, StoreError>;

    /// Number of apartments assigned to the current offer (zero on an empty
    /// store).
    async fn current_offer_size(&self) -> Result<i64, StoreError>;
}
