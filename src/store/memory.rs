use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{Store, StoreError};
use crate::models::{Apartment, MetadataRecord, Offer, StateSnapshot};

#[derive(Default)]
struct Inner {
    apartments: Vec<Apartment>,
    offers: Vec<Offer>,
    assignments: Vec<(i64, i64)>,
    snapshots: Vec<StateSnapshot>,
}

/// In-memory [`Store`] for local dry runs and unit tests.
///
/// Mirrors the Postgres semantics: first-write-wins on apartment names, set
/// semantics on assignments, append-only snapshots, current offer = greatest
/// id.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all apartments (primarily for tests).
    pub async fn apartments(&self) -> Vec<Apartment> {
        self.inner.lock().await.apartments.clone()
    }

    /// Snapshot of all offers (primarily for tests).
    pub async fn offers(&self) -> Vec<Offer> {
        self.inner.lock().await.offers.clone()
    }

    /// Snapshot of all assignment pairs (primarily for tests).
    pub async fn assignments(&self) -> Vec<(i64, i64)> {
        self.inner.lock().await.assignments.clone()
    }

    /// Snapshot of all state rows (primarily for tests).
    pub async fn snapshots(&self) -> Vec<StateSnapshot> {
        self.inner.lock().await.snapshots.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn upsert_apartment(&self, meta: &MetadataRecord) -> Result<i64, StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(existing) = inner.apartments.iter().find(|a| a.name == meta.name) {
            return Ok(existing.id);
        }
        let id = inner.apartments.len() as i64 + 1;
        inner.apartments.push(Apartment {
            id,
            name: meta.name.clone(),
            kind: meta.kind.clone(),
            zone: meta.zone.clone(),
            price: meta.price,
            furnished: meta.furnished,
            electricity_included: meta.electricity_included,
            short_term: meta.short_term,
        });
        Ok(id)
    }

    async fn apartment_id(&self, name: &str) -> Result<Option<i64>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.apartments.iter().find(|a| a.name == name).map(|a| a.id))
    }

    async fn resolve_or_create_offer(
        &self,
        at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(offer) = inner.offers.iter().rev().find(|o| o.contains(at)) {
            return Ok(offer.id);
        }
        let id = inner.offers.len() as i64 + 1;
        inner.offers.push(Offer {
            id,
            starts_at: at,
            ends_at,
        });
        Ok(id)
    }

    async fn record_assignment(&self, apartment_id: i64, offer_id: i64) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let pair = (apartment_id, offer_id);
        if !inner.assignments.contains(&pair) {
            inner.assignments.push(pair);
        }
        Ok(())
    }

    async fn append_state(&self, snapshot: &StateSnapshot) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.snapshots.push(snapshot.clone());
        Ok(())
    }

    async fn current_offer(&self) -> Result<Option<Offer>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.offers.iter().max_by_key(|o| o.id).copied())
    }

    async fn current_offer_size(&self) -> Result<i64, StoreError> {
        let inner = self.inner.lock().await;
        let Some(current) = inner.offers.iter().map(|o| o.id).max() else {
            return Ok(0);
        };
        Ok(inner
            .assignments
            .iter()
            .filter(|(_, offer_id)| *offer_id == current)
            .count() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn meta(name: &str, price: i64) -> MetadataRecord {
        MetadataRecord {
            name: name.to_string(),
            kind: "Single room".to_string(),
            zone: "Lappkärrsberget".to_string(),
            price,
            furnished: false,
            electricity_included: true,
            short_term: false,
        }
    }

    fn at(s: &str) -> DateTime<Utc> {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
            .unwrap()
            .and_utc()
    }

    #[tokio::test]
    async fn upsert_is_first_write_wins() {
        let store = MemoryStore::new();
        let first = store.upsert_apartment(&meta("Körsbärsvägen 4", 3900)).await.unwrap();
        let second = store.upsert_apartment(&meta("Körsbärsvägen 4", 4200)).await.unwrap();

        assert_eq!(first, second);
        let apartments = store.apartments().await;
        assert_eq!(apartments.len(), 1);
        assert_eq!(apartments[0].price, 3900);
    }

    #[tokio::test]
    async fn assignment_pair_is_never_duplicated() {
        let store = MemoryStore::new();
        store.record_assignment(1, 1).await.unwrap();
        store.record_assignment(1, 1).await.unwrap();
        assert_eq!(store.assignments().await, vec![(1, 1)]);
    }

    #[tokio::test]
    async fn offer_resolution_prefers_containing_window() {
        let store = MemoryStore::new();
        let created = store
            .resolve_or_create_offer(at("2024-01-01 00:00:00"), at("2024-01-08 00:00:00"))
            .await
            .unwrap();
        let resolved = store
            .resolve_or_create_offer(at("2024-01-03 12:00:00"), at("2024-01-20 00:00:00"))
            .await
            .unwrap();

        assert_eq!(created, resolved);
        assert_eq!(store.offers().await.len(), 1);
    }

    #[tokio::test]
    async fn offer_created_when_no_window_contains_timestamp() {
        let store = MemoryStore::new();
        store
            .resolve_or_create_offer(at("2024-01-01 00:00:00"), at("2024-01-08 00:00:00"))
            .await
            .unwrap();
        let fresh = store
            .resolve_or_create_offer(at("2024-01-09 00:00:00"), at("2024-01-15 00:00:00"))
            .await
            .unwrap();

        assert_eq!(fresh, 2);
        let current = store.current_offer().await.unwrap().unwrap();
        assert_eq!(current.id, 2);
    }

    #[tokio::test]
    async fn size_counts_only_the_current_offer() {
        let store = MemoryStore::new();
        store
            .resolve_or_create_offer(at("2024-01-01 00:00:00"), at("2024-01-08 00:00:00"))
            .await
            .unwrap();
        store.record_assignment(1, 1).await.unwrap();
        store.record_assignment(2, 1).await.unwrap();
        store
            .resolve_or_create_offer(at("2024-01-09 00:00:00"), at("2024-01-15 00:00:00"))
            .await
            .unwrap();
        store.record_assignment(1, 2).await.unwrap();

        assert_eq!(store.current_offer_size().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn state_history_only_grows() {
        let store = MemoryStore::new();
        let snap = StateSnapshot {
            observed_at: at("2024-01-03 12:00:00"),
            apartment_id: 1,
            offer_id: 1,
            applicants: 12,
            top_credit: 1034,
        };
        store.append_state(&snap).await.unwrap();
        store.append_state(&snap).await.unwrap();

        // Duplicates at the same timestamp are accepted as-is.
        assert_eq!(store.snapshots().await.len(), 2);
    }
}
