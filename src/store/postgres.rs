use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use tracing::info;

use super::{Store, StoreError};
use crate::models::{MetadataRecord, Offer, StateSnapshot};

/// Postgres-backed [`Store`].
///
/// Each trait method opens its own transaction; sqlx rolls back on drop, so
/// any `?` inside a method aborts that call's writes atomically.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        info!("PostgreSQL connection pool established");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS apartments (
                id                   BIGSERIAL PRIMARY KEY,
                name                 TEXT NOT NULL UNIQUE,
                kind                 TEXT NOT NULL,
                zone                 TEXT NOT NULL,
                price                BIGINT NOT NULL,
                furnished            BOOLEAN NOT NULL,
                electricity_included BOOLEAN NOT NULL,
                short_term           BOOLEAN NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS offers (
                id        BIGSERIAL PRIMARY KEY,
                starts_at TIMESTAMPTZ NOT NULL,
                ends_at   TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Set semantics for (apartment, offer) pairs.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS assignments (
                apartment_id BIGINT NOT NULL REFERENCES apartments (id),
                offer_id     BIGINT NOT NULL REFERENCES offers (id),
                PRIMARY KEY (apartment_id, offer_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Append-only; no unique constraint on (apartment_id, observed_at).
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS state_snapshots (
                id           BIGSERIAL PRIMARY KEY,
                observed_at  TIMESTAMPTZ NOT NULL,
                apartment_id BIGINT NOT NULL REFERENCES apartments (id),
                offer_id     BIGINT NOT NULL REFERENCES offers (id),
                applicants   INTEGER NOT NULL,
                top_credit   INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS state_snapshots_apartment_observed_idx
              ON state_snapshots (apartment_id, observed_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn upsert_apartment(&self, meta: &MetadataRecord) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO apartments
                (name, kind, zone, price, furnished, electricity_included, short_term)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (name) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(&meta.name)
        .bind(&meta.kind)
        .bind(&meta.zone)
        .bind(meta.price)
        .bind(meta.furnished)
        .bind(meta.electricity_included)
        .bind(meta.short_term)
        .fetch_optional(&mut *tx)
        .await?;

        let id = match inserted {
            Some(row) => row.get::<i64, _>("id"),
            None => {
                // Name already present; first write wins, just hand back the id.
                let row = sqlx::query("SELECT id FROM apartments WHERE name = $1")
                    .bind(&meta.name)
                    .fetch_one(&mut *tx)
                    .await?;
                row.get::<i64, _>("id")
            }
        };

        tx.commit().await?;
        Ok(id)
    }

    async fn apartment_id(&self, name: &str) -> Result<Option<i64>, StoreError> {
        let row = sqlx::query("SELECT id FROM apartments WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<i64, _>("id")))
    }

    async fn resolve_or_create_offer(
        &self,
        at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query(
            r#"
            SELECT id FROM offers
            WHERE starts_at <= $1 AND $1 <= ends_at
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(at)
        .fetch_optional(&mut *tx)
        .await?;

        let id = match existing {
            Some(row) => row.get::<i64, _>("id"),
            None => {
                let row = sqlx::query(
                    "INSERT INTO offers (starts_at, ends_at) VALUES ($1, $2) RETURNING id",
                )
                .bind(at)
                .bind(ends_at)
                .fetch_one(&mut *tx)
                .await?;
                row.get::<i64, _>("id")
            }
        };

        tx.commit().await?;
        Ok(id)
    }

    async fn record_assignment(&self, apartment_id: i64, offer_id: i64) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO assignments (apartment_id, offer_id)
            VALUES ($1, $2)
            ON CONFLICT (apartment_id, offer_id) DO NOTHING
            "#,
        )
        .bind(apartment_id)
        .bind(offer_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn append_state(&self, snapshot: &StateSnapshot) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO state_snapshots
                (observed_at, apartment_id, offer_id, applicants, top_credit)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(snapshot.observed_at)
        .bind(snapshot.apartment_id)
        .bind(snapshot.offer_id)
        .bind(snapshot.applicants)
        .bind(snapshot.top_credit)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn current_offer(&self) -> Result<Option<Offer>, StoreError> {
        let row = sqlx::query(
            "SELECT id, starts_at, ends_at FROM offers ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Offer {
            id: r.get("id"),
            starts_at: r.get("starts_at"),
            ends_at: r.get("ends_at"),
        }))
    }

    async fn current_offer_size(&self) -> Result<i64, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS size FROM assignments
            WHERE offer_id = (SELECT MAX(id) FROM offers)
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<i64, _>("size"))
    }
}
