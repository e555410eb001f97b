use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::ScrapeRecord;
use crate::scrapers::{Fetch, ListingSource, SourceError, WalkMode};
use crate::store::StoreError;

/// Consecutive ingestion failures tolerated at one position before the walk
/// gives up on the listing as structurally broken.
pub const STRIKE_LIMIT: u32 = 5;

/// Where walked records go. Only storage failures may escape; they count as
/// strikes upstream.
#[async_trait]
pub trait RecordSink: Send {
    async fn ingest(&mut self, record: ScrapeRecord) -> Result<(), StoreError>;
}

#[derive(Debug, Error)]
pub enum EnumerationError {
    #[error("item {position} failed ingestion {strikes} times in a row: {source}")]
    Stuck {
        position: u32,
        strikes: u32,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Walk the listing from position 1 through `total`, feeding each record to
/// `sink`.
///
/// The cursor only advances on successful ingestion. A transient fetch
/// (`Fetch::NotReady`) retries the same position without penalty: the
/// source's own bounded wait is the backoff. An ingestion failure is a
/// strike; [`STRIKE_LIMIT`] consecutive strikes abort the walk, which is the
/// guard against spinning forever on one permanently broken record.
pub async fn walk(
    source: &dyn ListingSource,
    mode: WalkMode,
    total: u32,
    sink: &mut dyn RecordSink,
) -> Result<(), EnumerationError> {
    let mut position: u32 = 1;
    let mut strikes: u32 = 0;

    while position <= total {
        match source.item_at(position, mode).await? {
            Fetch::NotReady => {
                debug!(position, ?mode, "item not ready, retrying same position");
            }
            Fetch::Item(record) => match sink.ingest(record).await {
                Ok(()) => {
                    position += 1;
                    strikes = 0;
                }
                Err(err) => {
                    strikes += 1;
                    warn!(position, strikes, error = %err, "ingestion failed");
                    if strikes >= STRIKE_LIMIT {
                        return Err(EnumerationError::Stuck {
                            position,
                            strikes,
                            source: err,
                        });
                    }
                }
            },
        }
    }

    debug!(total, ?mode, "walk complete");
    Ok(())
}
