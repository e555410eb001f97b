use async_trait::async_trait;
use thiserror::Error;

use crate::models::ScrapeRecord;

/// What a walk is after. The source shapes the record it returns
/// accordingly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkMode {
    /// Descriptive fields from the listing page.
    Metadata,
    /// End-of-validity timestamps from the logged-in detail pages.
    Offering,
    /// Applicant counts and top credits from the listing page.
    State,
}

/// Outcome of one `item_at` attempt.
///
/// `NotReady` is the explicit transient case: the item did not render within
/// the source's wait budget. The walker retries the same position; the wait
/// already spent is the backoff.
#[derive(Debug, Clone)]
pub enum Fetch {
    Item(ScrapeRecord),
    NotReady,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("listing count not readable: {0}")]
    Count(String),

    #[error(transparent)]
    Browser(#[from] anyhow::Error),
}

/// Live paginated listing, addressed by ordinal position.
///
/// Common trait for listing backends so the engine can walk a real browser
/// session or a scripted double interchangeably.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Number of items currently listed.
    async fn count(&self) -> Result<u32, SourceError>;

    /// Retrieve the record at 1-based `position`, or report that it is not
    /// ready yet. A hard error means the source itself is broken and ends
    /// the walk.
    async fn item_at(&self, position: u32, mode: WalkMode) -> Result<Fetch, SourceError>;
}
