pub mod browser;
pub mod parse;
pub mod traits;

pub use browser::BrowserSource;
pub use traits::{Fetch, ListingSource, SourceError, WalkMode};
