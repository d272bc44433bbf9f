pub mod controller;
pub mod error;
pub mod lookup;
pub mod recent;
pub mod schema;
pub mod storage;

// Re-export commonly used types
pub use controller::{SearchController, SearchFailure, SearchSnapshot, SearchState};
pub use error::{LookupError, StoreError, ValidationError};
pub use lookup::{LookupService, lookup_prompt, response_schema};
pub use recent::{MAX_RECENT, RecentSearchEntry, RecentSearches};
pub use schema::{FreshTier, MAX_TOP_BILLED, MovieResult, validate};
pub use storage::{FileRecentStorage, InMemoryRecentStorage, RecentStorage};
