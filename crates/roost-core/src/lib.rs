pub mod adapter;
pub mod aggregate;
pub mod cache;
pub mod dedupe;
pub mod error;
pub mod filters;
pub mod listing;
pub mod registry;
pub mod score;
pub mod testutil;

pub use adapter::SourceAdapter;
pub use aggregate::{Aggregator, AggregatorConfig, ResultSummary, SearchResults};
pub use cache::{CacheConfig, CacheStats, ResultCache};
pub use error::AdapterError;
pub use filters::SearchFilters;
pub use listing::{Bills, Contact, PricePeriod, PropertyType, StandardListing};
pub use registry::{AdapterHealth, ServiceRegistry, SourceStatus};
