use async_trait::async_trait;

use crate::error::AdapterError;
use crate::filters::SearchFilters;
use crate::listing::StandardListing;

/// Contract every upstream listing source must satisfy.
///
/// One implementation per upstream provider. The engine consumes adapters
/// only through this trait; transport, parsing, and any internal retry
/// behavior are invisible to it.
///
/// # Contract
///
/// - `search` returns an **empty vector** for "no results found", never an
///   error. Errors are reserved for genuine failure (timeout, auth failure,
///   malformed upstream payload) so that the registry's health metrics stay
///   meaningful.
/// - Filter fields the upstream cannot honor are silently ignored; the
///   aggregator re-checks explicit constraints on the way out.
/// - `is_available` is a local precondition check (configuration present),
///   performs no I/O, and is consulted before every dispatch. A
///   misconfigured adapter is skipped, not failed.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Short stable name of the upstream source (used as the id prefix).
    fn name(&self) -> &str;

    /// True only if the adapter is configured well enough to be called.
    fn is_available(&self) -> bool;

    /// Fetch listings matching the filters, normalized to [`StandardListing`].
    async fn search(
        &self,
        filters: &SearchFilters,
    ) -> Result<Vec<StandardListing>, AdapterError>;
}
