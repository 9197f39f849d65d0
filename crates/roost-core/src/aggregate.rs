//! Search orchestration: priority-ordered, time-bounded parallel fan-out.
//!
//! One search call walks the enabled sources tier by tier. Every adapter
//! in a tier runs concurrently under its own timeout; the whole tier
//! resolves (success, failure, or timeout for every member) before the
//! next tier is considered. Raw results then flow through a fixed
//! pipeline: dedupe → score → rank → constraint filter → cache.
//!
//! ```text
//! search(filters)
//!    ├─ cache hit? ── yes ──────────────────────────────► {listings, summary}
//!    └─ tier 1: [adapter, adapter]   (parallel, per-call timeout)
//!       tier 2: [adapter]            (only if below early-stop threshold)
//!       ──► dedupe ──► score ──► sort ──► filter ──► cache ──► {listings, summary}
//! ```
//!
//! One adapter's failure never aborts the search: it becomes a summary
//! error string and a health-metric entry. If every adapter fails the
//! caller gets an empty list plus all collected errors; the aggregator
//! never synthesizes listings itself.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::cache::{CacheConfig, CacheStats, ResultCache};
use crate::dedupe::dedupe;
use crate::error::AdapterError;
use crate::filters::SearchFilters;
use crate::listing::StandardListing;
use crate::registry::{AdapterHealth, RegisteredSource, ServiceRegistry, SourceStatus};
use crate::score;

/// Tuning knobs for one aggregator instance.
///
/// The defaults mirror production behavior; tests shrink them.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Independent timeout applied to each adapter call.
    pub adapter_timeout: Duration,
    /// Stop fetching lower-priority tiers once this many raw listings
    /// have accumulated.
    pub early_stop_threshold: usize,
    pub cache_ttl: Duration,
    pub cache_capacity: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            adapter_timeout: Duration::from_secs(30),
            early_stop_threshold: 50,
            cache_ttl: Duration::from_secs(300),
            cache_capacity: 100,
        }
    }
}

/// What happened during one search call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResultSummary {
    /// Listings in the final result set, after dedupe and filtering.
    pub total_found: usize,
    /// Listing count per answering source, in discovery order. Raw counts
    /// on a live search; recomputed from the cached set on a cache hit.
    pub per_source: Vec<(String, usize)>,
    pub elapsed_ms: u64,
    /// One entry per failed adapter call. Empty listings plus populated
    /// errors distinguishes "every source failed" from "no matches".
    pub errors: Vec<String>,
    pub cache_hit: bool,
}

/// The result object `search` always returns. Upstream failures never
/// surface as errors to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub listings: Vec<StandardListing>,
    pub summary: ResultSummary,
}

/// Orchestrates parallel searches across registered sources.
///
/// Explicitly constructed and passed by reference to whichever layer
/// needs it; no ambient global instance.
pub struct Aggregator {
    registry: Arc<ServiceRegistry>,
    cache: ResultCache,
    config: AggregatorConfig,
}

impl Aggregator {
    pub fn new(registry: Arc<ServiceRegistry>) -> Self {
        Self::with_config(registry, AggregatorConfig::default())
    }

    pub fn with_config(registry: Arc<ServiceRegistry>, config: AggregatorConfig) -> Self {
        let cache = ResultCache::new(CacheConfig {
            ttl: config.cache_ttl,
            capacity: config.cache_capacity,
        });
        Self {
            registry,
            cache,
            config,
        }
    }

    /// Run one aggregated search. Sole query entry point.
    pub async fn search(&self, filters: &SearchFilters) -> SearchResults {
        let started = Instant::now();
        let fingerprint = filters.fingerprint();

        if let Some(listings) = self.cache.get(&fingerprint) {
            let summary = ResultSummary {
                total_found: listings.len(),
                per_source: count_by_source(&listings),
                elapsed_ms: started.elapsed().as_millis() as u64,
                errors: Vec::new(),
                cache_hit: true,
            };
            return SearchResults { listings, summary };
        }

        let (raw, per_source, errors) = self.fan_out(filters).await;

        let mut listings = dedupe(raw);
        for listing in &mut listings {
            score::apply(listing);
        }
        // Stable sort, so equal scores keep discovery order.
        listings.sort_by(|a, b| b.ranking_score().cmp(&a.ranking_score()));
        // Adapters may ignore filter fields they cannot honor, so the
        // explicit constraints are re-checked on the way out.
        listings.retain(|listing| filters.allows(listing));

        self.cache.insert(fingerprint, listings.clone());

        let summary = ResultSummary {
            total_found: listings.len(),
            per_source,
            elapsed_ms: started.elapsed().as_millis() as u64,
            errors,
            cache_hit: false,
        };
        tracing::info!(
            total = summary.total_found,
            sources = summary.per_source.len(),
            failures = summary.errors.len(),
            elapsed_ms = summary.elapsed_ms,
            "Search complete"
        );
        SearchResults { listings, summary }
    }

    /// Invoke enabled sources tier by tier until done or the early-stop
    /// threshold is reached. Returns raw listings in discovery order,
    /// per-source counts, and collected error strings.
    async fn fan_out(
        &self,
        filters: &SearchFilters,
    ) -> (Vec<StandardListing>, Vec<(String, usize)>, Vec<String>) {
        let mut raw: Vec<StandardListing> = Vec::new();
        let mut per_source: Vec<(String, usize)> = Vec::new();
        let mut errors: Vec<String> = Vec::new();

        for group in priority_groups(self.registry.list_enabled()) {
            let tier = group[0].priority;
            let calls = group
                .into_iter()
                .filter(|source| {
                    if source.adapter.is_available() {
                        true
                    } else {
                        tracing::debug!(source = %source.name, "Skipping unavailable source");
                        false
                    }
                })
                .map(|source| {
                    let timeout = self.config.adapter_timeout;
                    async move {
                        let call_started = Instant::now();
                        let outcome =
                            tokio::time::timeout(timeout, source.adapter.search(filters)).await;
                        (source, call_started.elapsed(), outcome)
                    }
                });

            // Barrier: every member of the tier resolves before the next
            // tier starts. join_all preserves invocation order, which keeps
            // discovery order deterministic.
            let outcomes = futures::future::join_all(calls).await;

            for (source, elapsed, outcome) in outcomes {
                let latency_ms = elapsed.as_millis() as u64;
                match outcome {
                    Ok(Ok(found)) => {
                        self.registry.record_outcome(&source.name, true, latency_ms);
                        tracing::debug!(
                            source = %source.name,
                            count = found.len(),
                            %latency_ms,
                            "Source answered"
                        );
                        per_source.push((source.name, found.len()));
                        raw.extend(found);
                    }
                    Ok(Err(err)) => {
                        self.registry.record_outcome(&source.name, false, latency_ms);
                        tracing::warn!(source = %source.name, error = %err, "Source failed");
                        errors.push(err.to_string());
                    }
                    Err(_) => {
                        self.registry.record_outcome(&source.name, false, latency_ms);
                        let err = AdapterError::Timeout {
                            source: source.name,
                            seconds: self.config.adapter_timeout.as_secs(),
                        };
                        tracing::warn!(error = %err, "Source timed out");
                        errors.push(err.to_string());
                    }
                }
            }

            if raw.len() >= self.config.early_stop_threshold {
                tracing::debug!(
                    %tier,
                    collected = raw.len(),
                    "Early stop: lower-priority tiers skipped"
                );
                break;
            }
        }

        (raw, per_source, errors)
    }

    // -----------------------------------------------------------------
    // Operational controls
    // -----------------------------------------------------------------

    /// Enable a source for future searches.
    pub fn enable_source(&self, name: &str) -> bool {
        self.registry.enable(name)
    }

    /// Disable a source for future searches; in-flight calls finish.
    pub fn disable_source(&self, name: &str) -> bool {
        self.registry.disable(name)
    }

    /// Status of every registered source.
    pub fn available_sources(&self) -> Vec<SourceStatus> {
        self.registry.sources()
    }

    /// Health snapshot for one source.
    pub fn source_status(&self, name: &str) -> Option<AdapterHealth> {
        self.registry.health(name)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

/// Split an ascending-priority source list into tiers of equal priority.
fn priority_groups(sources: Vec<RegisteredSource>) -> Vec<Vec<RegisteredSource>> {
    let mut groups: Vec<Vec<RegisteredSource>> = Vec::new();
    for source in sources {
        match groups.last_mut() {
            Some(group) if group[0].priority == source.priority => group.push(source),
            _ => groups.push(vec![source]),
        }
    }
    groups
}

fn count_by_source(listings: &[StandardListing]) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for listing in listings {
        match counts.iter_mut().find(|(name, _)| *name == listing.source) {
            Some((_, n)) => *n += 1,
            None => counts.push((listing.source.clone(), 1)),
        }
    }
    counts
}
