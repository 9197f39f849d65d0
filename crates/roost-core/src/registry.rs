//! Adapter registry with priority tiers and rolling health metrics.
//!
//! Sources are registered explicitly at startup (dependency injection, no
//! runtime discovery), carry an enable/disable flag that takes effect for
//! future searches without cancelling in-flight calls, and accumulate
//! health metrics for the lifetime of the process.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::adapter::SourceAdapter;

/// Rolling health metrics for one registered source.
///
/// Owned by the registry and updated after every dispatched call; reset
/// only on process restart.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AdapterHealth {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// Running average over all requests: `avg' = (avg*(n-1) + latency) / n`.
    pub average_response_ms: f64,
    /// `failed_requests / total_requests`, 0.0 when nothing was dispatched yet.
    pub error_rate: f64,
    pub last_request: Option<DateTime<Utc>>,
}

impl AdapterHealth {
    fn record(&mut self, success: bool, latency_ms: u64) {
        self.total_requests += 1;
        if success {
            self.successful_requests += 1;
        } else {
            self.failed_requests += 1;
        }
        let n = self.total_requests as f64;
        self.average_response_ms =
            (self.average_response_ms * (n - 1.0) + latency_ms as f64) / n;
        self.error_rate = self.failed_requests as f64 / n;
        self.last_request = Some(Utc::now());
    }
}

/// One enabled source as handed to the aggregator.
#[derive(Clone)]
pub struct RegisteredSource {
    pub name: String,
    pub priority: u8,
    pub adapter: Arc<dyn SourceAdapter>,
}

/// Status snapshot for operational introspection.
#[derive(Debug, Clone, Serialize)]
pub struct SourceStatus {
    pub name: String,
    pub priority: u8,
    pub enabled: bool,
    pub health: AdapterHealth,
}

struct SourceSlot {
    name: String,
    priority: u8,
    enabled: bool,
    adapter: Arc<dyn SourceAdapter>,
    health: AdapterHealth,
}

/// Thread-safe registry of source adapters.
///
/// Shared by overlapping searches; all mutation goes through a single
/// mutex so concurrent outcome recordings cannot corrupt the running
/// averages.
#[derive(Default)]
pub struct ServiceRegistry {
    inner: Mutex<Vec<SourceSlot>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the inner mutex lock, recovering from poison if necessary.
    fn lock_inner(&self) -> std::sync::MutexGuard<'_, Vec<SourceSlot>> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Recovered from poisoned registry mutex");
            poisoned.into_inner()
        })
    }

    /// Register an adapter under a name and priority tier.
    ///
    /// Lower priority values are fetched first. Registering a name twice
    /// replaces the adapter and resets its health.
    pub fn register(&self, name: impl Into<String>, adapter: Arc<dyn SourceAdapter>, priority: u8) {
        let name = name.into();
        let mut slots = self.lock_inner();
        if let Some(slot) = slots.iter_mut().find(|s| s.name == name) {
            tracing::warn!(source = %name, "Re-registering source, health reset");
            slot.priority = priority;
            slot.adapter = adapter;
            slot.health = AdapterHealth::default();
            slot.enabled = true;
            return;
        }
        tracing::info!(source = %name, %priority, "Source registered");
        slots.push(SourceSlot {
            name,
            priority,
            enabled: true,
            adapter,
            health: AdapterHealth::default(),
        });
    }

    /// Enable a source for future searches. Returns false if unknown.
    pub fn enable(&self, name: &str) -> bool {
        self.set_enabled(name, true)
    }

    /// Disable a source for future searches. In-flight calls already
    /// dispatched are not cancelled. Returns false if unknown.
    pub fn disable(&self, name: &str) -> bool {
        self.set_enabled(name, false)
    }

    fn set_enabled(&self, name: &str, enabled: bool) -> bool {
        let mut slots = self.lock_inner();
        match slots.iter_mut().find(|s| s.name == name) {
            Some(slot) => {
                if slot.enabled != enabled {
                    tracing::info!(source = %name, %enabled, "Source toggled");
                }
                slot.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Enabled sources in ascending priority order.
    ///
    /// The sort is stable, so sources within one tier keep registration
    /// order, which keeps discovery order and ranking tie-breaks
    /// deterministic.
    pub fn list_enabled(&self) -> Vec<RegisteredSource> {
        let slots = self.lock_inner();
        let mut enabled: Vec<RegisteredSource> = slots
            .iter()
            .filter(|s| s.enabled)
            .map(|s| RegisteredSource {
                name: s.name.clone(),
                priority: s.priority,
                adapter: Arc::clone(&s.adapter),
            })
            .collect();
        enabled.sort_by_key(|s| s.priority);
        enabled
    }

    /// Record the outcome of one dispatched call.
    pub fn record_outcome(&self, name: &str, success: bool, latency_ms: u64) {
        let mut slots = self.lock_inner();
        if let Some(slot) = slots.iter_mut().find(|s| s.name == name) {
            slot.health.record(success, latency_ms);
        }
    }

    /// Health snapshot for one source, if registered.
    pub fn health(&self, name: &str) -> Option<AdapterHealth> {
        let slots = self.lock_inner();
        slots.iter().find(|s| s.name == name).map(|s| s.health.clone())
    }

    /// Status snapshots for every registered source, in registration order.
    pub fn sources(&self) -> Vec<SourceStatus> {
        let slots = self.lock_inner();
        slots
            .iter()
            .map(|s| SourceStatus {
                name: s.name.clone(),
                priority: s.priority,
                enabled: s.enabled,
                health: s.health.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockAdapter;

    fn mock(name: &str) -> Arc<dyn SourceAdapter> {
        Arc::new(MockAdapter::returning(name, vec![]))
    }

    #[test]
    fn test_list_enabled_sorts_by_priority_stably() {
        let registry = ServiceRegistry::new();
        registry.register("c", mock("c"), 2);
        registry.register("a", mock("a"), 1);
        registry.register("b", mock("b"), 1);

        let names: Vec<_> = registry.list_enabled().iter().map(|s| s.name.clone()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_disable_excludes_from_enabled_list() {
        let registry = ServiceRegistry::new();
        registry.register("a", mock("a"), 1);
        registry.register("b", mock("b"), 1);

        assert!(registry.disable("a"));
        let names: Vec<_> = registry.list_enabled().iter().map(|s| s.name.clone()).collect();
        assert_eq!(names, vec!["b"]);

        assert!(registry.enable("a"));
        assert_eq!(registry.list_enabled().len(), 2);
    }

    #[test]
    fn test_toggle_unknown_source_returns_false() {
        let registry = ServiceRegistry::new();
        assert!(!registry.enable("ghost"));
        assert!(!registry.disable("ghost"));
    }

    #[test]
    fn test_record_outcome_running_average() {
        let registry = ServiceRegistry::new();
        registry.register("a", mock("a"), 1);

        registry.record_outcome("a", true, 100);
        registry.record_outcome("a", true, 200);
        registry.record_outcome("a", false, 600);

        let health = registry.health("a").unwrap();
        assert_eq!(health.total_requests, 3);
        assert_eq!(health.successful_requests, 2);
        assert_eq!(health.failed_requests, 1);
        assert!((health.average_response_ms - 300.0).abs() < f64::EPSILON);
        assert!((health.error_rate - 1.0 / 3.0).abs() < 1e-9);
        assert!(health.last_request.is_some());
    }

    #[test]
    fn test_health_starts_zeroed() {
        let registry = ServiceRegistry::new();
        registry.register("a", mock("a"), 1);

        let health = registry.health("a").unwrap();
        assert_eq!(health.total_requests, 0);
        assert_eq!(health.error_rate, 0.0);
        assert!(health.last_request.is_none());
    }

    #[test]
    fn test_reregister_resets_health() {
        let registry = ServiceRegistry::new();
        registry.register("a", mock("a"), 1);
        registry.record_outcome("a", false, 50);

        registry.register("a", mock("a"), 3);
        let health = registry.health("a").unwrap();
        assert_eq!(health.total_requests, 0);
        assert_eq!(registry.sources()[0].priority, 3);
    }

    #[test]
    fn test_sources_snapshot_in_registration_order() {
        let registry = ServiceRegistry::new();
        registry.register("z", mock("z"), 9);
        registry.register("a", mock("a"), 1);
        registry.disable("z");

        let statuses = registry.sources();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].name, "z");
        assert!(!statuses[0].enabled);
        assert_eq!(statuses[1].name, "a");
        assert!(statuses[1].enabled);
    }
}
