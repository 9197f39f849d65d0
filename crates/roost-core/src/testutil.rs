//! Test utilities: mock source adapter and listing factories.
//!
//! Handwritten mocks for dependency injection in unit tests. Interior
//! state sits behind mutexes so tests can assert on recorded calls after
//! handing the adapter to a registry as `Arc<dyn SourceAdapter>`.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::adapter::SourceAdapter;
use crate::error::AdapterError;
use crate::filters::SearchFilters;
use crate::listing::{Bills, PricePeriod, PropertyType, StandardListing};

/// A minimal valid listing for tests.
///
/// One-bed Manchester flat at the given price, no images, features, or
/// contact, so both heuristic scores start from their base values. Tests
/// override individual fields as needed.
pub fn sample_listing(source: &str, n: u32, price: u32) -> StandardListing {
    StandardListing {
        id: format!("{source}-{n}"),
        source: source.to_string(),
        source_url: format!("https://{source}.example/listings/{n}"),
        title: format!("1 bed flat ({source} #{n})"),
        description: String::new(),
        price,
        price_period: PricePeriod::Month,
        location: "Manchester".to_string(),
        postcode: None,
        latitude: None,
        longitude: None,
        property_type: PropertyType::Flat,
        bedrooms: 1,
        bathrooms: 1,
        furnished: false,
        features: Vec::new(),
        amenities: Vec::new(),
        available: true,
        available_from: None,
        bills: Bills::default(),
        images: Vec::new(),
        contact: None,
        quality_score: 0,
        suitability_score: 0,
        last_updated: Utc::now(),
    }
}

/// Mock source adapter with scripted responses.
///
/// Each `search` call pops the next scripted response; once the script is
/// exhausted, further calls return no results. An optional artificial
/// delay makes timeout paths testable.
pub struct MockAdapter {
    name: String,
    available: bool,
    delay: Option<Duration>,
    responses: Mutex<Vec<Result<Vec<StandardListing>, AdapterError>>>,
    calls: Mutex<u64>,
}

impl MockAdapter {
    /// Adapter that returns the given listings on the first call.
    pub fn returning(name: &str, listings: Vec<StandardListing>) -> Self {
        Self::with_responses(name, vec![Ok(listings)])
    }

    /// Adapter whose first call fails with the given error.
    pub fn failing(name: &str, error: AdapterError) -> Self {
        Self::with_responses(name, vec![Err(error)])
    }

    pub fn with_responses(
        name: &str,
        responses: Vec<Result<Vec<StandardListing>, AdapterError>>,
    ) -> Self {
        Self {
            name: name.to_string(),
            available: true,
            delay: None,
            responses: Mutex::new(responses),
            calls: Mutex::new(0),
        }
    }

    /// Adapter that reports itself as not configured.
    pub fn unavailable(name: &str) -> Self {
        Self {
            available: false,
            ..Self::with_responses(name, Vec::new())
        }
    }

    /// Sleep this long inside every `search` call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of times `search` was invoked.
    pub fn call_count(&self) -> u64 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl SourceAdapter for MockAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn search(
        &self,
        _filters: &SearchFilters,
    ) -> Result<Vec<StandardListing>, AdapterError> {
        {
            *self.calls.lock().unwrap() += 1;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(Vec::new())
        } else {
            responses.remove(0)
        }
    }
}
