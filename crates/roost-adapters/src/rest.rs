//! Source adapter for upstreams with a JSON search API.
//!
//! Translates the filter fields the wire format defines into query
//! parameters and normalizes the upstream's listing payload into
//! [`StandardListing`]s. "No results" is an empty `listings` array in the
//! payload and maps to an empty vector; only transport, auth, and decode
//! failures become errors.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::Url;

use roost_core::adapter::SourceAdapter;
use roost_core::error::AdapterError;
use roost_core::filters::SearchFilters;
use roost_core::listing::{Bills, Contact, PricePeriod, PropertyType, StandardListing};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Adapter for a JSON/REST listing source.
///
/// Construction never fails: a bad endpoint or client build leaves the
/// adapter unavailable, which the aggregator detects via
/// [`SourceAdapter::is_available`] and skips.
pub struct RestAdapter {
    name: String,
    endpoint: Option<Url>,
    api_key: Option<String>,
    client: Option<Client>,
    timeout_secs: u64,
}

impl RestAdapter {
    pub fn new(name: impl Into<String>, endpoint: &str) -> Self {
        let name = name.into();

        let endpoint = match Url::parse(endpoint) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(source = %name, error = %e, "Invalid endpoint, adapter unavailable");
                None
            }
        };

        let client = match Client::builder()
            .user_agent(concat!("roost/", env!("CARGO_PKG_VERSION")))
            .timeout(DEFAULT_TIMEOUT)
            .build()
        {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(source = %name, error = %e, "HTTP client build failed, adapter unavailable");
                None
            }
        };

        Self {
            name,
            endpoint,
            api_key: None,
            client,
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
        }
    }

    /// Send this key as a bearer token on every request.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Filter fields as query parameters. Fields the wire format has no
    /// parameter for are not sent; the engine re-checks constraints anyway.
    fn query_params(filters: &SearchFilters) -> Vec<(&'static str, String)> {
        let mut params = vec![("location", filters.location.clone())];
        if let Some(v) = filters.min_price {
            params.push(("min_price", v.to_string()));
        }
        if let Some(v) = filters.max_price {
            params.push(("max_price", v.to_string()));
        }
        if let Some(v) = filters.min_bedrooms {
            params.push(("min_bedrooms", v.to_string()));
        }
        if let Some(v) = filters.min_bathrooms {
            params.push(("min_bathrooms", v.to_string()));
        }
        if let Some(v) = filters.property_type {
            params.push(("property_type", v.to_string()));
        }
        if let Some(v) = filters.furnished {
            params.push(("furnished", v.to_string()));
        }
        if let Some(v) = filters.bills_included {
            params.push(("bills_included", v.to_string()));
        }
        if let Some(v) = filters.available_from {
            params.push(("available_from", v.format("%Y-%m-%d").to_string()));
        }
        if let Some(v) = filters.radius_km {
            params.push(("radius_km", format!("{v:.1}")));
        }
        params
    }
}

#[async_trait]
impl SourceAdapter for RestAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.endpoint.is_some() && self.client.is_some()
    }

    async fn search(
        &self,
        filters: &SearchFilters,
    ) -> Result<Vec<StandardListing>, AdapterError> {
        let (Some(endpoint), Some(client)) = (&self.endpoint, &self.client) else {
            // Unreachable through the aggregator, which checks is_available first.
            return Ok(Vec::new());
        };

        let mut request = client
            .get(endpoint.clone())
            .query(&Self::query_params(filters));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                AdapterError::Timeout {
                    source: self.name.clone(),
                    seconds: self.timeout_secs,
                }
            } else if e.is_connect() {
                AdapterError::Network {
                    source: self.name.clone(),
                    message: format!("connection failed: {e}"),
                }
            } else {
                AdapterError::Network {
                    source: self.name.clone(),
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AdapterError::Auth {
                source: self.name.clone(),
                message: format!("HTTP {}", status.as_u16()),
            });
        }
        if !status.is_success() {
            return Err(AdapterError::UpstreamStatus {
                source: self.name.clone(),
                status: status.as_u16(),
            });
        }

        let payload: SearchResponse =
            response.json().await.map_err(|e| AdapterError::Malformed {
                source: self.name.clone(),
                message: e.to_string(),
            })?;

        Ok(payload
            .listings
            .into_iter()
            .map(|dto| dto.into_listing(&self.name))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    listings: Vec<ListingDto>,
}

/// Upstream listing shape. Everything beyond id/title/price/location is
/// optional with sensible defaults, since sources fill their payloads
/// unevenly.
#[derive(Debug, Deserialize)]
struct ListingDto {
    id: serde_json::Value,
    title: String,
    #[serde(default)]
    description: String,
    price: u32,
    #[serde(default = "default_period")]
    period: PricePeriod,
    location: String,
    postcode: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    #[serde(default = "default_property_type")]
    property_type: PropertyType,
    #[serde(default)]
    bedrooms: u8,
    #[serde(default)]
    bathrooms: u8,
    #[serde(default)]
    furnished: bool,
    #[serde(default)]
    features: Vec<String>,
    #[serde(default)]
    amenities: Vec<String>,
    #[serde(default = "default_true")]
    available: bool,
    available_from: Option<NaiveDate>,
    #[serde(default)]
    bills_included: bool,
    #[serde(default)]
    bill_details: Vec<String>,
    #[serde(default)]
    images: Vec<String>,
    contact: Option<ContactDto>,
    url: Option<String>,
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ContactDto {
    name: String,
    phone: Option<String>,
    email: Option<String>,
    #[serde(default)]
    verified: bool,
    rating: Option<f32>,
}

fn default_period() -> PricePeriod {
    PricePeriod::Month
}

fn default_property_type() -> PropertyType {
    PropertyType::Flat
}

fn default_true() -> bool {
    true
}

/// Upstreams disagree on whether ids are strings or numbers.
fn id_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl ListingDto {
    fn into_listing(self, source: &str) -> StandardListing {
        StandardListing {
            id: format!("{source}-{}", id_string(&self.id)),
            source: source.to_string(),
            source_url: self.url.unwrap_or_default(),
            title: self.title,
            description: self.description,
            price: self.price,
            price_period: self.period,
            location: self.location,
            postcode: self.postcode,
            latitude: self.latitude,
            longitude: self.longitude,
            property_type: self.property_type,
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            furnished: self.furnished,
            features: self.features,
            amenities: self.amenities,
            available: self.available,
            available_from: self.available_from,
            bills: Bills {
                included: self.bills_included,
                details: self.bill_details,
            },
            images: self.images,
            contact: self.contact.map(|c| Contact {
                name: c.name,
                phone: c.phone,
                email: c.email,
                verified: c.verified,
                rating: c.rating,
            }),
            quality_score: 0,
            suitability_score: 0,
            last_updated: self.updated_at.unwrap_or_else(Utc::now),
        }
    }
}
