use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Kind of property a listing advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Flat,
    House,
    Studio,
    Room,
    Shared,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Flat => "flat",
            PropertyType::House => "house",
            PropertyType::Studio => "studio",
            PropertyType::Room => "room",
            PropertyType::Shared => "shared",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PropertyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "flat" | "apartment" => Ok(PropertyType::Flat),
            "house" => Ok(PropertyType::House),
            "studio" => Ok(PropertyType::Studio),
            "room" => Ok(PropertyType::Room),
            "shared" => Ok(PropertyType::Shared),
            _ => Err(format!("Unknown property type: {}", s)),
        }
    }
}

/// Billing period the advertised price refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PricePeriod {
    Week,
    Month,
}

impl fmt::Display for PricePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PricePeriod::Week => write!(f, "week"),
            PricePeriod::Month => write!(f, "month"),
        }
    }
}

/// Utility-bill terms attached to a listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bills {
    pub included: bool,
    /// Which bills are covered (e.g. "gas", "electricity", "wifi").
    #[serde(default)]
    pub details: Vec<String>,
}

/// Landlord or agent contact details, where the upstream exposes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Whether the upstream has verified this advertiser.
    #[serde(default)]
    pub verified: bool,
    pub rating: Option<f32>,
}

/// A rental listing normalized to the shape every adapter must produce.
///
/// Instances are created by adapters per search call, owned by the
/// aggregator while it deduplicates, scores, and ranks, and become
/// immutable shared values once stored in the result cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardListing {
    /// Globally unique id, prefixed with the source name (e.g. `openrent-8841`).
    pub id: String,
    /// Name of the adapter that produced this listing.
    pub source: String,
    /// Link back to the listing on the upstream site.
    pub source_url: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Rent amount in whole currency units per `price_period`.
    pub price: u32,
    pub price_period: PricePeriod,
    pub location: String,
    pub postcode: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub property_type: PropertyType,
    pub bedrooms: u8,
    pub bathrooms: u8,
    pub furnished: bool,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub amenities: Vec<String>,
    pub available: bool,
    pub available_from: Option<NaiveDate>,
    #[serde(default)]
    pub bills: Bills,
    #[serde(default)]
    pub images: Vec<String>,
    pub contact: Option<Contact>,
    /// Heuristic listing quality, 0–100. Assigned by the engine, not adapters.
    #[serde(default)]
    pub quality_score: u8,
    /// Heuristic domain suitability, 0–100. Assigned by the engine, not adapters.
    #[serde(default)]
    pub suitability_score: u8,
    pub last_updated: DateTime<Utc>,
}

impl StandardListing {
    /// Combined score used for ranking. Ties are broken by discovery order.
    pub fn ranking_score(&self) -> u16 {
        u16::from(self.quality_score) + u16::from(self.suitability_score)
    }
}
