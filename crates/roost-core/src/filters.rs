use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::listing::{PropertyType, StandardListing};

/// Search criteria for one aggregated query.
///
/// `location` is the only required field. Adapters silently ignore any
/// field they cannot translate to their upstream; the aggregator re-checks
/// the explicit constraints (price bounds, minimum rooms, furnished and
/// bills flags) against every listing before returning it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// City or area to search in.
    pub location: String,
    pub min_price: Option<u32>,
    pub max_price: Option<u32>,
    pub min_bedrooms: Option<u8>,
    pub min_bathrooms: Option<u8>,
    pub property_type: Option<PropertyType>,
    pub furnished: Option<bool>,
    pub bills_included: Option<bool>,
    pub available_from: Option<NaiveDate>,
    /// Search radius around the location, in kilometres.
    pub radius_km: Option<f32>,
}

impl SearchFilters {
    /// Filters that match anything in the given location.
    pub fn for_location(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            min_price: None,
            max_price: None,
            min_bedrooms: None,
            min_bathrooms: None,
            property_type: None,
            furnished: None,
            bills_included: None,
            available_from: None,
            radius_km: None,
        }
    }

    /// Stable cache key for this filter set.
    ///
    /// Built from a canonical string with a fixed field order and
    /// normalized value formatting, so that two filter sets that mean the
    /// same search always produce the same fingerprint.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical_string().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn canonical_string(&self) -> String {
        fn opt<T: std::fmt::Display>(v: &Option<T>) -> String {
            match v {
                Some(v) => v.to_string(),
                None => "-".to_string(),
            }
        }

        format!(
            "location={}|min_price={}|max_price={}|min_bedrooms={}|min_bathrooms={}|\
             property_type={}|furnished={}|bills_included={}|available_from={}|radius_km={}",
            self.location.trim().to_lowercase(),
            opt(&self.min_price),
            opt(&self.max_price),
            opt(&self.min_bedrooms),
            opt(&self.min_bathrooms),
            opt(&self.property_type),
            opt(&self.furnished),
            opt(&self.bills_included),
            opt(&self.available_from.map(|d| d.format("%Y-%m-%d"))),
            opt(&self.radius_km.map(|r| format!("{r:.1}"))),
        )
    }

    /// Whether a listing satisfies the explicit user constraints.
    ///
    /// Applied as the final pipeline step, after scoring: adapters are
    /// allowed to ignore filter fields, so their output is not trusted to
    /// honor them.
    pub fn allows(&self, listing: &StandardListing) -> bool {
        if let Some(min) = self.min_price
            && listing.price < min
        {
            return false;
        }
        if let Some(max) = self.max_price
            && listing.price > max
        {
            return false;
        }
        if let Some(min) = self.min_bedrooms
            && listing.bedrooms < min
        {
            return false;
        }
        if let Some(min) = self.min_bathrooms
            && listing.bathrooms < min
        {
            return false;
        }
        if let Some(furnished) = self.furnished
            && listing.furnished != furnished
        {
            return false;
        }
        if let Some(bills) = self.bills_included
            && listing.bills.included != bills
        {
            return false;
        }
        true
    }
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self::for_location("London")
    }
}
