use std::collections::HashSet;

use crate::listing::StandardListing;

/// Collapse near-identical listings surfaced by multiple sources.
///
/// Two listings are considered the same property when they share
/// `(lowercased location, price, bedrooms)`. The first-seen entry per key
/// wins; input arrives in discovery order (priority group, then invocation
/// order), so a higher-priority source wins ties.
///
/// Known limitation: two genuinely distinct listings sharing the key
/// collapse into one. Accepted as a domain trade-off: rental duplicates
/// across sources rarely agree on anything stronger than this triple.
///
/// Repeated ids are also dropped, keeping ids unique within one result set.
pub fn dedupe(listings: Vec<StandardListing>) -> Vec<StandardListing> {
    let mut seen_keys = HashSet::new();
    let mut seen_ids = HashSet::new();
    let mut out = Vec::with_capacity(listings.len());

    for listing in listings {
        let key = dedupe_key(&listing);
        if !seen_ids.insert(listing.id.clone()) {
            tracing::debug!(id = %listing.id, "Dropped duplicate listing id");
            continue;
        }
        if !seen_keys.insert(key) {
            tracing::debug!(id = %listing.id, source = %listing.source, "Collapsed duplicate listing");
            continue;
        }
        out.push(listing);
    }
    out
}

fn dedupe_key(listing: &StandardListing) -> String {
    format!(
        "{}|{}|{}",
        listing.location.trim().to_lowercase(),
        listing.price,
        listing.bedrooms
    )
}
