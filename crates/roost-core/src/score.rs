//! Heuristic listing scores.
//!
//! Both scores are pure, deterministic functions of the listing: identical
//! input always produces identical output, which the ranking tests rely on.
//! Scores clamp to [0, 100]; a value outside that range is a programming
//! error and gets clamped rather than propagated.

use crate::listing::StandardListing;

/// Terms that make a listing a better fit for the target renter base
/// (students and commuters). Matched case-insensitively against features,
/// amenities, and the description.
const SUITABILITY_KEYWORDS: &[&str] = &[
    "university",
    "campus",
    "student",
    "transport",
    "station",
    "metro",
    "tram",
    "bus",
    "city centre",
    "city center",
    "gym",
    "parking",
];

/// Score how well-presented and trustworthy a listing is.
///
/// Base 50, +10 for having any image, +10 more for more than three,
/// +10 for a description longer than 100 chars, +15 for a verified
/// contact, and 2 points per feature/amenity capped at +15.
pub fn quality_score(listing: &StandardListing) -> u8 {
    let mut score: i32 = 50;

    if !listing.images.is_empty() {
        score += 10;
    }
    if listing.images.len() > 3 {
        score += 10;
    }
    if listing.description.len() > 100 {
        score += 10;
    }
    if listing.contact.as_ref().is_some_and(|c| c.verified) {
        score += 15;
    }
    let extras = (listing.features.len() + listing.amenities.len()) as i32;
    score += (extras * 2).min(15);

    clamp(score)
}

/// Score how well a listing fits the domain: affordable rent, bills
/// handled, furnished, and close to campus or transport links.
pub fn suitability_score(listing: &StandardListing) -> u8 {
    let mut score: i32 = 50;

    score += match listing.price {
        0..=600 => 20,
        601..=800 => 10,
        801..=1000 => 5,
        _ => 0,
    };
    if listing.bills.included {
        score += 15;
    }
    if listing.furnished {
        score += 10;
    }
    if mentions_keyword(listing) {
        score += 15;
    }

    clamp(score)
}

/// Compute and assign both scores in place.
pub fn apply(listing: &mut StandardListing) {
    listing.quality_score = quality_score(listing);
    listing.suitability_score = suitability_score(listing);
}

fn mentions_keyword(listing: &StandardListing) -> bool {
    let haystacks = listing
        .features
        .iter()
        .chain(listing.amenities.iter())
        .map(String::as_str)
        .chain(std::iter::once(listing.description.as_str()));

    for text in haystacks {
        let text = text.to_lowercase();
        if SUITABILITY_KEYWORDS.iter().any(|kw| text.contains(kw)) {
            return true;
        }
    }
    false
}

fn clamp(score: i32) -> u8 {
    score.clamp(0, 100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::Contact;
    use crate::testutil::sample_listing;

    fn bare(price: u32) -> StandardListing {
        let mut listing = sample_listing("score", 1, price);
        listing.description = String::new();
        listing.furnished = false;
        listing
    }

    #[test]
    fn test_quality_base_for_bare_listing() {
        assert_eq!(quality_score(&bare(700)), 50);
    }

    #[test]
    fn test_quality_image_bonuses() {
        let mut listing = bare(700);
        listing.images = vec!["a.jpg".into()];
        assert_eq!(quality_score(&listing), 60);

        listing.images = vec!["a".into(), "b".into(), "c".into(), "d".into()];
        assert_eq!(quality_score(&listing), 70);
    }

    #[test]
    fn test_quality_description_and_contact_bonuses() {
        let mut listing = bare(700);
        listing.description = "x".repeat(101);
        assert_eq!(quality_score(&listing), 60);

        listing.contact = Some(Contact {
            name: "Agent".into(),
            phone: None,
            email: None,
            verified: true,
            rating: None,
        });
        assert_eq!(quality_score(&listing), 75);
    }

    #[test]
    fn test_quality_feature_points_capped_at_15() {
        let mut listing = bare(700);
        listing.features = vec!["garden".into(), "balcony".into()];
        listing.amenities = vec!["dishwasher".into()];
        assert_eq!(quality_score(&listing), 56);

        listing.features = (0..20).map(|i| format!("f{i}")).collect();
        assert_eq!(quality_score(&listing), 65);
    }

    #[test]
    fn test_quality_clamps_at_100() {
        let mut listing = bare(700);
        listing.images = (0..5).map(|i| format!("{i}.jpg")).collect();
        listing.description = "y".repeat(200);
        listing.features = (0..10).map(|i| format!("f{i}")).collect();
        listing.contact = Some(Contact {
            name: "Agent".into(),
            phone: None,
            email: None,
            verified: true,
            rating: Some(4.8),
        });
        // 50 + 10 + 10 + 10 + 15 + 15 = 110, clamped.
        assert_eq!(quality_score(&listing), 100);
    }

    #[test]
    fn test_suitability_price_tiers() {
        assert_eq!(suitability_score(&bare(600)), 70);
        assert_eq!(suitability_score(&bare(601)), 60);
        assert_eq!(suitability_score(&bare(800)), 60);
        assert_eq!(suitability_score(&bare(801)), 55);
        assert_eq!(suitability_score(&bare(1000)), 55);
        assert_eq!(suitability_score(&bare(1001)), 50);
    }

    #[test]
    fn test_suitability_bills_and_furnished_bonuses() {
        let mut listing = bare(1200);
        listing.bills.included = true;
        assert_eq!(suitability_score(&listing), 65);

        listing.furnished = true;
        assert_eq!(suitability_score(&listing), 75);
    }

    #[test]
    fn test_suitability_keyword_match_is_case_insensitive() {
        let mut listing = bare(1200);
        listing.description = "Five minutes from the University on foot".into();
        assert_eq!(suitability_score(&listing), 65);

        let mut listing = bare(1200);
        listing.amenities = vec!["Near Tram stop".into()];
        assert_eq!(suitability_score(&listing), 65);
    }

    #[test]
    fn test_suitability_clamps_at_100() {
        let mut listing = bare(500);
        listing.bills.included = true;
        listing.furnished = true;
        listing.description = "student accommodation near the station".into();
        // 50 + 20 + 15 + 10 + 15 = 110, clamped.
        assert_eq!(suitability_score(&listing), 100);
    }

    #[test]
    fn test_scores_always_in_bounds() {
        // Sweep a spread of listing shapes; both scores must stay in [0, 100].
        for price in [0, 300, 600, 601, 800, 801, 1000, 1001, 5000] {
            for n_features in [0usize, 1, 8, 30] {
                let mut listing = bare(price);
                listing.features = (0..n_features).map(|i| format!("f{i}")).collect();
                score_in_bounds(&listing);
            }
        }
    }

    fn score_in_bounds(listing: &StandardListing) {
        assert!(quality_score(listing) <= 100);
        assert!(suitability_score(listing) <= 100);
    }

    #[test]
    fn test_apply_sets_both_scores() {
        let mut listing = bare(600);
        apply(&mut listing);
        assert_eq!(listing.quality_score, 50);
        assert_eq!(listing.suitability_score, 70);
    }
}
