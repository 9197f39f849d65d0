//! Source adapter for upstreams without an API, scraping the search
//! results page with per-source CSS selectors.
//!
//! Each extraction strategy is its own adapter behind the common
//! contract, so the engine never needs strategy-specific knowledge. A
//! failed page fetch is an error; an individual card that doesn't parse
//! is skipped with a warning, because one broken card should not hide
//! the rest of the page.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use scraper::{ElementRef, Html, Selector};

use roost_core::adapter::SourceAdapter;
use roost_core::error::AdapterError;
use roost_core::filters::SearchFilters;
use roost_core::listing::{Bills, PricePeriod, PropertyType, StandardListing};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// CSS selectors describing one upstream's search results page.
///
/// `card` scopes every other selector; optional ones fall back to
/// defaults (the search location, one bedroom, no image).
#[derive(Debug, Clone)]
pub struct HtmlSelectors {
    pub card: String,
    pub title: String,
    pub price: String,
    pub location: Option<String>,
    pub bedrooms: Option<String>,
    pub link: String,
    pub image: Option<String>,
}

impl Default for HtmlSelectors {
    fn default() -> Self {
        Self {
            card: ".listing-card".into(),
            title: ".listing-title".into(),
            price: ".listing-price".into(),
            location: Some(".listing-location".into()),
            bedrooms: Some(".listing-beds".into()),
            link: "a".into(),
            image: Some("img".into()),
        }
    }
}

struct ParsedSelectors {
    card: Selector,
    title: Selector,
    price: Selector,
    location: Option<Selector>,
    bedrooms: Option<Selector>,
    link: Selector,
    image: Option<Selector>,
}

impl ParsedSelectors {
    fn parse(name: &str, selectors: &HtmlSelectors) -> Option<Self> {
        fn one(name: &str, css: &str) -> Option<Selector> {
            match Selector::parse(css) {
                Ok(sel) => Some(sel),
                Err(e) => {
                    tracing::warn!(source = %name, selector = %css, error = %e, "Invalid selector");
                    None
                }
            }
        }

        Some(Self {
            card: one(name, &selectors.card)?,
            title: one(name, &selectors.title)?,
            price: one(name, &selectors.price)?,
            location: match &selectors.location {
                Some(css) => Some(one(name, css)?),
                None => None,
            },
            bedrooms: match &selectors.bedrooms {
                Some(css) => Some(one(name, css)?),
                None => None,
            },
            link: one(name, &selectors.link)?,
            image: match &selectors.image {
                Some(css) => Some(one(name, css)?),
                None => None,
            },
        })
    }
}

/// Adapter that scrapes listings out of a search results page.
///
/// `search_url` is a template with a `{location}` placeholder, e.g.
/// `https://lettings.example/search?q={location}`. A template without the
/// placeholder, or an unparseable selector set, leaves the adapter
/// unavailable rather than failing searches.
pub struct HtmlAdapter {
    name: String,
    search_url: Option<String>,
    selectors: Option<ParsedSelectors>,
    client: Option<Client>,
    timeout_secs: u64,
}

impl HtmlAdapter {
    pub fn new(name: impl Into<String>, search_url: &str, selectors: HtmlSelectors) -> Self {
        let name = name.into();

        let search_url = if search_url.contains("{location}") {
            Some(search_url.to_string())
        } else {
            tracing::warn!(source = %name, "Search URL lacks {{location}} placeholder, adapter unavailable");
            None
        };

        let selectors = ParsedSelectors::parse(&name, &selectors);

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
            search_url,
            selectors,
            client,
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
        }
    }

    fn extract(&self, selectors: &ParsedSelectors, html: &str, fallback_location: &str) -> Vec<StandardListing> {
        let document = Html::parse_document(html);
        let mut listings = Vec::new();

        for card in document.select(&selectors.card) {
            match self.extract_card(selectors, &card, fallback_location) {
                Some(listing) => listings.push(listing),
                None => {
                    tracing::warn!(source = %self.name, "Skipping unparseable listing card");
                }
            }
        }
        listings
    }

    fn extract_card(
        &self,
        selectors: &ParsedSelectors,
        card: &ElementRef<'_>,
        fallback_location: &str,
    ) -> Option<StandardListing> {
        let title = select_text(card, &selectors.title)?;
        let price_text = select_text(card, &selectors.price)?;
        let price = parse_price(&price_text)?;
        let link = card
            .select(&selectors.link)
            .next()
            .and_then(|a| a.value().attr("href"))?
            .to_string();

        let location = selectors
            .location
            .as_ref()
            .and_then(|sel| select_text(card, sel))
            .unwrap_or_else(|| fallback_location.to_string());

        let bedrooms = selectors
            .bedrooms
            .as_ref()
            .and_then(|sel| select_text(card, sel))
            .and_then(|text| parse_bedrooms(&text))
            .unwrap_or(1);

        let images: Vec<String> = selectors
            .image
            .as_ref()
            .map(|sel| {
                card.select(sel)
                    .filter_map(|img| img.value().attr("src"))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Some(StandardListing {
            id: format!("{}-{}", self.name, id_from_link(&link)),
            source: self.name.clone(),
            source_url: link,
            title,
            description: String::new(),
            price,
            price_period: parse_period(&price_text),
            location,
            postcode: None,
            latitude: None,
            longitude: None,
            property_type: PropertyType::Flat,
            bedrooms,
            bathrooms: 1,
            furnished: false,
            features: Vec::new(),
            amenities: Vec::new(),
            available: true,
            available_from: None,
            bills: Bills::default(),
            images,
            contact: None,
            quality_score: 0,
            suitability_score: 0,
            last_updated: Utc::now(),
        })
    }
}

#[async_trait]
impl SourceAdapter for HtmlAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.search_url.is_some() && self.selectors.is_some() && self.client.is_some()
    }

    async fn search(
        &self,
        filters: &SearchFilters,
    ) -> Result<Vec<StandardListing>, AdapterError> {
        let (Some(template), Some(selectors), Some(client)) =
            (&self.search_url, &self.selectors, &self.client)
        else {
            // Unreachable through the aggregator, which checks is_available first.
            return Ok(Vec::new());
        };

        let encoded: String =
            url::form_urlencoded::byte_serialize(filters.location.as_bytes()).collect();
        let page_url = template.replace("{location}", &encoded);

        let response = client.get(&page_url).send().await.map_err(|e| {
            if e.is_timeout() {
                AdapterError::Timeout {
                    source: self.name.clone(),
                    seconds: self.timeout_secs,
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

        let body = response.text().await.map_err(|e| AdapterError::Malformed {
            source: self.name.clone(),
            message: format!("failed to read page body: {e}"),
        })?;

        let listings = self.extract(selectors, &body, &filters.location);
        tracing::debug!(source = %self.name, count = listings.len(), "Extracted listings from page");
        Ok(listings)
    }
}

fn select_text(card: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    let element = card.select(selector).next()?;
    let text: String = element.text().collect::<Vec<_>>().join(" ");
    let trimmed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if trimmed.is_empty() { None } else { Some(trimmed) }
}

/// First run of digits in the text, ignoring currency symbols and
/// thousands separators ("£1,200 pcm" → 1200).
fn parse_price(text: &str) -> Option<u32> {
    let digits: String = text
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok().filter(|p| *p > 0)
}

/// "pw" and "/week" mean weekly rent; everything else is monthly.
fn parse_period(text: &str) -> PricePeriod {
    let lower = text.to_lowercase();
    if lower.contains("pw") || lower.contains("/week") || lower.contains("per week") {
        PricePeriod::Week
    } else {
        PricePeriod::Month
    }
}

/// "Studio" counts as zero bedrooms; otherwise the first number wins.
fn parse_bedrooms(text: &str) -> Option<u8> {
    if text.to_lowercase().contains("studio") {
        return Some(0);
    }
    let digits: String = text.chars().skip_while(|c| !c.is_ascii_digit()).take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Stable id from the listing link: the last non-empty path segment.
fn id_from_link(link: &str) -> String {
    link.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or(link)
        .split('?')
        .next()
        .unwrap_or(link)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
        <html><body>
          <div class="listing-card">
            <h2 class="listing-title">Two bed flat on Wilmslow Road</h2>
            <span class="listing-price">£850 pcm</span>
            <span class="listing-location">Fallowfield</span>
            <span class="listing-beds">2 bed</span>
            <a href="/property/9917">View</a>
            <img src="https://img.example/9917.jpg" />
          </div>
          <div class="listing-card">
            <h2 class="listing-title">Studio near the station</h2>
            <span class="listing-price">£160 pw</span>
            <span class="listing-beds">Studio</span>
            <a href="/property/4410">View</a>
          </div>
          <div class="listing-card">
            <h2 class="listing-title">Card with no price</h2>
            <a href="/property/broken">View</a>
          </div>
        </body></html>
    "#;

    fn adapter() -> HtmlAdapter {
        HtmlAdapter::new(
            "lettify",
            "https://lettify.example/search?q={location}",
            HtmlSelectors::default(),
        )
    }

    #[test]
    fn test_extracts_cards_and_skips_broken_ones() {
        let adapter = adapter();
        let selectors = adapter.selectors.as_ref().unwrap();
        let listings = adapter.extract(selectors, FIXTURE, "Manchester");

        assert_eq!(listings.len(), 2, "the priceless card must be skipped");

        assert_eq!(listings[0].id, "lettify-9917");
        assert_eq!(listings[0].title, "Two bed flat on Wilmslow Road");
        assert_eq!(listings[0].price, 850);
        assert_eq!(listings[0].price_period, PricePeriod::Month);
        assert_eq!(listings[0].location, "Fallowfield");
        assert_eq!(listings[0].bedrooms, 2);
        assert_eq!(listings[0].images, vec!["https://img.example/9917.jpg"]);

        assert_eq!(listings[1].price, 160);
        assert_eq!(listings[1].price_period, PricePeriod::Week);
        assert_eq!(listings[1].bedrooms, 0);
        assert_eq!(listings[1].location, "Manchester", "falls back to the search location");
    }

    #[test]
    fn test_empty_page_is_no_results() {
        let adapter = adapter();
        let selectors = adapter.selectors.as_ref().unwrap();
        assert!(adapter.extract(selectors, "<html><body></body></html>", "Leeds").is_empty());
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("£650 pcm"), Some(650));
        assert_eq!(parse_price("£1,200 / month"), Some(1200));
        assert_eq!(parse_price("POA"), None);
    }

    #[test]
    fn test_parse_bedrooms() {
        assert_eq!(parse_bedrooms("2 bed"), Some(2));
        assert_eq!(parse_bedrooms("Bedrooms: 3"), Some(3));
        assert_eq!(parse_bedrooms("Studio"), Some(0));
        assert_eq!(parse_bedrooms("no number"), None);
    }

    #[test]
    fn test_id_from_link() {
        assert_eq!(id_from_link("/property/9917"), "9917");
        assert_eq!(id_from_link("https://x.example/listings/ab12/"), "ab12");
        assert_eq!(id_from_link("/property/9917?src=search"), "9917");
    }

    #[test]
    fn test_missing_placeholder_makes_adapter_unavailable() {
        let adapter = HtmlAdapter::new(
            "lettify",
            "https://lettify.example/search",
            HtmlSelectors::default(),
        );
        assert!(!adapter.is_available());
    }

    #[test]
    fn test_bad_selector_makes_adapter_unavailable() {
        let adapter = HtmlAdapter::new(
            "lettify",
            "https://lettify.example/search?q={location}",
            HtmlSelectors {
                card: ":::".into(),
                ..HtmlSelectors::default()
            },
        );
        assert!(!adapter.is_available());
    }
}
