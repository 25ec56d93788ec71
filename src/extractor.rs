use anyhow::{Context, Result};
use regex::Regex;
use reqwest::blocking::Client;
use tracing::{debug, warn};

use crate::config::EnrichmentConfig;
use crate::models::ListingAttributes;

const PRICE_PATTERN: &str = r#""price"\s*:\s*("?\d(?:[\d'.,]*\d)?"?)"#;
const ROOMS_PATTERN: &str = r#""numberOfRooms"\s*:\s*("?\d(?:[\d'.,]*\d)?"?)"#;
const LIVING_SPACE_PATTERN: &str = r#""livingSpace"\s*:\s*("?\d(?:[\d'.,]*\d)?"?)"#;
const LAND_AREA_PATTERN: &str = r#""lotSize"\s*:\s*("?\d(?:[\d'.,]*\d)?"?)"#;
const YEAR_BUILT_PATTERN: &str = r#""yearBuilt"\s*:\s*("?\d(?:[\d'.,]*\d)?"?)"#;

/// Source of listing page bodies.
pub trait PageFetcher {
    fn fetch(&self, url: &str) -> Result<String>;
}

pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub fn new(config: &EnrichmentConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.page_timeout)
            .build()
            .context("Failed to build listing page client")?;

        Ok(Self { client })
    }
}

impl PageFetcher for HttpPageFetcher {
    fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .context("Failed to fetch listing page")?
            .error_for_status()
            .context("Listing page returned an error status")?;

        response.text().context("Failed to read listing page body")
    }
}

/// One regex per listing attribute. Each must have a single capture group
/// holding the value.
#[derive(Debug, Clone)]
pub struct ListingPatterns {
    pub buy_price: Regex,
    pub rooms: Regex,
    pub living_space: Regex,
    pub land_area: Regex,
    pub year_built: Regex,
}

impl ListingPatterns {
    pub fn new(
        buy_price: &str,
        rooms: &str,
        living_space: &str,
        land_area: &str,
        year_built: &str,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            buy_price: Regex::new(buy_price)?,
            rooms: Regex::new(rooms)?,
            living_space: Regex::new(living_space)?,
            land_area: Regex::new(land_area)?,
            year_built: Regex::new(year_built)?,
        })
    }

    /// Looks for each attribute independently; missing ones stay `None`.
    pub fn apply(&self, html: &str) -> ListingAttributes {
        ListingAttributes {
            buy_price: first_capture(&self.buy_price, html),
            rooms: first_capture(&self.rooms, html),
            living_space: first_capture(&self.living_space, html),
            land_area: first_capture(&self.land_area, html),
            year_built: first_capture(&self.year_built, html),
        }
    }
}

impl Default for ListingPatterns {
    /// Matches the schema.org style `"key": value` fragments that listing
    /// portals embed in their pages.
    fn default() -> Self {
        Self::new(
            PRICE_PATTERN,
            ROOMS_PATTERN,
            LIVING_SPACE_PATTERN,
            LAND_AREA_PATTERN,
            YEAR_BUILT_PATTERN,
        )
        .expect("built-in listing patterns compile")
    }
}

fn first_capture(pattern: &Regex, html: &str) -> Option<String> {
    let value = pattern.captures(html)?.get(1)?.as_str().replace('"', "");
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Only absolute http(s) links are fetched.
pub fn looks_like_url(link: &str) -> bool {
    let link = link.trim();
    link.starts_with("http://") || link.starts_with("https://")
}

/// Best-effort scraping of listing attributes from a listing link.
pub struct ListingExtractor<F: PageFetcher> {
    fetcher: F,
    patterns: ListingPatterns,
}

impl ListingExtractor<HttpPageFetcher> {
    pub fn from_config(config: &EnrichmentConfig) -> Result<Self> {
        Ok(Self::new(HttpPageFetcher::new(config)?))
    }
}

impl<F: PageFetcher> ListingExtractor<F> {
    pub fn new(fetcher: F) -> Self {
        Self::with_patterns(fetcher, ListingPatterns::default())
    }

    pub fn with_patterns(fetcher: F, patterns: ListingPatterns) -> Self {
        Self { fetcher, patterns }
    }

    /// Fetches `link` and extracts what it can. Invalid links and failed
    /// fetches give an all-absent result.
    pub fn extract(&self, link: &str) -> ListingAttributes {
        if !looks_like_url(link) {
            debug!("Skipping listing extraction for non-URL link: {:?}", link);
            return ListingAttributes::default();
        }

        let html = match self.fetcher.fetch(link.trim()) {
            Ok(html) => html,
            Err(e) => {
                warn!("Could not fetch listing {}: {:#}", link, e);
                return ListingAttributes::default();
            }
        };

        let attributes = self.extract_from_html(&html);
        debug!(
            "Extracted {}/5 listing attributes from {}: {:?}",
            attributes.found_count(),
            link,
            attributes
        );
        attributes
    }

    pub fn extract_from_html(&self, html: &str) -> ListingAttributes {
        self.patterns.apply(html)
    }
}
