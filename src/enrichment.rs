use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::extractor::{ListingExtractor, PageFetcher};
use crate::geocoding::{LocationEnricher, LocationService};
use crate::models::{PropertyRecord, RecordUpdate, ReferenceRow, Status};

/// User input for a new tracked property.
#[derive(Debug, Clone)]
pub struct AddRequest {
    pub reference: ReferenceRow,
    pub link: String,
    pub notes: String,
    pub status: Status,
}

/// Runs listing extraction and location enrichment for a record.
pub struct Enricher<F: PageFetcher, S: LocationService> {
    extractor: ListingExtractor<F>,
    location: LocationEnricher<S>,
}

impl<F: PageFetcher, S: LocationService> Enricher<F, S> {
    pub fn new(extractor: ListingExtractor<F>, location: LocationEnricher<S>) -> Self {
        Self {
            extractor,
            location,
        }
    }

    pub fn extractor(&self) -> &ListingExtractor<F> {
        &self.extractor
    }

    pub fn location(&self) -> &LocationEnricher<S> {
        &self.location
    }

    /// Builds a fully enriched record ready for insertion. Enrichment gaps
    /// leave fields empty; only a `delete` status is rejected.
    pub fn build_record(&self, request: AddRequest, now: DateTime<Utc>) -> Result<PropertyRecord> {
        if request.status.is_deleted() {
            return Err(Error::StatusNotAllowedOnAdd {
                status: request.status.to_string(),
            });
        }

        let location = self.location.enrich(&request.reference.gemeinde);
        let listing = self.extractor.extract(&request.link);
        info!(
            "Enriched {}: travel time {:?} min, {}/5 listing attributes",
            request.reference.gemeinde,
            location.driving_time,
            listing.found_count()
        );

        let mut record = PropertyRecord {
            id: Uuid::new_v4(),
            canton: request.reference.canton,
            gemeinde: request.reference.gemeinde,
            more_tax_per_month: request.reference.more_tax_per_month,
            link: request.link.trim().to_string(),
            notes: request.notes,
            status: request.status,
            travel_time: location.driving_time,
            buy_price: None,
            rooms: None,
            living_space: None,
            land_area: None,
            year_built: None,
            added_at: now,
            updated_at: None,
        };
        record.set_listing(listing);
        Ok(record)
    }

    /// Re-runs both enrichment paths for a stored record. Only values that
    /// came back present end up in the update, so existing data is never
    /// cleared by a failed lookup.
    pub fn refresh(&self, record: &PropertyRecord) -> RecordUpdate {
        let location = self.location.enrich(&record.gemeinde);
        let listing = self.extractor.extract(&record.link);

        RecordUpdate {
            travel_time: location.driving_time,
            ..Default::default()
        }
        .with_listing(listing)
    }
}
