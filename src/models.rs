use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;

/// A WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Routing and geocoding services exchange positions as `[lon, lat]`.
    pub fn to_lon_lat(self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

/// Fields scraped from a listing page, exactly as they appeared there.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingAttributes {
    pub buy_price: Option<String>,
    pub rooms: Option<String>,
    pub living_space: Option<String>,
    pub land_area: Option<String>,
    pub year_built: Option<String>,
}

impl ListingAttributes {
    pub fn is_empty(&self) -> bool {
        self.found_count() == 0
    }

    pub fn found_count(&self) -> usize {
        [
            &self.buy_price,
            &self.rooms,
            &self.living_space,
            &self.land_area,
            &self.year_built,
        ]
        .iter()
        .filter(|field| field.is_some())
        .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Interested,
    Contacted,
    Reviewed,
    Visited,
    Confirmed,
    /// Logical deletion. The row stays in the store.
    Delete,
}

impl Status {
    pub const ALL: [Status; 6] = [
        Status::Interested,
        Status::Contacted,
        Status::Reviewed,
        Status::Visited,
        Status::Confirmed,
        Status::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Interested => "interested",
            Status::Contacted => "contacted",
            Status::Reviewed => "reviewed",
            Status::Visited => "visited",
            Status::Confirmed => "confirmed",
            Status::Delete => "delete",
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, Status::Delete)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Status::ALL
            .iter()
            .find(|status| status.as_str() == wanted)
            .copied()
            .ok_or_else(|| Error::UnknownStatus {
                value: s.to_string(),
                expected: Status::ALL
                    .iter()
                    .map(Status::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

/// One row of the commune reference table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRow {
    #[serde(rename = "Canton")]
    pub canton: String,
    #[serde(rename = "Gemeinde")]
    pub gemeinde: String,
    #[serde(rename = "MoreTaxPerMonth", default)]
    pub more_tax_per_month: Option<String>,
}

/// A tracked property as persisted in the store.
///
/// Numeric-looking fields are kept as the text that was scraped or typed in
/// and are only normalized when metrics are derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub id: Uuid,
    #[serde(rename = "Canton")]
    pub canton: String,
    #[serde(rename = "Gemeinde")]
    pub gemeinde: String,
    #[serde(rename = "MoreTaxPerMonth")]
    pub more_tax_per_month: Option<String>,
    pub link: String,
    pub notes: String,
    pub status: Status,
    #[serde(rename = "traveltime")]
    pub travel_time: Option<f64>,
    #[serde(rename = "Buy Price")]
    pub buy_price: Option<String>,
    #[serde(rename = "Rooms")]
    pub rooms: Option<String>,
    #[serde(rename = "Living Space")]
    pub living_space: Option<String>,
    #[serde(rename = "Land Area")]
    pub land_area: Option<String>,
    #[serde(rename = "Year Built")]
    pub year_built: Option<String>,
    pub added_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl PropertyRecord {
    pub fn listing(&self) -> ListingAttributes {
        ListingAttributes {
            buy_price: self.buy_price.clone(),
            rooms: self.rooms.clone(),
            living_space: self.living_space.clone(),
            land_area: self.land_area.clone(),
            year_built: self.year_built.clone(),
        }
    }

    pub fn set_listing(&mut self, listing: ListingAttributes) {
        self.buy_price = listing.buy_price;
        self.rooms = listing.rooms;
        self.living_space = listing.living_space;
        self.land_area = listing.land_area;
        self.year_built = listing.year_built;
    }

    /// Applies the fields present in `update` and stamps `updated_at`.
    pub fn apply(&mut self, update: RecordUpdate, now: DateTime<Utc>) {
        if let Some(link) = update.link {
            self.link = link;
        }
        if let Some(notes) = update.notes {
            self.notes = notes;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(travel_time) = update.travel_time {
            self.travel_time = Some(travel_time);
        }
        if let Some(value) = update.buy_price {
            self.buy_price = non_blank(value);
        }
        if let Some(value) = update.rooms {
            self.rooms = non_blank(value);
        }
        if let Some(value) = update.living_space {
            self.living_space = non_blank(value);
        }
        if let Some(value) = update.land_area {
            self.land_area = non_blank(value);
        }
        if let Some(value) = update.year_built {
            self.year_built = non_blank(value);
        }
        self.updated_at = Some(now);
    }
}

/// A partial set of field changes for one record. `None` leaves the field
/// untouched; an empty string clears a listing attribute.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordUpdate {
    pub link: Option<String>,
    pub notes: Option<String>,
    pub status: Option<Status>,
    pub travel_time: Option<f64>,
    pub buy_price: Option<String>,
    pub rooms: Option<String>,
    pub living_space: Option<String>,
    pub land_area: Option<String>,
    pub year_built: Option<String>,
}

impl RecordUpdate {
    /// Carries over only the attributes that were actually found.
    pub fn with_listing(mut self, listing: ListingAttributes) -> Self {
        self.buy_price = listing.buy_price.or(self.buy_price);
        self.rooms = listing.rooms.or(self.rooms);
        self.living_space = listing.living_space.or(self.living_space);
        self.land_area = listing.land_area.or(self.land_area);
        self.year_built = listing.year_built.or(self.year_built);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == RecordUpdate::default()
    }
}

/// Presentation-only values computed from a record on read.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DerivedMetrics {
    pub price_per_area: Option<f64>,
    pub loan_estimate: Option<f64>,
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
