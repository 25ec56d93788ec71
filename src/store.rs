use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{PropertyRecord, RecordUpdate, ReferenceRow};

/// Table of tracked properties keyed by record id.
pub trait PropertyStore {
    fn select_all(&self) -> Result<Vec<PropertyRecord>>;
    fn insert(&self, record: PropertyRecord) -> Result<()>;
    /// Applies `update` to the record with `id` and returns the stored result.
    fn update(&self, id: Uuid, update: RecordUpdate, now: DateTime<Utc>) -> Result<PropertyRecord>;

    fn find(&self, id: Uuid) -> Result<PropertyRecord> {
        self.select_all()?
            .into_iter()
            .find(|record| record.id == id)
            .ok_or(Error::RecordNotFound { id })
    }
}

/// A CSV file rewritten in full on every change.
pub struct CsvStore {
    path: PathBuf,
}

impl CsvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn save_all(&self, records: &[PropertyRecord]) -> Result<()> {
        let file = File::create(&self.path).map_err(|source| Error::Io {
            path: self.path.clone(),
            source,
        })?;

        let mut writer = csv::Writer::from_writer(file);
        for record in records {
            writer.serialize(record).map_err(|source| self.csv_error(source))?;
        }
        writer.flush().map_err(|source| Error::Io {
            path: self.path.clone(),
            source,
        })?;

        debug!("Saved {} records to {}", records.len(), self.path.display());
        Ok(())
    }

    fn csv_error(&self, source: csv::Error) -> Error {
        Error::Csv {
            path: self.path.clone(),
            source,
        }
    }
}

impl PropertyStore for CsvStore {
    fn select_all(&self) -> Result<Vec<PropertyRecord>> {
        if !self.path.exists() {
            debug!("Record file does not exist yet: {}", self.path.display());
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&self.path).map_err(|source| self.csv_error(source))?;
        let records = reader
            .deserialize()
            .collect::<std::result::Result<Vec<PropertyRecord>, _>>()
            .map_err(|source| self.csv_error(source))?;

        debug!("Loaded {} records from {}", records.len(), self.path.display());
        Ok(records)
    }

    fn insert(&self, record: PropertyRecord) -> Result<()> {
        let mut records = self.select_all()?;
        info!("Inserting record {} ({} - {})", record.id, record.canton, record.gemeinde);
        records.push(record);
        self.save_all(&records)
    }

    fn update(&self, id: Uuid, update: RecordUpdate, now: DateTime<Utc>) -> Result<PropertyRecord> {
        let mut records = self.select_all()?;
        let record = records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or(Error::RecordNotFound { id })?;

        record.apply(update, now);
        let updated = record.clone();
        self.save_all(&records)?;
        info!("Updated record {}", id);
        Ok(updated)
    }
}

/// Loads the commune reference table (`Canton`, `Gemeinde`, `MoreTaxPerMonth`).
pub fn load_reference_table(path: &Path) -> Result<Vec<ReferenceRow>> {
    let csv_error = |source| Error::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::Reader::from_path(path).map_err(csv_error)?;
    let rows = reader
        .deserialize()
        .collect::<std::result::Result<Vec<ReferenceRow>, _>>()
        .map_err(csv_error)?;

    debug!("Loaded {} reference rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Case-insensitive lookup of a commune, optionally narrowed to a canton.
pub fn find_reference<'a>(
    rows: &'a [ReferenceRow],
    gemeinde: &str,
    canton: Option<&str>,
) -> Option<&'a ReferenceRow> {
    rows.iter().find(|row| {
        row.gemeinde.eq_ignore_ascii_case(gemeinde.trim())
            && canton.map_or(true, |c| row.canton.eq_ignore_ascii_case(c.trim()))
    })
}
