use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use gemeindefinder::config::{EnrichmentConfig, API_KEY_ENV};
use gemeindefinder::enrichment::{AddRequest, Enricher};
use gemeindefinder::extractor::{HttpPageFetcher, ListingExtractor};
use gemeindefinder::geocoding::{LocationEnricher, OpenRouteService};
use gemeindefinder::metrics::derive_metrics;
use gemeindefinder::models::{PropertyRecord, RecordUpdate, Status};
use gemeindefinder::store::{find_reference, load_reference_table, CsvStore, PropertyStore};
use gemeindefinder::tui;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Gemeindefinder - Track interesting Swiss properties")]
struct Cli {
    /// Path to the interested items CSV file
    #[clap(short, long, env = "GEMEINDEFINDER_STORE", default_value = "interested_items.csv")]
    store: PathBuf,

    /// Path to the commune reference CSV (Canton, Gemeinde, MoreTaxPerMonth)
    #[clap(short, long, default_value = "reference.csv")]
    reference: PathBuf,

    /// OpenRouteService API key (overrides ORS_API_KEY)
    #[clap(long)]
    api_key: Option<String>,

    /// Enable debug output
    #[clap(short, long)]
    debug: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add a commune from the reference table to the interested items
    Add {
        /// Commune (Gemeinde) name as it appears in the reference table
        #[clap(short, long)]
        gemeinde: String,

        /// Canton, to disambiguate communes with the same name
        #[clap(short, long)]
        canton: Option<String>,

        /// Listing link to scrape details from
        #[clap(short, long, default_value = "")]
        link: String,

        #[clap(short, long, default_value = "")]
        notes: String,

        #[clap(long, default_value = "interested")]
        status: Status,
    },

    /// Edit fields of an existing item
    Edit {
        id: Uuid,

        #[clap(flatten)]
        fields: EditFields,
    },

    /// Re-run driving time and listing enrichment for an existing item
    Enrich { id: Uuid },

    /// Show the interested items
    List {
        #[clap(flatten)]
        filter: FilterArgs,
    },

    /// Show price per m² and the loan the monthly tax difference would carry
    Metrics {
        /// Annual interest rate in percent
        #[clap(long, default_value = "1.5")]
        rate: f64,

        #[clap(flatten)]
        filter: FilterArgs,
    },

    /// Enrich a link and commune without storing anything
    Preview {
        #[clap(short, long, default_value = "")]
        link: String,

        #[clap(short, long)]
        gemeinde: Option<String>,
    },
}

#[derive(Args, Debug, Default)]
struct EditFields {
    #[clap(long)]
    link: Option<String>,
    #[clap(long)]
    status: Option<Status>,
    #[clap(long)]
    notes: Option<String>,
    #[clap(long)]
    buy_price: Option<String>,
    #[clap(long)]
    rooms: Option<String>,
    #[clap(long)]
    living_space: Option<String>,
    #[clap(long)]
    land_area: Option<String>,
    #[clap(long)]
    year_built: Option<String>,
}

impl From<EditFields> for RecordUpdate {
    fn from(fields: EditFields) -> Self {
        RecordUpdate {
            link: fields.link,
            notes: fields.notes,
            status: fields.status,
            travel_time: None,
            buy_price: fields.buy_price,
            rooms: fields.rooms,
            living_space: fields.living_space,
            land_area: fields.land_area,
            year_built: fields.year_built,
        }
    }
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// Include items with status 'delete'
    #[clap(long)]
    show_deleted: bool,

    /// Only show these cantons (repeatable)
    #[clap(long = "canton")]
    cantons: Vec<String>,

    /// Only show these statuses (repeatable)
    #[clap(long = "status")]
    statuses: Vec<Status>,
}

impl FilterArgs {
    fn matches(&self, record: &PropertyRecord) -> bool {
        if record.status.is_deleted() && !self.show_deleted {
            return false;
        }
        if !self.cantons.is_empty()
            && !self
                .cantons
                .iter()
                .any(|canton| canton.eq_ignore_ascii_case(&record.canton))
        {
            return false;
        }
        self.statuses.is_empty() || self.statuses.contains(&record.status)
    }
}

type LiveEnricher = Enricher<HttpPageFetcher, OpenRouteService>;

fn build_enricher(api_key: Option<String>) -> Result<LiveEnricher> {
    let config = match api_key {
        Some(key) => EnrichmentConfig::from_env().with_api_key(Some(key)),
        None => EnrichmentConfig::from_env(),
    };
    if config.api_key.is_none() {
        info!("{} not set, driving times will be skipped", API_KEY_ENV);
    }

    Ok(Enricher::new(
        ListingExtractor::from_config(&config)?,
        LocationEnricher::from_config(&config)?,
    ))
}

fn init_logging(debug: bool) {
    let default_directive = if debug { "gemeindefinder=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let store = CsvStore::new(&cli.store);

    match cli.command {
        Command::Add {
            gemeinde,
            canton,
            link,
            notes,
            status,
        } => {
            let rows = load_reference_table(&cli.reference).with_context(|| {
                format!("Failed to load reference table {}", cli.reference.display())
            })?;
            let reference = find_reference(&rows, &gemeinde, canton.as_deref())
                .cloned()
                .with_context(|| format!("Commune '{}' not found in reference table", gemeinde))?;

            let enricher = build_enricher(cli.api_key)?;
            let record = enricher.build_record(
                AddRequest {
                    reference,
                    link,
                    notes,
                    status,
                },
                Utc::now(),
            )?;
            store.insert(record.clone())?;
            tui::show_record_added(&record)?;
        }
        Command::Edit { id, fields } => {
            let update = RecordUpdate::from(fields);
            let record = store.update(id, update.clone(), Utc::now())?;
            tui::show_record_updated(&record, &update)?;
        }
        Command::Enrich { id } => {
            let existing = store.find(id)?;
            let enricher = build_enricher(cli.api_key)?;
            let update = enricher.refresh(&existing);
            let record = store.update(id, update.clone(), Utc::now())?;
            tui::show_record_updated(&record, &update)?;
        }
        Command::List { filter } => {
            let records = store.select_all()?;
            let shown: Vec<&PropertyRecord> = records.iter().filter(|r| filter.matches(r)).collect();
            tui::show_records(&shown, records.len())?;
        }
        Command::Metrics { rate, filter } => {
            let records = store.select_all()?;
            let rows: Vec<_> = records
                .iter()
                .filter(|r| filter.matches(r))
                .map(|r| (r, derive_metrics(r, rate)))
                .collect();
            tui::show_metrics(&rows, rate)?;
        }
        Command::Preview { link, gemeinde } => {
            let enricher = build_enricher(cli.api_key)?;
            let location = gemeinde
                .as_deref()
                .map(|place| enricher.location().enrich(place))
                .unwrap_or_default();
            let listing = enricher.extractor().extract(&link);
            tui::show_enrichment(&location, &listing)?;
        }
    }

    Ok(())
}
