use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use std::io;

use crate::geocoding::LocationEnrichment;
use crate::models::{DerivedMetrics, ListingAttributes, PropertyRecord, RecordUpdate, Status};

fn status_color(status: Status) -> Color {
    match status {
        Status::Interested => Color::White,
        Status::Contacted => Color::Blue,
        Status::Reviewed => Color::Cyan,
        Status::Visited => Color::Yellow,
        Status::Confirmed => Color::Green,
        Status::Delete => Color::DarkGrey,
    }
}

fn print_colored(color: Color, text: String) -> io::Result<()> {
    execute!(
        io::stdout(),
        SetForegroundColor(color),
        Print(text),
        ResetColor
    )
}

fn or_dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

fn format_number(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{:.0}", value),
        None => "-".to_string(),
    }
}

fn format_minutes(value: Option<f64>) -> String {
    match value {
        Some(minutes) => format!("{:.1} min", minutes),
        None => "-".to_string(),
    }
}

/// One line per record: identity, link, travel time, tax, then the listing
/// attributes.
pub fn format_record_line(record: &PropertyRecord) -> String {
    format!(
        "{} | {} - {} | {} | {} | tax {} | {} CHF | {} rooms | {} m² | land {} m² | built {}",
        record.id,
        record.canton,
        record.gemeinde,
        if record.link.is_empty() { "-" } else { record.link.as_str() },
        format_minutes(record.travel_time),
        or_dash(record.more_tax_per_month.as_deref()),
        or_dash(record.buy_price.as_deref()),
        or_dash(record.rooms.as_deref()),
        or_dash(record.living_space.as_deref()),
        or_dash(record.land_area.as_deref()),
        or_dash(record.year_built.as_deref()),
    )
}

pub fn show_records(records: &[&PropertyRecord], total: usize) -> io::Result<()> {
    print_colored(
        Color::DarkGrey,
        format!("📁 Showing {} of {} records\n", records.len(), total),
    )?;

    if records.is_empty() {
        return print_colored(Color::Yellow, "No items to display.\n".to_string());
    }

    for record in records {
        print_colored(
            status_color(record.status),
            format!("[{:<10}] {}\n", record.status, format_record_line(record)),
        )?;
        if !record.notes.trim().is_empty() {
            print_colored(Color::DarkGrey, format!("             ↳ {}\n", record.notes.trim()))?;
        }
    }
    Ok(())
}

pub fn show_metrics(rows: &[(&PropertyRecord, DerivedMetrics)], annual_rate: f64) -> io::Result<()> {
    print_colored(
        Color::White,
        format!("💰 Derived metrics at {}% over 30 years\n", annual_rate),
    )?;

    for (record, metrics) in rows {
        print_colored(
            status_color(record.status),
            format!(
                "{} - {}: {} CHF/m², loan estimate {} CHF\n",
                record.canton,
                record.gemeinde,
                format_number(metrics.price_per_area),
                format_number(metrics.loan_estimate)
            ),
        )?;
    }
    Ok(())
}

pub fn show_enrichment(location: &LocationEnrichment, listing: &ListingAttributes) -> io::Result<()> {
    match location.driving_time {
        Some(minutes) => print_colored(
            Color::Green,
            format!("✓ Driving time: {:.1} min\n", minutes),
        )?,
        None => print_colored(
            Color::Yellow,
            "⚠ Driving time unavailable (no API key, place not found or routing failed)\n"
                .to_string(),
        )?,
    }

    let color = if listing.is_empty() {
        Color::Yellow
    } else {
        Color::Green
    };
    print_colored(
        color,
        format!(
            "{} Listing: {}/5 attributes (price {}, rooms {}, living {}, land {}, built {})\n",
            if listing.is_empty() { "⚠" } else { "✓" },
            listing.found_count(),
            or_dash(listing.buy_price.as_deref()),
            or_dash(listing.rooms.as_deref()),
            or_dash(listing.living_space.as_deref()),
            or_dash(listing.land_area.as_deref()),
            or_dash(listing.year_built.as_deref()),
        ),
    )
}

pub fn show_record_added(record: &PropertyRecord) -> io::Result<()> {
    show_enrichment(
        &LocationEnrichment {
            coordinates: None,
            driving_time: record.travel_time,
        },
        &record.listing(),
    )?;
    print_colored(
        Color::Green,
        format!("✅ Row added to interested items: {}\n", record.id),
    )
}

pub fn show_record_updated(record: &PropertyRecord, update: &RecordUpdate) -> io::Result<()> {
    if update.is_empty() {
        return print_colored(
            Color::Yellow,
            format!("⚠ Nothing new for {}, only the timestamp changed\n", record.id),
        );
    }
    print_colored(Color::Green, format!("✅ Row updated: {}\n", record.id))?;
    print_colored(status_color(record.status), format!("{}\n", format_record_line(record)))
}
