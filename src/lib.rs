pub mod config;
pub mod enrichment;
pub mod error;
pub mod extractor;
pub mod geocoding;
pub mod metrics;
pub mod models;
pub mod numeric;
pub mod store;
#[cfg(test)]
mod test_support;
pub mod tui;
