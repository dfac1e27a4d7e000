//! Fetching marketplace search pages and turning them into raw listings.
use async_trait::async_trait;
use thiserror::Error;

use crate::monitor::models::RawListing;

pub mod marketplace;

pub use marketplace::{HttpScanner, ListingSelectors};

#[derive(Error, Debug)]
pub enum ScanFailure {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Marketplace returned non-success status: {0}")]
    Status(reqwest::StatusCode),
    #[error(
        "Inconsistent listing fields: {titles} titles, {prices} prices, {locations} locations, {links} links"
    )]
    InconsistentListing {
        titles: usize,
        prices: usize,
        locations: usize,
        links: usize,
    },
    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
}

/// Produces the listings shown on a marketplace search page.
///
/// A failure only means "no usable result this time"; callers skip the
/// target for the current cycle and never retry within it.
#[async_trait]
pub trait Scanner: Send + Sync {
    async fn scan(&self, url: &str) -> Result<Vec<RawListing>, ScanFailure>;
}
