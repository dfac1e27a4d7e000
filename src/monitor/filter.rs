use super::models::RawListing;
use super::query::MatchPredicate;

/// Keeps the listings whose title satisfies `predicate`, in their original order.
/// Without a predicate every listing is kept.
pub fn filter_listings(listings: Vec<RawListing>, predicate: Option<&MatchPredicate>) -> Vec<RawListing> {
    match predicate {
        Some(predicate) => listings
            .into_iter()
            .filter(|listing| predicate.matches(&listing.name))
            .collect(),
        None => listings,
    }
}
