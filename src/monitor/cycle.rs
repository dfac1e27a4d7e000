use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

use super::filter::filter_listings;
use super::models::RawListing;
use super::query::QueryBuilder;
use super::store::TargetStore;
use crate::notifications::{format_listing_message, NotificationSender};
use crate::scanner::Scanner;

/// Outcome counters for one pass over the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub targets_scanned: usize,
    pub targets_skipped: usize,
    pub scan_failures: usize,
    pub notifications_sent: usize,
    pub notifications_failed: usize,
}

impl CycleReport {
    fn new() -> Self {
        Self {
            started_at: Utc::now(),
            targets_scanned: 0,
            targets_skipped: 0,
            scan_failures: 0,
            notifications_sent: 0,
            notifications_failed: 0,
        }
    }
}

// target id -> links already notified
type SeenLinks = HashMap<u64, HashSet<String>>;

/// One scan-filter-notify pass over every target in the store.
///
/// Targets are processed one at a time in store order. Nothing that goes wrong
/// for one target (scan failure, failed delivery) affects the others.
pub struct PollCycle {
    store: Arc<TargetStore>,
    query_builder: QueryBuilder,
    scanner: Arc<dyn Scanner>,
    sender: Arc<dyn NotificationSender>,
    seen: Option<Mutex<SeenLinks>>,
}

impl PollCycle {
    pub fn new(
        store: Arc<TargetStore>,
        query_builder: QueryBuilder,
        scanner: Arc<dyn Scanner>,
        sender: Arc<dyn NotificationSender>,
    ) -> Self {
        Self {
            store,
            query_builder,
            scanner,
            sender,
            seen: None,
        }
    }

    /// Only notify each listing link once per target instead of on every cycle.
    /// Seen links belong to the stored target, so deleting and re-adding a
    /// name starts over.
    pub fn with_dedup(mut self, enabled: bool) -> Self {
        self.seen = enabled.then(|| Mutex::new(SeenLinks::new()));
        self
    }

    pub async fn run(&self) -> CycleReport {
        let mut report = CycleReport::new();
        let snapshot = self.store.list();
        let live_ids: HashSet<u64> = snapshot.iter().map(|t| t.id).collect();
        self.forget_removed(&live_ids);
        let names: Vec<String> = snapshot.into_iter().map(|t| t.name).collect();

        for name in names {
            // Re-read each entry so edits and deletions made mid-cycle are honoured.
            let Some(target) = self.store.get(&name) else {
                debug!(target_name = %name, "Target deleted during cycle, skipping.");
                report.targets_skipped += 1;
                continue;
            };
            if !target.is_valid() {
                debug!(target_name = %name, "Target is missing keywords or location, skipping.");
                report.targets_skipped += 1;
                continue;
            }

            let query = self.query_builder.build(&target);
            let listings = match self.scanner.scan(&query.url).await {
                Ok(listings) => listings,
                Err(e) => {
                    warn!(target_name = %name, url = %query.url, error = %e, "Scan failed, skipping target this cycle.");
                    report.scan_failures += 1;
                    continue;
                }
            };
            report.targets_scanned += 1;

            let matches = self.unseen(target.id, filter_listings(listings, query.predicate.as_ref()));
            debug!(target_name = %name, matches = matches.len(), "Filtered scan results.");

            for listing in matches {
                let listing_url = self.query_builder.listing_url(&listing.link);
                let text = format_listing_message(&name, &listing, &listing_url);
                match self.sender.send(&text).await {
                    Ok(()) => {
                        report.notifications_sent += 1;
                        self.mark_seen(target.id, &listing.link);
                    }
                    Err(e) => {
                        warn!(target_name = %name, link = %listing_url, error = %e, "Failed to deliver listing notification.");
                        report.notifications_failed += 1;
                    }
                }
            }
        }

        info!(
            scanned = report.targets_scanned,
            skipped = report.targets_skipped,
            scan_failures = report.scan_failures,
            sent = report.notifications_sent,
            failed = report.notifications_failed,
            "Poll cycle finished."
        );
        report
    }

    // Drops links notified in earlier cycles and repeats within this batch.
    fn unseen(&self, target_id: u64, listings: Vec<RawListing>) -> Vec<RawListing> {
        let Some(seen) = &self.seen else {
            return listings;
        };
        let seen = seen.lock().unwrap_or_else(PoisonError::into_inner);
        let notified = seen.get(&target_id);
        let mut batch = HashSet::new();
        listings
            .into_iter()
            .filter(|listing| {
                !notified.is_some_and(|links| links.contains(&listing.link))
                    && batch.insert(listing.link.clone())
            })
            .collect()
    }

    fn mark_seen(&self, target_id: u64, link: &str) {
        if let Some(seen) = &self.seen {
            seen.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(target_id)
                .or_default()
                .insert(link.to_string());
        }
    }

    fn forget_removed(&self, live_ids: &HashSet<u64>) {
        if let Some(seen) = &self.seen {
            seen.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|id, _| live_ids.contains(id));
        }
    }
}
