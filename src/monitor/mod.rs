//! Monitor targets and the polling engine that scans the marketplace for them.
pub mod cycle;
pub mod filter;
pub mod locations;
pub mod models;
pub mod query;
pub mod scheduler;
pub mod store;

pub use cycle::{CycleReport, PollCycle};
pub use models::{MonitorTarget, RawListing};
pub use query::{MatchPredicate, QueryBuilder, SearchQuery};
pub use scheduler::{PollScheduler, SchedulerError};
pub use store::{StoreError, TargetStore};
