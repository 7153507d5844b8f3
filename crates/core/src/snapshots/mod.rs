//! Daily metric snapshots — the idempotent unit of sync output.

mod model;
mod traits;

pub use model::{UserDailySnapshot, VideoDailySnapshot};
pub use traits::SnapshotRepositoryTrait;

use chrono::{DateTime, NaiveDate, Utc};

/// The snapshot day for a run is the UTC date of its start instant.
/// Deliberately independent of the process timezone.
pub fn snapshot_date_for(run_started_at: DateTime<Utc>) -> NaiveDate {
    run_started_at.date_naive()
}
