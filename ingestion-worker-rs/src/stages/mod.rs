//! The four extraction stages run per repository request.
//!
//! Only the bucketer surfaces errors; the other stages degrade to partial or
//! empty results and log what they skipped.

pub mod architecture;
pub mod build_failures;
pub mod defects;
pub mod pr_bucket;

use chrono::{DateTime, Months, Utc};

/// How far back closed requests and failed runs are considered
pub const LOOKBACK_MONTHS: u32 = 3;

pub fn lookback_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_sub_months(Months::new(LOOKBACK_MONTHS)).unwrap_or(now)
}
