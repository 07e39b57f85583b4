//! Staleness policy - pure decision logic, no I/O
//!
//! Decides whether a cache entry is usable as-is, usable only as a stale
//! fallback, or missing entirely. Ages are measured in whole seconds and an
//! entry expires only when its age strictly exceeds the threshold. A
//! threshold of zero marks every existing entry stale, and no threshold at
//! all means entries never expire.

use chrono::{DateTime, Utc};

/// Outcome of evaluating an entry against a staleness threshold
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Staleness {
    /// Entry exists and is within its threshold; serve it directly
    Fresh,
    /// Entry exists but has exceeded its threshold; regenerate, keeping the
    /// old value available as a fallback
    Stale,
    /// No entry has ever been written for this key
    Absent,
}

impl Staleness {
    /// Whether regeneration is required (`Stale` or `Absent`)
    pub fn needs_regeneration(&self) -> bool {
        !matches!(self, Staleness::Fresh)
    }
}

/// Evaluate an entry's staleness at `now`
///
/// `last_modified` is `None` when no entry exists; `stale_after_seconds` is
/// `None` when entries should never expire.
pub fn evaluate(
    last_modified: Option<DateTime<Utc>>,
    stale_after_seconds: Option<u64>,
    now: DateTime<Utc>,
) -> Staleness {
    let Some(last_modified) = last_modified else {
        return Staleness::Absent;
    };

    match stale_after_seconds {
        None => Staleness::Fresh,
        Some(0) => Staleness::Stale,
        Some(threshold) => {
            let age_seconds = (now - last_modified).num_seconds();
            if age_seconds > threshold as i64 {
                Staleness::Stale
            } else {
                Staleness::Fresh
            }
        }
    }
}
