//! Canonical analysis dataset — drops mismatched assignments, then keeps the
//! first observed record per user.
//!
//! Equal timestamps for one user are broken by input order: the row that
//! appears first in the raw relation wins. Contaminated users therefore land
//! in the same group on every run over the same input.

use readout_core::{CleanRecord, VisitRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// Counts kept so that the filtering stays inspectable downstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningStats {
    pub input_records: u64,
    pub mismatched_dropped: u64,
    pub duplicates_dropped: u64,
    pub output_records: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanedDataset {
    /// One record per user, ordered by user_id.
    pub records: Vec<CleanRecord>,
    pub stats: CleaningStats,
}

pub struct Cleaner;

impl Cleaner {
    pub fn clean(records: &[VisitRecord]) -> CleanedDataset {
        let mut mismatched = 0u64;
        // user_id -> index of the earliest valid record seen so far
        let mut first_seen: HashMap<u64, usize> = HashMap::new();

        for (idx, record) in records.iter().enumerate() {
            if record.is_mismatched() {
                mismatched += 1;
                continue;
            }
            first_seen
                .entry(record.user_id)
                .and_modify(|kept| {
                    // strict comparison keeps the earlier input row on ties
                    if record.timestamp < records[*kept].timestamp {
                        *kept = idx;
                    }
                })
                .or_insert(idx);
        }

        let valid = records.len() as u64 - mismatched;
        let mut cleaned: Vec<CleanRecord> = first_seen
            .into_values()
            .map(|idx| CleanRecord::from(&records[idx]))
            .collect();
        cleaned.sort_by_key(|r| r.user_id);

        let stats = CleaningStats {
            input_records: records.len() as u64,
            mismatched_dropped: mismatched,
            duplicates_dropped: valid - cleaned.len() as u64,
            output_records: cleaned.len() as u64,
        };

        metrics::counter!("readout.clean.mismatched_dropped").increment(stats.mismatched_dropped);
        metrics::counter!("readout.clean.duplicates_dropped").increment(stats.duplicates_dropped);
        info!(
            input = stats.input_records,
            mismatched_dropped = stats.mismatched_dropped,
            duplicates_dropped = stats.duplicates_dropped,
            output = stats.output_records,
            "Cleaned visit records"
        );

        CleanedDataset {
            records: cleaned,
            stats,
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
