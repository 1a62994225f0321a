//! Pre-analysis data-quality diagnostics over the raw visit relation.
//!
//! Every check is read-only and independent of the others. Nothing here
//! drops or rewrites records; the cleaner applies the resolution policy.

use readout_core::{DataQualityWarning, GroupName, LandingPage, VisitRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Visit count and conversion rate for one (group, page) combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupBalanceRow {
    pub group_name: GroupName,
    pub landing_page: LandingPage,
    pub visits: u64,
    pub conversions: u64,
    pub conversion_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MismatchCount {
    pub group_name: GroupName,
    pub landing_page: LandingPage,
    pub count: u64,
}

/// Records served a page that disagrees with their group, with per-type counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MismatchReport {
    pub records: Vec<VisitRecord>,
    pub counts: Vec<MismatchCount>,
}

impl MismatchReport {
    pub fn total(&self) -> u64 {
        self.records.len() as u64
    }
}

/// A user observed under more than one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossGroupUser {
    pub user_id: u64,
    pub distinct_groups: usize,
    /// Distinct groups in the order they first appear in the input.
    pub groups_seen: Vec<GroupName>,
}

impl CrossGroupUser {
    pub fn groups_label(&self) -> String {
        self.groups_seen
            .iter()
            .map(|g| g.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateRow {
    pub user_id: u64,
    pub group_name: GroupName,
    pub count: u64,
}

/// The four diagnostic result sets bundled together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub total_records: u64,
    pub group_balance: Vec<GroupBalanceRow>,
    pub mismatched: MismatchReport,
    pub cross_group_users: Vec<CrossGroupUser>,
    pub duplicates: Vec<DuplicateRow>,
}

impl ValidationReport {
    pub fn warnings(&self) -> Vec<DataQualityWarning> {
        let mut warnings = Vec::new();
        if self.mismatched.total() > 0 {
            warnings.push(DataQualityWarning::MismatchedAssignment {
                records: self.mismatched.total(),
            });
        }
        if !self.cross_group_users.is_empty() {
            warnings.push(DataQualityWarning::CrossGroupContamination {
                users: self.cross_group_users.len() as u64,
            });
        }
        if !self.duplicates.is_empty() {
            warnings.push(DataQualityWarning::DuplicateRecords {
                user_groups: self.duplicates.len() as u64,
                extra_records: self.duplicates.iter().map(|d| d.count - 1).sum(),
            });
        }
        warnings
    }
}

/// Read-only diagnostics over a raw record set.
pub struct Validator<'a> {
    records: &'a [VisitRecord],
}

impl<'a> Validator<'a> {
    pub fn new(records: &'a [VisitRecord]) -> Self {
        Self { records }
    }

    pub fn run(&self) -> ValidationReport {
        ValidationReport {
            total_records: self.records.len() as u64,
            group_balance: self.group_balance(),
            mismatched: self.mismatched_assignments(),
            cross_group_users: self.cross_group_users(),
            duplicates: self.duplicate_within_group(),
        }
    }

    /// Count and conversion rate per observed (group, page) pair.
    pub fn group_balance(&self) -> Vec<GroupBalanceRow> {
        let mut cells: BTreeMap<(GroupName, LandingPage), (u64, u64)> = BTreeMap::new();
        for record in self.records {
            let cell = cells
                .entry((record.group_name, record.landing_page))
                .or_insert((0, 0));
            cell.0 += 1;
            if record.converted {
                cell.1 += 1;
            }
        }

        cells
            .into_iter()
            .map(|((group_name, landing_page), (visits, conversions))| GroupBalanceRow {
                group_name,
                landing_page,
                visits,
                conversions,
                conversion_rate: crate::aggregator::rate(conversions, visits),
            })
            .collect()
    }

    pub fn mismatched_assignments(&self) -> MismatchReport {
        let records: Vec<VisitRecord> = self
            .records
            .iter()
            .filter(|r| r.is_mismatched())
            .cloned()
            .collect();

        let mut counts: BTreeMap<(GroupName, LandingPage), u64> = BTreeMap::new();
        for record in &records {
            *counts
                .entry((record.group_name, record.landing_page))
                .or_insert(0) += 1;
        }

        MismatchReport {
            records,
            counts: counts
                .into_iter()
                .map(|((group_name, landing_page), count)| MismatchCount {
                    group_name,
                    landing_page,
                    count,
                })
                .collect(),
        }
    }

    /// Users whose raw records span more than one group, ordered by user_id.
    /// Reported only; the cleaner decides which assignment survives.
    pub fn cross_group_users(&self) -> Vec<CrossGroupUser> {
        let mut seen: BTreeMap<u64, Vec<GroupName>> = BTreeMap::new();
        for record in self.records {
            let groups = seen.entry(record.user_id).or_default();
            if !groups.contains(&record.group_name) {
                groups.push(record.group_name);
            }
        }

        seen.into_iter()
            .filter(|(_, groups)| groups.len() > 1)
            .map(|(user_id, groups_seen)| CrossGroupUser {
                user_id,
                distinct_groups: groups_seen.len(),
                groups_seen,
            })
            .collect()
    }

    /// (user, group) pairs with more than one record, most repeated first.
    pub fn duplicate_within_group(&self) -> Vec<DuplicateRow> {
        let mut counts: HashMap<(u64, GroupName), u64> = HashMap::new();
        for record in self.records {
            *counts.entry((record.user_id, record.group_name)).or_insert(0) += 1;
        }

        let mut rows: Vec<DuplicateRow> = counts
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|((user_id, group_name), count)| DuplicateRow {
                user_id,
                group_name,
                count,
            })
            .collect();
        rows.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then(a.user_id.cmp(&b.user_id))
                .then(a.group_name.cmp(&b.group_name))
        });
        rows
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
