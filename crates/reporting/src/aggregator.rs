//! Conversion aggregation — overall, per-day and per-ISO-week group totals,
//! cumulative daily trend, and weekly winner/lift.

use chrono::NaiveDate;
use readout_core::{CleanRecord, GroupName};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// `x / n`, undefined when the sample is empty.
pub fn rate(conversions: u64, sample_size: u64) -> Option<f64> {
    if sample_size == 0 {
        None
    } else {
        Some(conversions as f64 / sample_size as f64)
    }
}

/// Treatment rate minus control rate.
pub fn absolute_lift(control_rate: Option<f64>, treatment_rate: Option<f64>) -> Option<f64> {
    Some(treatment_rate? - control_rate?)
}

/// Absolute lift as a fraction of the control rate.
pub fn relative_lift(control_rate: Option<f64>, treatment_rate: Option<f64>) -> Option<f64> {
    let control = control_rate?;
    if control == 0.0 {
        return None;
    }
    Some((treatment_rate? - control) / control)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupAggregate {
    pub group_name: GroupName,
    pub sample_size: u64,
    pub conversions: u64,
    pub conversion_rate: Option<f64>,
}

impl GroupAggregate {
    pub fn new(group_name: GroupName, sample_size: u64, conversions: u64) -> Self {
        Self {
            group_name,
            sample_size,
            conversions,
            conversion_rate: rate(conversions, sample_size),
        }
    }

    pub fn empty(group_name: GroupName) -> Self {
        Self::new(group_name, 0, 0)
    }
}

/// Control and treatment read out of a set of aggregates by name.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupPair {
    pub control: GroupAggregate,
    pub treatment: GroupAggregate,
}

impl GroupPair {
    /// Missing groups are treated as empty samples.
    pub fn from_aggregates(aggregates: &[GroupAggregate]) -> Self {
        let by_name: HashMap<GroupName, &GroupAggregate> =
            aggregates.iter().map(|a| (a.group_name, a)).collect();
        let pick = |group: GroupName| {
            by_name
                .get(&group)
                .map(|a| **a)
                .unwrap_or_else(|| GroupAggregate::empty(group))
        };
        Self {
            control: pick(GroupName::Control),
            treatment: pick(GroupName::Treatment),
        }
    }

    pub fn absolute_lift(&self) -> Option<f64> {
        absolute_lift(self.control.conversion_rate, self.treatment.conversion_rate)
    }

    pub fn relative_lift(&self) -> Option<f64> {
        relative_lift(self.control.conversion_rate, self.treatment.conversion_rate)
    }
}

/// Overall conversion table with lift.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverallComparison {
    pub control: GroupAggregate,
    pub treatment: GroupAggregate,
    pub absolute_lift: Option<f64>,
    pub relative_lift: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Overall,
    Daily,
    Weekly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BucketKey {
    All,
    Day { date: NaiveDate },
    Week { year: i32, week: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BucketAggregate {
    pub bucket: BucketKey,
    pub aggregate: GroupAggregate,
}

/// One (date, group) row of the daily trend table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTrendRow {
    pub date: NaiveDate,
    pub group_name: GroupName,
    pub users: u64,
    pub conversions: u64,
    pub daily_rate: Option<f64>,
    pub cumulative_users: u64,
    pub cumulative_conversions: u64,
    pub cumulative_rate: Option<f64>,
    /// Change from the most recent earlier day with a defined rate.
    pub rate_delta: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyTrendRow {
    pub year: i32,
    pub week: u32,
    pub control: GroupAggregate,
    pub treatment: GroupAggregate,
    /// Treatment only when its rate strictly exceeds control's; undefined
    /// when either group is empty that week.
    pub winner: Option<GroupName>,
    pub lift: Option<f64>,
}

fn slot(group: GroupName) -> usize {
    match group {
        GroupName::Control => 0,
        GroupName::Treatment => 1,
    }
}

/// Aggregates over the cleaned dataset. Every observed bucket yields a row
/// for both groups, so empty groups show up as zero samples.
pub struct Aggregator<'a> {
    records: &'a [CleanRecord],
}

impl<'a> Aggregator<'a> {
    pub fn new(records: &'a [CleanRecord]) -> Self {
        Self { records }
    }

    /// (users, conversions) per bucket, indexed by group slot.
    fn tally(&self, granularity: Granularity) -> BTreeMap<BucketKey, [(u64, u64); 2]> {
        let mut buckets: BTreeMap<BucketKey, [(u64, u64); 2]> = BTreeMap::new();
        if granularity == Granularity::Overall {
            buckets.insert(BucketKey::All, [(0, 0); 2]);
        }
        for record in self.records {
            let key = match granularity {
                Granularity::Overall => BucketKey::All,
                Granularity::Daily => BucketKey::Day {
                    date: record.date(),
                },
                Granularity::Weekly => {
                    let (year, week) = record.iso_week();
                    BucketKey::Week { year, week }
                }
            };
            let cell = &mut buckets.entry(key).or_insert([(0, 0); 2])[slot(record.group_name)];
            cell.0 += 1;
            if record.converted {
                cell.1 += 1;
            }
        }
        buckets
    }

    pub fn by_bucket(&self, granularity: Granularity) -> Vec<BucketAggregate> {
        self.tally(granularity)
            .into_iter()
            .flat_map(|(bucket, cells)| {
                GroupName::ALL.into_iter().map(move |group| {
                    let (n, x) = cells[slot(group)];
                    BucketAggregate {
                        bucket,
                        aggregate: GroupAggregate::new(group, n, x),
                    }
                })
            })
            .collect()
    }

    /// One aggregate per group, control first.
    pub fn overall(&self) -> Vec<GroupAggregate> {
        self.by_bucket(Granularity::Overall)
            .into_iter()
            .map(|b| b.aggregate)
            .collect()
    }

    pub fn overall_comparison(&self) -> OverallComparison {
        let pair = GroupPair::from_aggregates(&self.overall());
        OverallComparison {
            control: pair.control,
            treatment: pair.treatment,
            absolute_lift: pair.absolute_lift(),
            relative_lift: pair.relative_lift(),
        }
    }

    /// Daily rates with an inclusive running total per group, ordered by
    /// date then group.
    pub fn daily_trend(&self) -> Vec<DailyTrendRow> {
        let mut running = [(0u64, 0u64); 2];
        let mut last_rate: [Option<f64>; 2] = [None, None];
        let mut rows = Vec::new();

        for (bucket, cells) in self.tally(Granularity::Daily) {
            let BucketKey::Day { date } = bucket else {
                continue;
            };
            for group in GroupName::ALL {
                let i = slot(group);
                let (users, conversions) = cells[i];
                running[i].0 += users;
                running[i].1 += conversions;

                let daily_rate = rate(conversions, users);
                let rate_delta = match (daily_rate, last_rate[i]) {
                    (Some(current), Some(prior)) => Some(current - prior),
                    _ => None,
                };
                if daily_rate.is_some() {
                    last_rate[i] = daily_rate;
                }

                debug!(%date, %group, users, conversions, "Daily bucket aggregated");
                rows.push(DailyTrendRow {
                    date,
                    group_name: group,
                    users,
                    conversions,
                    daily_rate,
                    cumulative_users: running[i].0,
                    cumulative_conversions: running[i].1,
                    cumulative_rate: rate(running[i].1, running[i].0),
                    rate_delta,
                });
            }
        }
        rows
    }

    pub fn weekly_trend(&self) -> Vec<WeeklyTrendRow> {
        self.tally(Granularity::Weekly)
            .into_iter()
            .filter_map(|(bucket, cells)| {
                let BucketKey::Week { year, week } = bucket else {
                    return None;
                };
                let control = GroupAggregate::new(GroupName::Control, cells[0].0, cells[0].1);
                let treatment =
                    GroupAggregate::new(GroupName::Treatment, cells[1].0, cells[1].1);

                let winner = match (control.conversion_rate, treatment.conversion_rate) {
                    (Some(c), Some(t)) if t > c => Some(GroupName::Treatment),
                    (Some(_), Some(_)) => Some(GroupName::Control),
                    _ => None,
                };
                if winner.is_none() {
                    debug!(year, week, "Weekly bucket has an empty group, winner undefined");
                }

                Some(WeeklyTrendRow {
                    year,
                    week,
                    control,
                    treatment,
                    winner,
                    lift: absolute_lift(control.conversion_rate, treatment.conversion_rate),
                })
            })
            .collect()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
