//! Property-based checks for the cleaning, aggregation, significance and
//! impact invariants.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use proptest::prelude::*;
use readout_core::{GroupName, LandingPage, VisitRecord};
use readout_reporting::aggregator::{Aggregator, GroupAggregate};
use readout_reporting::impact::{
    ImpactAssumptions, ImpactEstimator, Recommendation, RecommendationPolicy,
};
use readout_reporting::significance::{SignificanceEngine, Verdict};
use readout_reporting::Cleaner;
use std::collections::{HashMap, HashSet};

fn base() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2017, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn arb_visit() -> impl Strategy<Value = VisitRecord> {
    (0u64..40, 0i64..(30 * 24 * 60), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(user_id, minutes, treatment, new_page, converted)| VisitRecord {
            user_id,
            timestamp: base() + Duration::minutes(minutes),
            group_name: if treatment {
                GroupName::Treatment
            } else {
                GroupName::Control
            },
            landing_page: if new_page {
                LandingPage::NewPage
            } else {
                LandingPage::OldPage
            },
            converted,
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_cleaner_output_is_unique_and_earliest(
        records in prop::collection::vec(arb_visit(), 0..200),
    ) {
        let cleaned = Cleaner::clean(&records);

        let mut ids = HashSet::new();
        for record in &cleaned.records {
            prop_assert!(ids.insert(record.user_id));
        }

        let mut earliest: HashMap<u64, NaiveDateTime> = HashMap::new();
        for record in records.iter().filter(|r| !r.is_mismatched()) {
            earliest
                .entry(record.user_id)
                .and_modify(|t| *t = (*t).min(record.timestamp))
                .or_insert(record.timestamp);
        }
        prop_assert_eq!(cleaned.records.len(), earliest.len());
        for record in &cleaned.records {
            prop_assert_eq!(Some(&record.timestamp), earliest.get(&record.user_id));
        }

        // every surviving record came from a consistent (group, page) pair
        for record in &cleaned.records {
            prop_assert!(records.iter().any(|r| r.user_id == record.user_id
                && r.timestamp == record.timestamp
                && r.group_name == record.group_name
                && !r.is_mismatched()));
        }
    }

    #[test]
    fn prop_cleaner_is_deterministic(
        records in prop::collection::vec(arb_visit(), 0..120),
    ) {
        prop_assert_eq!(Cleaner::clean(&records), Cleaner::clean(&records));
    }

    #[test]
    fn prop_daily_volume_matches_overall(
        records in prop::collection::vec(arb_visit(), 1..200),
    ) {
        let cleaned = Cleaner::clean(&records);
        let aggregator = Aggregator::new(&cleaned.records);
        let overall = aggregator.overall();
        let daily = aggregator.daily_trend();

        for aggregate in &overall {
            let rows: Vec<_> = daily
                .iter()
                .filter(|r| r.group_name == aggregate.group_name)
                .collect();
            let users: u64 = rows.iter().map(|r| r.users).sum();
            prop_assert_eq!(users, aggregate.sample_size);
            if let Some(last) = rows.last() {
                prop_assert_eq!(last.cumulative_rate, aggregate.conversion_rate);
            }
        }
    }

    #[test]
    fn prop_z_score_antisymmetric(
        n_c in 1u64..5000, n_t in 1u64..5000,
        fc in 0.0f64..=1.0, ft in 0.0f64..=1.0,
    ) {
        let x_c = (n_c as f64 * fc).floor() as u64;
        let x_t = (n_t as f64 * ft).floor() as u64;
        let control = GroupAggregate::new(GroupName::Control, n_c, x_c);
        let treatment = GroupAggregate::new(GroupName::Treatment, n_t, x_t);
        let swapped_control = GroupAggregate::new(GroupName::Control, n_t, x_t);
        let swapped_treatment = GroupAggregate::new(GroupName::Treatment, n_c, x_c);

        let forward = SignificanceEngine::test(&control, &treatment).unwrap();
        let backward = SignificanceEngine::test(&swapped_control, &swapped_treatment).unwrap();
        match (forward.z_score, backward.z_score) {
            (Some(a), Some(b)) => prop_assert!((a + b).abs() < 1e-9),
            (None, None) => {}
            other => prop_assert!(false, "z defined on one side only: {:?}", other),
        }
        prop_assert_eq!(forward.verdict, backward.verdict);
    }

    #[test]
    fn prop_equal_rates_not_significant(n in 1u64..5000, f in 0.0f64..=1.0) {
        let x = (n as f64 * f).floor() as u64;
        let control = GroupAggregate::new(GroupName::Control, n, x);
        let treatment = GroupAggregate::new(GroupName::Treatment, n, x);
        let result = SignificanceEngine::test(&control, &treatment).unwrap();
        if let Some(z) = result.z_score {
            prop_assert_eq!(z, 0.0);
            prop_assert_eq!(result.verdict, Verdict::NotSignificant);
        } else {
            prop_assert_eq!(result.verdict, Verdict::Undetermined);
        }
    }

    #[test]
    fn prop_verdict_monotonic(a in 0.0f64..5.0, b in 0.0f64..5.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(Verdict::from_z(Some(lo)) <= Verdict::from_z(Some(hi)));
        prop_assert_eq!(Verdict::from_z(Some(-hi)), Verdict::from_z(Some(hi)));
    }

    #[test]
    fn prop_annual_is_twelve_months(
        p_c in 0.0f64..=1.0, p_t in 0.0f64..=1.0,
        visitors in 0.0f64..1e7, revenue in 0.0f64..1e4,
    ) {
        let estimator = ImpactEstimator::new(
            ImpactAssumptions::new(visitors, revenue).unwrap(),
            RecommendationPolicy::default(),
        );
        let estimate = estimator.estimate(Some(p_c), Some(p_t));
        let monthly = estimate.incremental_monthly_revenue.unwrap();
        prop_assert_eq!(estimate.incremental_annual_revenue.unwrap(), monthly * 12.0);

        let lift = p_t - p_c;
        let expected = if lift > 0.005 {
            Recommendation::Ship
        } else if lift > 0.001 {
            Recommendation::Borderline
        } else if lift > 0.0 {
            Recommendation::LiftTooSmall
        } else {
            Recommendation::Underperforms
        };
        prop_assert_eq!(estimate.recommendation, Some(expected));
    }
}
