//! End-to-end runs of the analysis pipeline over synthetic visit logs.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use readout_core::{AppConfig, GroupName, LandingPage, VisitRecord};
use readout_reporting::{
    AnalysisPipeline, Cleaner, ImpactAssumptions, ImpactEstimator, Recommendation,
    RecommendationPolicy, Verdict,
};

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2017, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// `n` users in `group`, the first `conversions` of whom converted, spread
/// over `days` consecutive days.
fn cohort(
    group: GroupName,
    first_user: u64,
    n: u64,
    conversions: u64,
    days: i64,
) -> Vec<VisitRecord> {
    (0..n)
        .map(|i| VisitRecord {
            user_id: first_user + i,
            timestamp: start() + Duration::days(i as i64 % days) + Duration::minutes(i as i64),
            group_name: group,
            landing_page: group.canonical_page(),
            converted: i < conversions,
        })
        .collect()
}

fn pipeline() -> AnalysisPipeline {
    AnalysisPipeline::new(&AppConfig::default()).unwrap()
}

#[test]
fn test_ten_vs_twelve_percent_on_1000_users() {
    let mut records = cohort(GroupName::Control, 1, 1000, 100, 21);
    records.extend(cohort(GroupName::Treatment, 10_001, 1000, 120, 21));

    let report = pipeline().run(&records);

    assert_eq!(report.summary.absolute_lift_pct, Some(2.0));
    assert_eq!(report.summary.relative_lift_pct, Some(20.0));
    let sig = report.significance.as_ref().unwrap();
    assert_eq!(sig.p_pool, 0.11);
    assert!((sig.std_error - 0.01399286).abs() < 1e-8);
    assert_eq!(sig.z_score, Some(1.4293));
    assert_eq!(sig.verdict, Verdict::NotSignificant);
    assert!(sig.sample_size_adequate);
    assert_eq!(report.impact.incremental_monthly_conversions, Some(2000));
    assert_eq!(report.summary.recommendation, Some(Recommendation::Ship));

    let window = report.summary.test_window.unwrap();
    assert_eq!(window.start_date, NaiveDate::from_ymd_opt(2017, 1, 2).unwrap());
    assert_eq!(window.duration_days, 21);
}

#[test]
fn test_ten_vs_twelve_percent_on_2000_users_is_significant() {
    let mut records = cohort(GroupName::Control, 1, 2000, 200, 21);
    records.extend(cohort(GroupName::Treatment, 10_001, 2000, 240, 21));

    let report = pipeline().run(&records);
    let sig = report.significance.as_ref().unwrap();

    assert_eq!(sig.p_pool, 0.11);
    assert!((sig.std_error - 0.00989444).abs() < 1e-8);
    assert_eq!(sig.z_score, Some(2.0213));
    assert_eq!(sig.verdict, Verdict::Significant95);
    assert!(sig.sample_size_adequate);
    assert!(report.summary.finding.contains("significant at 95%"));
}

#[test]
fn test_contaminated_user_tie_is_deterministic() {
    let tie = start() + Duration::hours(3);
    let mut records = cohort(GroupName::Control, 1, 50, 5, 7);
    records.extend(cohort(GroupName::Treatment, 1_001, 50, 6, 7));
    records.push(VisitRecord {
        user_id: 777,
        timestamp: tie,
        group_name: GroupName::Control,
        landing_page: LandingPage::OldPage,
        converted: false,
    });
    records.push(VisitRecord {
        user_id: 777,
        timestamp: tie,
        group_name: GroupName::Treatment,
        landing_page: LandingPage::NewPage,
        converted: true,
    });

    let runs: Vec<GroupName> = (0..10)
        .map(|_| {
            let cleaned = Cleaner::clean(&records);
            cleaned
                .records
                .iter()
                .find(|r| r.user_id == 777)
                .map(|r| r.group_name)
                .unwrap()
        })
        .collect();
    assert!(runs.iter().all(|g| *g == GroupName::Control));

    let report = pipeline().run(&records);
    assert_eq!(report.diagnostics.cross_group_users.len(), 1);
    assert_eq!(report.cleaning.duplicates_dropped, 1);
    assert_eq!(report.overall.control.sample_size, 51);
    assert_eq!(report.overall.treatment.sample_size, 50);
}

#[test]
fn test_contaminated_user_earliest_assignment_wins() {
    let mut records = cohort(GroupName::Control, 1, 20, 2, 5);
    records.push(VisitRecord {
        user_id: 555,
        timestamp: start() + Duration::days(3),
        group_name: GroupName::Control,
        landing_page: LandingPage::OldPage,
        converted: true,
    });
    records.push(VisitRecord {
        user_id: 555,
        timestamp: start() + Duration::days(1),
        group_name: GroupName::Treatment,
        landing_page: LandingPage::NewPage,
        converted: false,
    });

    let cleaned = Cleaner::clean(&records);
    let kept = cleaned.records.iter().find(|r| r.user_id == 555).unwrap();
    assert_eq!(kept.group_name, GroupName::Treatment);
    assert_eq!(kept.timestamp, start() + Duration::days(1));
}

#[test]
fn test_week_without_control_traffic() {
    // week 1 has both groups, week 2 treatment only
    let mut records = cohort(GroupName::Control, 1, 30, 3, 5);
    records.extend(cohort(GroupName::Treatment, 1_001, 30, 4, 5));
    records.extend((0..10).map(|i| VisitRecord {
        user_id: 5_000 + i,
        timestamp: start() + Duration::days(8),
        group_name: GroupName::Treatment,
        landing_page: LandingPage::NewPage,
        converted: i % 2 == 0,
    }));

    let report = pipeline().run(&records);

    assert_eq!(report.weekly.len(), 2);
    let week_two = &report.weekly[1];
    assert_eq!(week_two.control.sample_size, 0);
    assert_eq!(week_two.control.conversion_rate, None);
    assert_eq!(week_two.lift, None);
    assert_eq!(week_two.winner, None);
    assert!(report.weekly[0].winner.is_some());

    // the degenerate week does not affect the overall readout
    assert!(report.significance.is_some());
}

#[test]
fn test_daily_volume_is_conserved() {
    let mut records = cohort(GroupName::Control, 1, 300, 31, 9);
    records.extend(cohort(GroupName::Treatment, 1_001, 280, 35, 11));

    let report = pipeline().run(&records);

    for group in GroupName::ALL {
        let rows: Vec<_> = report.daily.iter().filter(|r| r.group_name == group).collect();
        let total: u64 = rows.iter().map(|r| r.users).sum();
        let overall = match group {
            GroupName::Control => &report.overall.control,
            GroupName::Treatment => &report.overall.treatment,
        };
        assert_eq!(total, overall.sample_size);
        assert_eq!(rows.last().unwrap().cumulative_rate, overall.conversion_rate);
    }
}

#[test]
fn test_report_serializes_nulls() {
    let records = cohort(GroupName::Treatment, 1, 40, 4, 3);
    let report = pipeline().run(&records);

    let json = serde_json::to_value(&report).unwrap();
    assert!(json["significance"].is_null());
    assert!(json["summary"]["absolute_lift_pct"].is_null());
    assert!(json["impact"]["recommendation"].is_null());
    assert_eq!(json["summary"]["verdict"], "undetermined");
    assert_eq!(json["overall"]["treatment"]["conversion_rate"], 0.1);
}

#[test]
fn test_reported_annual_revenue_is_twelve_rounded_months() {
    // sub-cent revenue per conversion: 1 extra conversion at 0.125
    let estimator = ImpactEstimator::new(
        ImpactAssumptions::new(10.0, 0.125).unwrap(),
        RecommendationPolicy::default(),
    );
    let mut records = cohort(GroupName::Control, 1, 10, 0, 2);
    records.extend(cohort(GroupName::Treatment, 101, 10, 1, 2));

    let report = AnalysisPipeline::with_estimator(estimator).run(&records);

    let impact = &report.impact;
    assert_eq!(impact.absolute_lift, Some(0.1));
    assert_eq!(impact.incremental_monthly_conversions, Some(1));
    assert_eq!(impact.incremental_monthly_revenue, Some(0.13));
    assert_eq!(impact.incremental_annual_revenue, Some(1.56));
    let monthly = impact.incremental_monthly_revenue.unwrap();
    let annual = impact.incremental_annual_revenue.unwrap();
    assert!((annual - 12.0 * monthly).abs() < 1e-9);
}
