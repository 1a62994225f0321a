//! Report assembly — merges aggregates, significance, trends and impact into
//! the day-level, week-level and executive-summary views.
//!
//! Nothing is recomputed here beyond unit conversion and rounding. Raw
//! proportions are rounded to 6 places, standard error to 8, percentages and
//! Z-scores to 4.

use crate::aggregator::{DailyTrendRow, GroupAggregate, OverallComparison, WeeklyTrendRow};
use crate::cleaner::CleaningStats;
use crate::impact::{ImpactEstimate, Recommendation};
use crate::significance::{ConfidenceInterval, SignificanceResult, Verdict};
use crate::validator::ValidationReport;
use chrono::{DateTime, NaiveDate, Utc};
use readout_core::GroupName;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const PROPORTION_PLACES: i32 = 6;
pub const STD_ERROR_PLACES: i32 = 8;
pub const PERCENT_PLACES: i32 = 4;
pub const MONEY_PLACES: i32 = 2;

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn proportion(value: Option<f64>) -> Option<f64> {
    value.map(|v| round_to(v, PROPORTION_PLACES))
}

fn percent(value: Option<f64>) -> Option<f64> {
    value.map(|v| round_to(v * 100.0, PERCENT_PLACES))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestWindow {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Inclusive of both ends.
    pub duration_days: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub group_name: GroupName,
    pub users: u64,
    pub conversions: u64,
    pub conversion_rate: Option<f64>,
    pub conversion_rate_pct: Option<f64>,
}

impl From<&GroupAggregate> for GroupSummary {
    fn from(aggregate: &GroupAggregate) -> Self {
        Self {
            group_name: aggregate.group_name,
            users: aggregate.sample_size,
            conversions: aggregate.conversions,
            conversion_rate: proportion(aggregate.conversion_rate),
            conversion_rate_pct: percent(aggregate.conversion_rate),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    pub test_window: Option<TestWindow>,
    pub control: GroupSummary,
    pub treatment: GroupSummary,
    pub absolute_lift_pct: Option<f64>,
    pub relative_lift_pct: Option<f64>,
    pub verdict: Verdict,
    pub sample_size_adequate: Option<bool>,
    pub recommendation: Option<Recommendation>,
    pub finding: String,
    pub significance_detail: String,
}

/// Everything a single analysis run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub diagnostics: ValidationReport,
    pub cleaning: CleaningStats,
    pub overall: OverallComparison,
    pub significance: Option<SignificanceResult>,
    pub daily: Vec<DailyTrendRow>,
    pub weekly: Vec<WeeklyTrendRow>,
    pub impact: ImpactEstimate,
    pub summary: ExecutiveSummary,
}

/// Inputs gathered from the earlier stages.
pub struct ReportInputs {
    pub diagnostics: ValidationReport,
    pub cleaning: CleaningStats,
    pub overall: OverallComparison,
    pub significance: Option<SignificanceResult>,
    pub daily: Vec<DailyTrendRow>,
    pub weekly: Vec<WeeklyTrendRow>,
    pub impact: ImpactEstimate,
}

pub struct ReportAssembler;

impl ReportAssembler {
    pub fn assemble(inputs: ReportInputs) -> AnalysisReport {
        let summary = Self::executive_summary(
            &inputs.overall,
            inputs.significance.as_ref(),
            &inputs.daily,
            &inputs.impact,
        );

        AnalysisReport {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            diagnostics: inputs.diagnostics,
            cleaning: inputs.cleaning,
            overall: round_overall(&inputs.overall),
            significance: inputs.significance.as_ref().map(round_significance),
            daily: inputs.daily.iter().map(round_daily).collect(),
            weekly: inputs.weekly.iter().map(round_weekly).collect(),
            impact: round_impact(&inputs.impact),
            summary,
        }
    }

    pub fn executive_summary(
        overall: &OverallComparison,
        significance: Option<&SignificanceResult>,
        daily: &[DailyTrendRow],
        impact: &ImpactEstimate,
    ) -> ExecutiveSummary {
        let test_window = match (daily.first(), daily.last()) {
            (Some(first), Some(last)) => Some(TestWindow {
                start_date: first.date,
                end_date: last.date,
                duration_days: (last.date - first.date).num_days() + 1,
            }),
            _ => None,
        };

        let control = GroupSummary::from(&overall.control);
        let treatment = GroupSummary::from(&overall.treatment);
        let absolute_lift_pct = percent(overall.absolute_lift);
        let relative_lift_pct = percent(overall.relative_lift);
        let verdict = significance
            .map(|s| s.verdict)
            .unwrap_or(Verdict::Undetermined);

        let finding = finding_text(
            &control,
            &treatment,
            absolute_lift_pct,
            relative_lift_pct,
            significance,
            impact.recommendation,
        );
        let significance_detail = match significance {
            Some(s) => format!(
                "see significance: z_score = {}, std_error = {:.8}, p_pool = {:.6} ({})",
                s.z_score
                    .map(|z| format!("{:.4}", z))
                    .unwrap_or_else(|| "undefined".to_string()),
                s.std_error,
                s.p_pool,
                s.verdict
            ),
            None => "see significance: undefined, a group has no users".to_string(),
        };

        ExecutiveSummary {
            test_window,
            control,
            treatment,
            absolute_lift_pct,
            relative_lift_pct,
            verdict,
            sample_size_adequate: significance.map(|s| s.sample_size_adequate),
            recommendation: impact.recommendation,
            finding,
            significance_detail,
        }
    }
}

fn finding_text(
    control: &GroupSummary,
    treatment: &GroupSummary,
    absolute_lift_pct: Option<f64>,
    relative_lift_pct: Option<f64>,
    significance: Option<&SignificanceResult>,
    recommendation: Option<Recommendation>,
) -> String {
    let (Some(c), Some(t), Some(abs), Some(sig)) = (
        control.conversion_rate_pct,
        treatment.conversion_rate_pct,
        absolute_lift_pct,
        significance,
    ) else {
        return "Insufficient data: at least one group has no users, so lift and \
                significance are undefined."
            .to_string();
    };

    let relative = relative_lift_pct
        .map(|r| format!("{:+.2}% relative", r))
        .unwrap_or_else(|| "relative lift undefined".to_string());
    let mut text = format!(
        "Treatment converts at {:.4}% vs {:.4}% for control ({:+.4} pts, {}); \
         the difference is {}.",
        t, c, abs, relative, sig.verdict
    );
    if !sig.sample_size_adequate {
        text.push_str(
            " Sample size is below the normal-approximation rule of thumb, \
             treat the verdict with caution.",
        );
    }
    if let Some(rec) = recommendation {
        text.push_str(&format!(" Recommendation: {}.", rec));
    }
    text
}

fn round_aggregate(aggregate: &GroupAggregate) -> GroupAggregate {
    GroupAggregate {
        conversion_rate: proportion(aggregate.conversion_rate),
        ..*aggregate
    }
}

fn round_overall(overall: &OverallComparison) -> OverallComparison {
    OverallComparison {
        control: round_aggregate(&overall.control),
        treatment: round_aggregate(&overall.treatment),
        absolute_lift: proportion(overall.absolute_lift),
        relative_lift: proportion(overall.relative_lift),
    }
}

fn round_significance(result: &SignificanceResult) -> SignificanceResult {
    SignificanceResult {
        p_control: round_to(result.p_control, PROPORTION_PLACES),
        p_treatment: round_to(result.p_treatment, PROPORTION_PLACES),
        p_pool: round_to(result.p_pool, PROPORTION_PLACES),
        std_error: round_to(result.std_error, STD_ERROR_PLACES),
        z_score: result.z_score.map(|z| round_to(z, PERCENT_PLACES)),
        lift_ci_95: result.lift_ci_95.map(|ci| ConfidenceInterval {
            lower: round_to(ci.lower, PROPORTION_PLACES),
            upper: round_to(ci.upper, PROPORTION_PLACES),
        }),
        ..result.clone()
    }
}

fn round_daily(row: &DailyTrendRow) -> DailyTrendRow {
    DailyTrendRow {
        daily_rate: proportion(row.daily_rate),
        cumulative_rate: proportion(row.cumulative_rate),
        rate_delta: proportion(row.rate_delta),
        ..row.clone()
    }
}

fn round_weekly(row: &WeeklyTrendRow) -> WeeklyTrendRow {
    WeeklyTrendRow {
        control: round_aggregate(&row.control),
        treatment: round_aggregate(&row.treatment),
        lift: proportion(row.lift),
        ..row.clone()
    }
}

/// Annual revenue is derived from the rounded monthly figure so the emitted
/// pair stays exactly twelve to one.
fn round_impact(estimate: &ImpactEstimate) -> ImpactEstimate {
    let monthly = estimate
        .incremental_monthly_revenue
        .map(|r| round_to(r, MONEY_PLACES));
    ImpactEstimate {
        absolute_lift: proportion(estimate.absolute_lift),
        incremental_monthly_revenue: monthly,
        incremental_annual_revenue: monthly.map(|m| round_to(m * 12.0, MONEY_PLACES)),
        ..estimate.clone()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
