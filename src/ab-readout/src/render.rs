//! Plain-text rendering of an analysis report.

use readout_reporting::summary::round_to;
use readout_reporting::AnalysisReport;
use std::fmt::Write;

fn opt(value: Option<f64>, places: usize) -> String {
    value
        .map(|v| format!("{:.*}", places, v))
        .unwrap_or_else(|| "n/a".to_string())
}

fn pct(value: Option<f64>) -> String {
    opt(value.map(|v| round_to(v * 100.0, 4)), 4)
}

pub fn text(report: &AnalysisReport) -> String {
    let mut out = String::new();
    let summary = &report.summary;

    let _ = writeln!(out, "A/B TEST READOUT  (run {})", report.run_id);
    let _ = writeln!(out, "generated {}", report.generated_at.to_rfc3339());
    let _ = writeln!(out);

    let _ = writeln!(out, "DATA QUALITY");
    let _ = writeln!(
        out,
        "  records {}  mismatched dropped {}  duplicates dropped {}  analysed users {}",
        report.cleaning.input_records,
        report.cleaning.mismatched_dropped,
        report.cleaning.duplicates_dropped,
        report.cleaning.output_records
    );
    for warning in report.diagnostics.warnings() {
        let _ = writeln!(out, "  warning: {}", warning);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "EXECUTIVE SUMMARY");
    if let Some(window) = &summary.test_window {
        let _ = writeln!(
            out,
            "  window {} .. {} ({} days)",
            window.start_date, window.end_date, window.duration_days
        );
    }
    for group in [&summary.control, &summary.treatment] {
        let _ = writeln!(
            out,
            "  {:<10} users {:>8}  conversions {:>7}  rate {}%",
            group.group_name.as_str(),
            group.users,
            group.conversions,
            opt(group.conversion_rate_pct, 4)
        );
    }
    let _ = writeln!(
        out,
        "  lift {} pts absolute, {}% relative",
        opt(summary.absolute_lift_pct, 4),
        opt(summary.relative_lift_pct, 2)
    );
    let _ = writeln!(out, "  {}", summary.finding);
    let _ = writeln!(out, "  {}", summary.significance_detail);
    let _ = writeln!(out);

    let _ = writeln!(out, "SIGNIFICANCE");
    match &report.significance {
        Some(sig) => {
            let _ = writeln!(out, "  pooled p     {:.6}", sig.p_pool);
            let _ = writeln!(out, "  std error    {:.8}", sig.std_error);
            let _ = writeln!(out, "  z score      {}", opt(sig.z_score, 4));
            let _ = writeln!(out, "  verdict      {}", sig.verdict);
            let _ = writeln!(out, "  sample ok    {}", sig.sample_size_adequate);
            if let Some(ci) = &sig.lift_ci_95 {
                let _ = writeln!(out, "  95% CI lift  [{:.6}, {:.6}]", ci.lower, ci.upper);
            }
            if let Some(warning) = &sig.warning {
                let _ = writeln!(out, "  warning: {}", warning);
            }
            let _ = writeln!(out, "  method: {}", sig.method);
        }
        None => {
            let _ = writeln!(out, "  undefined: a group has no users");
        }
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "IMPACT");
    let impact = &report.impact;
    let _ = writeln!(
        out,
        "  assuming {} monthly visitors at {:.2} per conversion",
        impact.assumed_monthly_visitors, impact.assumed_revenue_per_conversion
    );
    let _ = writeln!(
        out,
        "  incremental conversions/month {}",
        impact
            .incremental_monthly_conversions
            .map(|c| c.to_string())
            .unwrap_or_else(|| "n/a".to_string())
    );
    let _ = writeln!(
        out,
        "  incremental revenue/month {}  /year {}",
        opt(impact.incremental_monthly_revenue, 2),
        opt(impact.incremental_annual_revenue, 2)
    );
    let _ = writeln!(
        out,
        "  recommendation: {}",
        impact
            .recommendation
            .map(|r| r.label())
            .unwrap_or("undetermined")
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "DAILY TREND");
    let _ = writeln!(
        out,
        "  {:<10} {:<10} {:>7} {:>6} {:>10} {:>10} {:>10}",
        "date", "group", "users", "conv", "rate%", "cum rate%", "delta%"
    );
    for row in &report.daily {
        let _ = writeln!(
            out,
            "  {:<10} {:<10} {:>7} {:>6} {:>10} {:>10} {:>10}",
            row.date.to_string(),
            row.group_name.as_str(),
            row.users,
            row.conversions,
            pct(row.daily_rate),
            pct(row.cumulative_rate),
            pct(row.rate_delta)
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "WEEKLY TREND");
    let _ = writeln!(
        out,
        "  {:<8} {:>10} {:>10} {:>10} {:<10}",
        "week", "control%", "treat%", "lift%", "winner"
    );
    for row in &report.weekly {
        let _ = writeln!(
            out,
            "  {:<8} {:>10} {:>10} {:>10} {:<10}",
            format!("{}-W{:02}", row.year, row.week),
            pct(row.control.conversion_rate),
            pct(row.treatment.conversion_rate),
            pct(row.lift),
            row.winner.map(|w| w.as_str()).unwrap_or("undefined")
        );
    }

    out
}
