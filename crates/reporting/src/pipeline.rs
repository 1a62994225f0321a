//! End-to-end analysis run: validate, clean, aggregate, test, estimate, assemble.

use crate::aggregator::Aggregator;
use crate::cleaner::Cleaner;
use crate::impact::{ImpactAssumptions, ImpactEstimator, RecommendationPolicy};
use crate::significance::SignificanceEngine;
use crate::summary::{AnalysisReport, ReportAssembler, ReportInputs};
use crate::validator::Validator;
use readout_core::{AppConfig, ReadoutResult, VisitRecord};
use tracing::{info, warn};

pub struct AnalysisPipeline {
    estimator: ImpactEstimator,
}

impl AnalysisPipeline {
    /// Validates impact assumptions and policy thresholds up front.
    pub fn new(config: &AppConfig) -> ReadoutResult<Self> {
        let assumptions = ImpactAssumptions::try_from(&config.impact)?;
        let policy = RecommendationPolicy::try_from(&config.policy)?;
        Ok(Self::with_estimator(ImpactEstimator::new(assumptions, policy)))
    }

    pub fn with_estimator(estimator: ImpactEstimator) -> Self {
        Self { estimator }
    }

    pub fn run(&self, records: &[VisitRecord]) -> AnalysisReport {
        let diagnostics = Validator::new(records).run();
        for warning in diagnostics.warnings() {
            warn!(%warning, "Data quality warning");
        }

        let cleaned = Cleaner::clean(records);
        let aggregator = Aggregator::new(&cleaned.records);
        let overall = aggregator.overall_comparison();
        let daily = aggregator.daily_trend();
        let weekly = aggregator.weekly_trend();

        let significance = SignificanceEngine::test(&overall.control, &overall.treatment);
        let impact = self.estimator.estimate(
            overall.control.conversion_rate,
            overall.treatment.conversion_rate,
        );

        let report = ReportAssembler::assemble(ReportInputs {
            diagnostics,
            cleaning: cleaned.stats,
            overall,
            significance,
            daily,
            weekly,
            impact,
        });

        info!(
            run_id = %report.run_id,
            control_users = report.overall.control.sample_size,
            treatment_users = report.overall.treatment.sample_size,
            verdict = %report.summary.verdict,
            recommendation = ?report.summary.recommendation,
            "Analysis complete"
        );
        report
    }
}
