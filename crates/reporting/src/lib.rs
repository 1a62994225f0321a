//! A/B test readout — data-quality diagnostics, deduplication, conversion
//! aggregation, two-proportion significance, business impact, and report
//! assembly over a static set of visit records.

pub mod aggregator;
pub mod cleaner;
pub mod impact;
pub mod pipeline;
pub mod significance;
pub mod summary;
pub mod validator;

pub use aggregator::{Aggregator, GroupAggregate, Granularity};
pub use cleaner::{CleanedDataset, Cleaner, CleaningStats};
pub use impact::{
    ImpactAssumptions, ImpactEstimate, ImpactEstimator, Recommendation, RecommendationPolicy,
};
pub use pipeline::AnalysisPipeline;
pub use significance::{SignificanceEngine, SignificanceResult, Verdict};
pub use summary::{AnalysisReport, ExecutiveSummary, ReportAssembler};
pub use validator::{ValidationReport, Validator};
