//! Two-proportion Z-test between control and treatment.
//!
//! Normal approximation with fixed critical values. It is not an exact
//! binomial test and reports no p-value; the result carries a `method` note
//! saying so, and the sample-size rule of thumb is surfaced as its own flag.

use crate::aggregator::GroupAggregate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

pub const Z_CRITICAL_90: f64 = 1.645;
pub const Z_CRITICAL_95: f64 = 1.960;
pub const Z_CRITICAL_99: f64 = 2.576;

/// Minimum conversions and non-conversions per group for the normal
/// approximation to hold.
pub const MIN_EXPECTED_COUNT: u64 = 5;

pub const METHOD_NOTE: &str =
    "normal-approximation two-proportion z-test with fixed critical values; \
     not an exact binomial test";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Z-score undefined (zero standard error).
    Undetermined,
    NotSignificant,
    Significant90,
    Significant95,
    Significant99,
}

impl Verdict {
    /// Classify `|z|`; a value exactly on a threshold takes the higher bucket.
    pub fn from_z(z_score: Option<f64>) -> Self {
        match z_score.map(f64::abs) {
            None => Verdict::Undetermined,
            Some(z) if z.is_nan() => Verdict::Undetermined,
            Some(z) if z >= Z_CRITICAL_99 => Verdict::Significant99,
            Some(z) if z >= Z_CRITICAL_95 => Verdict::Significant95,
            Some(z) if z >= Z_CRITICAL_90 => Verdict::Significant90,
            Some(_) => Verdict::NotSignificant,
        }
    }

    pub fn is_significant(self) -> bool {
        matches!(
            self,
            Verdict::Significant90 | Verdict::Significant95 | Verdict::Significant99
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            Verdict::Undetermined => "undetermined",
            Verdict::NotSignificant => "not significant",
            Verdict::Significant90 => "significant at 90%",
            Verdict::Significant95 => "significant at 95%",
            Verdict::Significant99 => "significant at 99%",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignificanceResult {
    pub p_control: f64,
    pub p_treatment: f64,
    pub p_pool: f64,
    pub std_error: f64,
    pub z_score: Option<f64>,
    pub verdict: Verdict,
    pub sample_size_adequate: bool,
    /// Unpooled 95% interval for treatment minus control.
    pub lift_ci_95: Option<ConfidenceInterval>,
    pub method: String,
    pub warning: Option<String>,
}

pub struct SignificanceEngine;

impl SignificanceEngine {
    /// Undefined (`None`) when either group has no samples.
    pub fn test(
        control: &GroupAggregate,
        treatment: &GroupAggregate,
    ) -> Option<SignificanceResult> {
        let (n_c, x_c) = (control.sample_size, control.conversions);
        let (n_t, x_t) = (treatment.sample_size, treatment.conversions);
        if n_c == 0 || n_t == 0 {
            warn!(
                control_n = n_c,
                treatment_n = n_t,
                "Significance undefined: a group has no samples"
            );
            return None;
        }

        // n·p and n·(1−p) are the observed counts, compared as integers
        let sample_size_adequate = [x_c, n_c.saturating_sub(x_c), x_t, n_t.saturating_sub(x_t)]
            .iter()
            .all(|count| *count >= MIN_EXPECTED_COUNT);

        let (n_c, n_t) = (n_c as f64, n_t as f64);
        let p_c = x_c as f64 / n_c;
        let p_t = x_t as f64 / n_t;

        let p_pool = (x_c + x_t) as f64 / (n_c + n_t);
        let std_error = (p_pool * (1.0 - p_pool) * (1.0 / n_c + 1.0 / n_t)).sqrt();
        let z_score = if std_error > 0.0 {
            Some((p_t - p_c) / std_error)
        } else {
            None
        };
        let verdict = Verdict::from_z(z_score);

        let unpooled_se = (p_t * (1.0 - p_t) / n_t + p_c * (1.0 - p_c) / n_c).sqrt();
        let lift_ci_95 = (unpooled_se > 0.0).then(|| {
            let diff = p_t - p_c;
            ConfidenceInterval {
                lower: diff - Z_CRITICAL_95 * unpooled_se,
                upper: diff + Z_CRITICAL_95 * unpooled_se,
            }
        });

        let warning = if verdict.is_significant() && !sample_size_adequate {
            warn!(
                z_score = ?z_score,
                %verdict,
                "Significant-looking result with inadequate sample size"
            );
            Some(format!(
                "{} but fewer than {} expected conversions or non-conversions in a group; \
                 the normal approximation may not hold",
                verdict, MIN_EXPECTED_COUNT
            ))
        } else {
            None
        };

        Some(SignificanceResult {
            p_control: p_c,
            p_treatment: p_t,
            p_pool,
            std_error,
            z_score,
            verdict,
            sample_size_adequate,
            lift_ci_95,
            method: METHOD_NOTE.to_string(),
            warning,
        })
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
