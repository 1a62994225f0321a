//! Business impact — projects absolute lift onto assumed traffic and revenue,
//! then applies the ship policy.

use readout_core::config::{ImpactConfig, PolicyConfig};
use readout_core::{ReadoutError, ReadoutResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound on assumed monthly traffic. Lift is within [-1, 1], so the
/// projected conversion count always fits an `i64`.
pub const MAX_MONTHLY_VISITORS: f64 = 1e12;

/// Validated traffic and revenue assumptions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactAssumptions {
    pub monthly_visitors: f64,
    pub revenue_per_conversion: f64,
}

impl ImpactAssumptions {
    pub fn new(monthly_visitors: f64, revenue_per_conversion: f64) -> ReadoutResult<Self> {
        non_negative("monthly_visitors", monthly_visitors)?;
        non_negative("revenue_per_conversion", revenue_per_conversion)?;
        if monthly_visitors > MAX_MONTHLY_VISITORS {
            return Err(ReadoutError::Configuration(format!(
                "monthly_visitors must not exceed {}, got {}",
                MAX_MONTHLY_VISITORS, monthly_visitors
            )));
        }
        Ok(Self {
            monthly_visitors,
            revenue_per_conversion,
        })
    }
}

impl TryFrom<&ImpactConfig> for ImpactAssumptions {
    type Error = ReadoutError;

    fn try_from(config: &ImpactConfig) -> ReadoutResult<Self> {
        Self::new(config.monthly_visitors, config.revenue_per_conversion)
    }
}

/// Absolute-lift bands for the recommendation. Lift above `ship_threshold`
/// ships, above `borderline_threshold` is borderline, any other positive lift
/// is too small.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecommendationPolicy {
    pub ship_threshold: f64,
    pub borderline_threshold: f64,
}

impl RecommendationPolicy {
    pub fn new(ship_threshold: f64, borderline_threshold: f64) -> ReadoutResult<Self> {
        non_negative("borderline_lift_threshold", borderline_threshold)?;
        non_negative("ship_lift_threshold", ship_threshold)?;
        if ship_threshold <= borderline_threshold {
            return Err(ReadoutError::Configuration(format!(
                "ship_lift_threshold ({}) must exceed borderline_lift_threshold ({})",
                ship_threshold, borderline_threshold
            )));
        }
        Ok(Self {
            ship_threshold,
            borderline_threshold,
        })
    }

    pub fn recommend(&self, lift: f64) -> Recommendation {
        if lift > self.ship_threshold {
            Recommendation::Ship
        } else if lift > self.borderline_threshold {
            Recommendation::Borderline
        } else if lift > 0.0 {
            Recommendation::LiftTooSmall
        } else {
            Recommendation::Underperforms
        }
    }
}

impl Default for RecommendationPolicy {
    fn default() -> Self {
        Self {
            ship_threshold: 0.005,
            borderline_threshold: 0.001,
        }
    }
}

impl TryFrom<&PolicyConfig> for RecommendationPolicy {
    type Error = ReadoutError;

    fn try_from(config: &PolicyConfig) -> ReadoutResult<Self> {
        Self::new(config.ship_lift_threshold, config.borderline_lift_threshold)
    }
}

fn non_negative(field: &str, value: f64) -> ReadoutResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(ReadoutError::Configuration(format!(
            "{} must be a finite non-negative number, got {}",
            field, value
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Ship,
    Borderline,
    LiftTooSmall,
    Underperforms,
}

impl Recommendation {
    pub fn label(self) -> &'static str {
        match self {
            Recommendation::Ship => "ship, meaningful lift",
            Recommendation::Borderline => "borderline, weigh cost/benefit",
            Recommendation::LiftTooSmall => "do not ship, lift too small",
            Recommendation::Underperforms => "do not ship, underperforms",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactEstimate {
    pub assumed_monthly_visitors: f64,
    pub assumed_revenue_per_conversion: f64,
    pub absolute_lift: Option<f64>,
    pub incremental_monthly_conversions: Option<i64>,
    pub incremental_monthly_revenue: Option<f64>,
    pub incremental_annual_revenue: Option<f64>,
    pub recommendation: Option<Recommendation>,
}

pub struct ImpactEstimator {
    assumptions: ImpactAssumptions,
    policy: RecommendationPolicy,
}

impl ImpactEstimator {
    pub fn new(assumptions: ImpactAssumptions, policy: RecommendationPolicy) -> Self {
        Self {
            assumptions,
            policy,
        }
    }

    pub fn assumptions(&self) -> &ImpactAssumptions {
        &self.assumptions
    }

    pub fn policy(&self) -> &RecommendationPolicy {
        &self.policy
    }

    /// Undefined rates propagate to every derived figure.
    pub fn estimate(
        &self,
        control_rate: Option<f64>,
        treatment_rate: Option<f64>,
    ) -> ImpactEstimate {
        let lift = crate::aggregator::absolute_lift(control_rate, treatment_rate);
        let monthly_conversions =
            lift.map(|l| (l * self.assumptions.monthly_visitors).round() as i64);
        let monthly_revenue =
            monthly_conversions.map(|c| c as f64 * self.assumptions.revenue_per_conversion);

        ImpactEstimate {
            assumed_monthly_visitors: self.assumptions.monthly_visitors,
            assumed_revenue_per_conversion: self.assumptions.revenue_per_conversion,
            absolute_lift: lift,
            incremental_monthly_conversions: monthly_conversions,
            incremental_monthly_revenue: monthly_revenue,
            incremental_annual_revenue: monthly_revenue.map(|m| m * 12.0),
            recommendation: lift.map(|l| self.policy.recommend(l)),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
