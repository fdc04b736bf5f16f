//! Scoring weight table and signal thresholds
//!
//! Loaded from the `[scoring]` config section. The weights are business
//! policy and change independently of the ranking formula.

use crate::config::defaults::*;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Relative weight of each scoring component
///
/// Weights need not sum to 1; the composite is normalized by their sum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightTable {
    /// Closeness of the size attributes to the target range midpoint
    pub size_fit: f64,
    /// Corridor traffic volume
    pub traffic: f64,
    /// Absence of nearby competitors
    pub competition: f64,
    /// Share of known attributes present
    pub completeness: f64,
    /// Bonus for off-market opportunities
    pub opportunity: f64,
}

impl Default for WeightTable {
    fn default() -> Self {
        Self {
            size_fit: DEFAULT_WEIGHT_SIZE_FIT,
            traffic: DEFAULT_WEIGHT_TRAFFIC,
            competition: DEFAULT_WEIGHT_COMPETITION,
            completeness: DEFAULT_WEIGHT_COMPLETENESS,
            opportunity: DEFAULT_WEIGHT_OPPORTUNITY,
        }
    }
}

impl WeightTable {
    pub fn total(&self) -> f64 {
        self.size_fit + self.traffic + self.competition + self.completeness + self.opportunity
    }

    /// Reject negative or non-finite weights
    pub fn validate(&self) -> Result<()> {
        let weights = [
            ("size_fit", self.size_fit),
            ("traffic", self.traffic),
            ("competition", self.competition),
            ("completeness", self.completeness),
            ("opportunity", self.opportunity),
        ];
        for (name, weight) in weights {
            if !weight.is_finite() || weight < 0.0 {
                return Err(Error::Config(format!(
                    "Scoring weight {} must be a non-negative number, got {}",
                    name, weight
                )));
            }
        }
        Ok(())
    }
}

/// Normalization references and labeling thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalThresholds {
    /// Traffic volume that scores 1.0
    pub reference_aadt: f64,
    /// Traffic volume labeled a high-traffic corridor
    pub high_traffic_aadt: f64,
    /// Competitor count at which the competition component reaches 0
    pub competitor_saturation: f64,
    /// Size-fit score labeled a strong fit
    pub strong_size_fit: f64,
    /// Value used for a component whose inputs are missing
    pub neutral: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            reference_aadt: DEFAULT_REFERENCE_AADT,
            high_traffic_aadt: DEFAULT_HIGH_TRAFFIC_AADT,
            competitor_saturation: DEFAULT_COMPETITOR_SATURATION,
            strong_size_fit: DEFAULT_STRONG_SIZE_FIT,
            neutral: DEFAULT_NEUTRAL_SIGNAL,
        }
    }
}

/// Everything the scorer needs besides the candidate itself
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    #[serde(default)]
    pub weights: WeightTable,
    #[serde(default)]
    pub thresholds: SignalThresholds,
}

impl ScoringPolicy {
    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;
        self.thresholds.validate()
    }
}

impl SignalThresholds {
    /// Keep every score component inside [0, 1]
    pub fn validate(&self) -> Result<()> {
        let references = [
            ("reference_aadt", self.reference_aadt),
            ("competitor_saturation", self.competitor_saturation),
        ];
        for (name, value) in references {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::Config(format!(
                    "Threshold {} must be a positive number, got {}",
                    name, value
                )));
            }
        }

        if !(self.high_traffic_aadt.is_finite() && self.high_traffic_aadt >= 0.0) {
            return Err(Error::Config(format!(
                "Threshold high_traffic_aadt must be a non-negative number, got {}",
                self.high_traffic_aadt
            )));
        }

        let fractions = [
            ("strong_size_fit", self.strong_size_fit),
            ("neutral", self.neutral),
        ];
        for (name, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "Threshold {} must be between 0 and 1, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_weights_sum_to_one() {
        assert_relative_eq!(WeightTable::default().total(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_validate() {
        assert!(ScoringPolicy::default().validate().is_ok());

        let mut policy = ScoringPolicy::default();
        policy.weights.traffic = -0.1;
        assert!(policy.validate().is_err());

        let mut policy = ScoringPolicy::default();
        policy.thresholds.reference_aadt = 0.0;
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_thresholds_out_of_range_rejected() {
        let cases: [fn(&mut SignalThresholds); 6] = [
            |t| t.neutral = 5.0,
            |t| t.neutral = -0.1,
            |t| t.strong_size_fit = 1.5,
            |t| t.reference_aadt = f64::NAN,
            |t| t.competitor_saturation = f64::NAN,
            |t| t.high_traffic_aadt = f64::INFINITY,
        ];
        for set in cases {
            let mut policy = ScoringPolicy::default();
            set(&mut policy.thresholds);
            assert!(policy.validate().is_err(), "{:?}", policy.thresholds);
        }

        let mut policy = ScoringPolicy::default();
        policy.thresholds.neutral = 0.0;
        policy.thresholds.strong_size_fit = 1.0;
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let policy: ScoringPolicy = toml::from_str(
            r#"
            [weights]
            traffic = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(policy.weights.traffic, 0.5);
        assert_eq!(policy.weights.size_fit, DEFAULT_WEIGHT_SIZE_FIT);
        assert_eq!(policy.thresholds.reference_aadt, DEFAULT_REFERENCE_AADT);
    }
}
