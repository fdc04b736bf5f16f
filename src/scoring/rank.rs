//! Candidate scoring and dense ranking
//!
//! The composite score is a weighted mean of five components, each in
//! [0, 1], scaled to [0, 100]:
//!
//! ```text
//! score = 100 · Σ wᵢ·sᵢ / Σ wᵢ
//! ```
//!
//! A component whose inputs are missing takes the configured neutral value
//! so a sparse record is neither rewarded nor buried; the completeness
//! component accounts for the sparsity on its own.

use crate::constants::ranking::EMPHASIS_TOP_K;
use crate::scoring::weights::ScoringPolicy;
use crate::scoring::{
    filter_candidates, CandidateProperty, FilterCriteria, ListingType, SIGNAL_COMPETITORS_NEARBY,
    SIGNAL_TRAFFIC_AADT,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// Per-component values, each in [0, 1]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    pub size_fit: f64,
    pub traffic: f64,
    pub competition: f64,
    pub completeness: f64,
    pub opportunity: f64,
}

/// A score with the components and labels that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub score: f64,
    pub components: ComponentScores,
    pub signals: Vec<String>,
}

/// One ranked candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpportunityRanking {
    pub property: CandidateProperty,
    pub rank: u32,
    pub priority_score: f64,
    pub priority_signals: Vec<String>,
}

/// Whether the view should emphasize this entry (top five)
pub fn is_emphasized(ranking: &OpportunityRanking) -> bool {
    ranking.rank <= EMPHASIS_TOP_K
}

/// Scores candidates against the size range of a set of criteria
pub struct Scorer<'a> {
    policy: &'a ScoringPolicy,
    criteria: &'a FilterCriteria,
}

impl<'a> Scorer<'a> {
    pub fn new(policy: &'a ScoringPolicy, criteria: &'a FilterCriteria) -> Self {
        Self { policy, criteria }
    }

    pub fn score(&self, property: &CandidateProperty) -> ScoreBreakdown {
        let thresholds = &self.policy.thresholds;
        let neutral = thresholds.neutral;

        let size_fit = self.size_fit(property);
        let traffic_aadt = property.signal(SIGNAL_TRAFFIC_AADT);
        let competitors = property.signal(SIGNAL_COMPETITORS_NEARBY);

        let components = ComponentScores {
            size_fit: size_fit.unwrap_or(neutral),
            traffic: traffic_aadt
                .map(|aadt| (aadt / thresholds.reference_aadt).clamp(0.0, 1.0))
                .unwrap_or(neutral),
            competition: competitors
                .map(|n| (1.0 - n / thresholds.competitor_saturation).clamp(0.0, 1.0))
                .unwrap_or(neutral),
            completeness: completeness(property),
            opportunity: match property.listing_type {
                ListingType::Opportunity => 1.0,
                ListingType::ActiveListing => 0.0,
            },
        };

        let weights = &self.policy.weights;
        let total = weights.total();
        let score = if total > 0.0 {
            100.0
                * (weights.size_fit * components.size_fit
                    + weights.traffic * components.traffic
                    + weights.competition * components.competition
                    + weights.completeness * components.completeness
                    + weights.opportunity * components.opportunity)
                / total
        } else {
            0.0
        };

        let mut signals = Vec::new();
        if property.listing_type == ListingType::Opportunity {
            signals.push("Off-market opportunity".to_string());
        }
        if let Some(aadt) = traffic_aadt.filter(|a| *a >= thresholds.high_traffic_aadt) {
            signals.push(format!("High-traffic corridor ({:.0} AADT)", aadt));
        }
        if competitors == Some(0.0) {
            signals.push("No nearby competitors".to_string());
        }
        if size_fit.is_some_and(|fit| fit >= thresholds.strong_size_fit) {
            signals.push("Strong size fit".to_string());
        }
        if components.completeness < 0.5 {
            signals.push("Incomplete data".to_string());
        }

        debug!(
            "Scored {}: {:.2} (size={:.2}, traffic={:.2}, competition={:.2}, complete={:.2}, opp={:.0})",
            property.id,
            score,
            components.size_fit,
            components.traffic,
            components.competition,
            components.completeness,
            components.opportunity
        );

        ScoreBreakdown {
            score,
            components,
            signals,
        }
    }

    /// Mean closeness of each measurable size attribute to its range midpoint
    ///
    /// An attribute is measurable when it is present, nonzero and its range
    /// is closed on both ends.
    fn size_fit(&self, property: &CandidateProperty) -> Option<f64> {
        let fits: Vec<f64> = [
            midpoint_fit(
                property.parcel_acres,
                self.criteria.min_parcel_acres,
                self.criteria.max_parcel_acres,
            ),
            midpoint_fit(
                property.building_sqft,
                self.criteria.min_building_sqft,
                self.criteria.max_building_sqft,
            ),
        ]
        .into_iter()
        .flatten()
        .collect();

        if fits.is_empty() {
            None
        } else {
            Some(fits.iter().sum::<f64>() / fits.len() as f64)
        }
    }
}

fn midpoint_fit(value: Option<f64>, min: Option<f64>, max: Option<f64>) -> Option<f64> {
    let value = value.filter(|v| v.is_finite() && *v != 0.0)?;
    let (lo, hi) = (min?, max?);
    let half = (hi - lo) / 2.0;
    let mid = lo + half;
    if half <= 0.0 {
        return Some(if value == mid { 1.0 } else { 0.0 });
    }
    Some((1.0 - (value - mid).abs() / half).clamp(0.0, 1.0))
}

/// Share of descriptive attributes present
fn completeness(property: &CandidateProperty) -> f64 {
    let present = [
        property.address.is_some(),
        property.city.is_some(),
        property.state.is_some(),
        property.zip.is_some(),
        property.parcel_acres.is_some_and(|a| a != 0.0),
        property.building_sqft.is_some_and(|s| s != 0.0),
        property.signal(SIGNAL_TRAFFIC_AADT).is_some(),
        property.signal(SIGNAL_COMPETITORS_NEARBY).is_some(),
    ];
    present.iter().filter(|p| **p).count() as f64 / present.len() as f64
}

/// Filter, score and densely rank `properties`
///
/// Sorted by descending score; ties go to the smaller id. Ranks run 1..N
/// over the filtered set. The same inputs always produce the same output.
pub fn rank(
    properties: &[CandidateProperty],
    criteria: &FilterCriteria,
    policy: &ScoringPolicy,
) -> Vec<OpportunityRanking> {
    let scorer = Scorer::new(policy, criteria);

    let mut scored: Vec<(CandidateProperty, ScoreBreakdown)> = filter_candidates(properties, criteria)
        .into_iter()
        .map(|p| {
            let breakdown = scorer.score(&p);
            (p, breakdown)
        })
        .collect();

    scored.sort_by(|(pa, a), (pb, b)| match b.score.total_cmp(&a.score) {
        Ordering::Equal => pa.id.cmp(&pb.id),
        other => other,
    });

    scored
        .into_iter()
        .zip(1u32..)
        .map(|((property, breakdown), rank)| OpportunityRanking {
            property,
            rank,
            priority_score: breakdown.score,
            priority_signals: breakdown.signals,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::tests::candidate;
    use crate::scoring::PropertyType;
    use approx::assert_relative_eq;
    use std::collections::BTreeSet;

    fn with_signals(mut p: CandidateProperty, aadt: f64, competitors: f64) -> CandidateProperty {
        p.raw_signals.insert(SIGNAL_TRAFFIC_AADT.to_string(), aadt);
        p.raw_signals
            .insert(SIGNAL_COMPETITORS_NEARBY.to_string(), competitors);
        p
    }

    fn sample() -> Vec<CandidateProperty> {
        let mut opportunity = with_signals(
            candidate("p-03", PropertyType::Land, Some(3.0), None),
            30_000.0,
            0.0,
        );
        opportunity.listing_type = ListingType::Opportunity;

        vec![
            with_signals(
                candidate("p-01", PropertyType::Retail, None, Some(6_000.0)),
                12_000.0,
                2.0,
            ),
            candidate("p-02", PropertyType::Office, None, Some(50_000.0)),
            opportunity,
            candidate("p-04", PropertyType::Other, None, None),
            // Identical to p-01 apart from id
            with_signals(
                candidate("p-00", PropertyType::Retail, None, Some(6_000.0)),
                12_000.0,
                2.0,
            ),
            candidate("p-05", PropertyType::Land, Some(40.0), None),
        ]
    }

    fn criteria() -> FilterCriteria {
        FilterCriteria {
            min_parcel_acres: Some(1.0),
            max_parcel_acres: Some(5.0),
            min_building_sqft: Some(2_000.0),
            max_building_sqft: Some(10_000.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_rank_is_deterministic() {
        let policy = ScoringPolicy::default();
        let first = rank(&sample(), &criteria(), &policy);
        let second = rank(&sample(), &criteria(), &policy);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_ranked_entries_pass_filter() {
        let criteria = criteria();
        let ranked = rank(&sample(), &criteria, &ScoringPolicy::default());
        assert!(!ranked.is_empty());
        for entry in &ranked {
            assert_eq!(
                filter_candidates(std::slice::from_ref(&entry.property), &criteria).len(),
                1
            );
        }
        let ids: BTreeSet<_> = ranked.iter().map(|r| r.property.id.as_str()).collect();
        assert!(!ids.contains("p-02"));
        assert!(!ids.contains("p-05"));
    }

    #[test]
    fn test_ranks_are_dense() {
        let ranked = rank(&sample(), &criteria(), &ScoringPolicy::default());
        let ranks: Vec<u32> = ranked.iter().map(|r| r.rank).collect();
        let expected: Vec<u32> = (1..=ranked.len() as u32).collect();
        assert_eq!(ranks, expected);

        for pair in ranked.windows(2) {
            assert!(pair[0].priority_score >= pair[1].priority_score);
        }
    }

    #[test]
    fn test_tie_broken_by_id() {
        let ranked = rank(&sample(), &criteria(), &ScoringPolicy::default());
        let pos = |id: &str| ranked.iter().position(|r| r.property.id == id).unwrap();
        assert_eq!(
            ranked[pos("p-00")].priority_score,
            ranked[pos("p-01")].priority_score
        );
        assert_eq!(pos("p-01"), pos("p-00") + 1);
    }

    #[test]
    fn test_opportunity_ranks_first() {
        let ranked = rank(&sample(), &criteria(), &ScoringPolicy::default());
        assert_eq!(ranked[0].property.id, "p-03");
        assert!(is_emphasized(&ranked[0]));
        assert!(ranked[0]
            .priority_signals
            .contains(&"Off-market opportunity".to_string()));
        assert!(ranked[0]
            .priority_signals
            .contains(&"No nearby competitors".to_string()));
    }

    #[test]
    fn test_empty_inputs() {
        assert!(rank(&[], &criteria(), &ScoringPolicy::default()).is_empty());

        let nothing = FilterCriteria {
            include_land: false,
            include_retail: false,
            include_office: false,
            ..Default::default()
        };
        assert!(rank(&sample(), &nothing, &ScoringPolicy::default()).is_empty());
    }

    #[test]
    fn test_size_fit_peaks_at_midpoint() {
        let policy = ScoringPolicy::default();
        let criteria = criteria();
        let scorer = Scorer::new(&policy, &criteria);

        let mid = scorer.score(&candidate("a", PropertyType::Land, Some(3.0), None));
        let edge = scorer.score(&candidate("b", PropertyType::Land, Some(5.0), None));
        assert_relative_eq!(mid.components.size_fit, 1.0);
        assert_relative_eq!(edge.components.size_fit, 0.0);
        assert!(mid.score > edge.score);
    }

    #[test]
    fn test_missing_signals_are_neutral() {
        let policy = ScoringPolicy::default();
        let criteria = FilterCriteria::default();
        let breakdown =
            Scorer::new(&policy, &criteria).score(&candidate("a", PropertyType::Retail, None, None));
        assert_relative_eq!(breakdown.components.size_fit, policy.thresholds.neutral);
        assert_relative_eq!(breakdown.components.traffic, policy.thresholds.neutral);
        assert_relative_eq!(breakdown.components.competition, policy.thresholds.neutral);
        assert_relative_eq!(breakdown.components.completeness, 0.5);
    }

    #[test]
    fn test_weights_change_order() {
        let mut busy = with_signals(
            candidate("busy", PropertyType::Retail, None, None),
            40_000.0,
            5.0,
        );
        busy.address = None;
        let quiet = with_signals(
            candidate("quiet", PropertyType::Retail, None, None),
            1_000.0,
            0.0,
        );
        let props = vec![busy, quiet];

        let mut traffic_first = ScoringPolicy::default();
        traffic_first.weights.traffic = 10.0;
        let ranked = rank(&props, &FilterCriteria::default(), &traffic_first);
        assert_eq!(ranked[0].property.id, "busy");

        let mut competition_first = ScoringPolicy::default();
        competition_first.weights.competition = 10.0;
        let ranked = rank(&props, &FilterCriteria::default(), &competition_first);
        assert_eq!(ranked[0].property.id, "quiet");
    }
}
