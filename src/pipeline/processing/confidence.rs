use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{Comparable, ConfidenceLevel, ConfidenceReport, SourceBreakdown, TargetProperty};

/// Weights and cutoffs of the confidence rating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    pub portal_verified_weight: f64,
    pub zone_similar_weight: f64,
    /// Weight of zone estimates and municipal averages
    pub estimate_weight: f64,

    /// Dispersion coefficient above which prices are considered scattered
    pub dispersion_threshold: f64,
    /// Multiplier applied to the quality score when prices are scattered
    pub dispersion_penalty: f64,

    pub high_min_score: f64,
    pub high_min_total: usize,
    pub medium_min_score: f64,
    pub medium_min_total: usize,
    /// Second way into Medium: a lower score with a smaller sample
    pub medium_alt_min_score: f64,
    pub medium_alt_min_total: usize,

    /// Lots: Low becomes Medium with enough zone-similar and verified listings
    pub lot_promotion_min_zone_similar: usize,
    pub lot_promotion_min_portal_verified: usize,
    pub lot_promotion_min_total: usize,
    /// Non-lots: Medium becomes High with enough verified listings and no zone-similar ones
    pub promotion_min_portal_verified: usize,
    pub promotion_min_total: usize,

    /// Share of estimate-derived comparables above which High drops to Medium
    pub high_max_estimate_share: f64,
    /// Share of estimate-derived comparables above which Medium drops to Low
    pub medium_max_estimate_share: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            portal_verified_weight: 3.0,
            zone_similar_weight: 2.0,
            estimate_weight: 1.0,
            dispersion_threshold: 0.8,
            dispersion_penalty: 0.7,
            high_min_score: 2.2,
            high_min_total: 8,
            medium_min_score: 1.8,
            medium_min_total: 6,
            medium_alt_min_score: 1.3,
            medium_alt_min_total: 5,
            lot_promotion_min_zone_similar: 4,
            lot_promotion_min_portal_verified: 2,
            lot_promotion_min_total: 7,
            promotion_min_portal_verified: 5,
            promotion_min_total: 6,
            high_max_estimate_share: 0.5,
            medium_max_estimate_share: 0.7,
        }
    }
}

/// Rates how far the final comparable set can be trusted.
///
/// Depends only on the multiset of comparables, never on their order.
pub struct ConfidenceScorer {
    pub config: ConfidenceConfig,
}

impl ConfidenceScorer {
    pub fn new() -> Self {
        Self {
            config: ConfidenceConfig::default(),
        }
    }

    pub fn with_config(config: ConfidenceConfig) -> Self {
        Self { config }
    }

    pub fn score(&self, comparables: &[Comparable], target: &TargetProperty) -> ConfidenceReport {
        let breakdown = SourceBreakdown::tally(comparables);
        let quality_score = self.quality_score(&breakdown);

        let prices: Vec<f64> = comparables.iter().map(|c| c.price_per_area).collect();
        let dispersion_coefficient = dispersion_coefficient(&prices);
        let dispersion_high = dispersion_coefficient > self.config.dispersion_threshold;

        let level = self.level(quality_score, dispersion_high, &breakdown, target.is_lot);

        debug!(
            %level,
            quality_score,
            dispersion_coefficient,
            total = breakdown.total(),
            "Confidence scored"
        );

        ConfidenceReport {
            level,
            quality_score,
            dispersion_coefficient,
            dispersion_high,
            source_breakdown: breakdown,
        }
    }

    /// Weighted mean source quality, 0 for an empty set
    pub fn quality_score(&self, breakdown: &SourceBreakdown) -> f64 {
        let total = breakdown.total();
        if total == 0 {
            return 0.0;
        }
        let weighted = self.config.portal_verified_weight * breakdown.portal_verified as f64
            + self.config.zone_similar_weight * breakdown.zone_similar as f64
            + self.config.estimate_weight * breakdown.estimates() as f64;
        weighted / total as f64
    }

    pub fn level(
        &self,
        quality_score: f64,
        dispersion_high: bool,
        breakdown: &SourceBreakdown,
        is_lot: bool,
    ) -> ConfidenceLevel {
        let cfg = &self.config;
        let total = breakdown.total();
        let final_score = if dispersion_high {
            quality_score * cfg.dispersion_penalty
        } else {
            quality_score
        };

        let mut level = if final_score >= cfg.high_min_score
            && total >= cfg.high_min_total
            && !dispersion_high
        {
            ConfidenceLevel::High
        } else if (final_score >= cfg.medium_min_score && total >= cfg.medium_min_total)
            || (final_score >= cfg.medium_alt_min_score && total >= cfg.medium_alt_min_total)
        {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        };

        if is_lot
            && level == ConfidenceLevel::Low
            && breakdown.zone_similar >= cfg.lot_promotion_min_zone_similar
            && breakdown.portal_verified >= cfg.lot_promotion_min_portal_verified
            && total >= cfg.lot_promotion_min_total
        {
            level = ConfidenceLevel::Medium;
        }

        if !is_lot
            && level == ConfidenceLevel::Medium
            && breakdown.portal_verified >= cfg.promotion_min_portal_verified
            && breakdown.zone_similar == 0
            && total >= cfg.promotion_min_total
            && !dispersion_high
        {
            level = ConfidenceLevel::High;
        }

        let estimates = breakdown.estimates() as f64;
        if level == ConfidenceLevel::High && estimates > cfg.high_max_estimate_share * total as f64 {
            level = ConfidenceLevel::Medium;
        }
        if level == ConfidenceLevel::Medium
            && estimates > cfg.medium_max_estimate_share * total as f64
        {
            level = ConfidenceLevel::Low;
        }

        level
    }
}

impl Default for ConfidenceScorer {
    fn default() -> Self {
        Self::new()
    }
}

/// `(max - min) / mean(max, min)`; 0 with fewer than two values or a zero midpoint
pub fn dispersion_coefficient(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let midpoint = (max + min) / 2.0;
    if midpoint == 0.0 {
        return 0.0;
    }
    (max - min) / midpoint
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OperationKind, SourceValidation};

    fn comparable(source_validation: SourceValidation, price_per_area: f64) -> Comparable {
        Comparable {
            title: "Apartamento".to_string(),
            operation_kind: OperationKind::Sale,
            area: 70.0,
            listed_price: price_per_area * 70.0,
            estimated_sale_price: price_per_area * 70.0,
            price_per_area,
            monthly_yield: None,
            source_validation,
            note: None,
            rooms: None,
            bathrooms: None,
            neighborhood: None,
            municipality: None,
            source: None,
        }
    }

    fn mix(pv: usize, zs: usize, ze: usize, ma: usize) -> Vec<Comparable> {
        let mut out = Vec::new();
        out.extend((0..pv).map(|_| comparable(SourceValidation::PortalVerified, 3.0e6)));
        out.extend((0..zs).map(|_| comparable(SourceValidation::ZoneSimilar, 3.1e6)));
        out.extend((0..ze).map(|_| comparable(SourceValidation::ZoneEstimate, 3.2e6)));
        out.extend((0..ma).map(|_| comparable(SourceValidation::MunicipalAverage, 3.3e6)));
        out
    }

    fn level_of(comparables: &[Comparable], target: &TargetProperty) -> ConfidenceLevel {
        ConfidenceScorer::new().score(comparables, target).level
    }

    #[test]
    fn test_verified_heavy_sample_is_high() {
        let report = ConfidenceScorer::new().score(&mix(8, 2, 0, 0), &TargetProperty::new(70.0));
        assert_eq!(report.level, ConfidenceLevel::High);
        assert!((report.quality_score - 2.8).abs() < 1e-9);
        assert!(!report.dispersion_high);
        assert_eq!(report.source_breakdown.portal_verified, 8);
        assert_eq!(report.source_breakdown.zone_similar, 2);
    }

    #[test]
    fn test_empty_set_is_low() {
        let report = ConfidenceScorer::new().score(&[], &TargetProperty::new(70.0));
        assert_eq!(report.level, ConfidenceLevel::Low);
        assert_eq!(report.quality_score, 0.0);
        assert_eq!(report.dispersion_coefficient, 0.0);
    }

    #[test]
    fn test_medium_tiers() {
        let target = TargetProperty::new(70.0);
        // 6 zone-similar: score 2.0, total 6
        assert_eq!(level_of(&mix(0, 6, 0, 0), &target), ConfidenceLevel::Medium);
        // 5 listings averaging 1.4
        assert_eq!(level_of(&mix(0, 2, 3, 0), &target), ConfidenceLevel::Medium);
        assert_eq!(level_of(&mix(0, 0, 5, 0), &target), ConfidenceLevel::Low);
    }

    #[test]
    fn test_high_dispersion_blocks_high() {
        let mut comparables = mix(9, 0, 0, 0);
        comparables.push(comparable(SourceValidation::PortalVerified, 9.0e6));
        let report = ConfidenceScorer::new().score(&comparables, &TargetProperty::new(70.0));

        assert!(report.dispersion_high);
        // 3.0 * 0.7 = 2.1
        assert_eq!(report.level, ConfidenceLevel::Medium);
    }

    #[test]
    fn test_non_lot_promotion_to_high() {
        // 6 verified: score 3.0 but total below 8, promoted from Medium
        assert_eq!(
            level_of(&mix(6, 0, 0, 0), &TargetProperty::new(70.0)),
            ConfidenceLevel::High
        );
        // a single zone-similar listing blocks the promotion
        assert_eq!(
            level_of(&mix(6, 1, 0, 0), &TargetProperty::new(70.0)),
            ConfidenceLevel::Medium
        );
    }

    #[test]
    fn test_lot_promotion_to_medium() {
        let lot = TargetProperty::lot(2000.0, None);
        // score (6 + 8 + 1) / 7 = 2.14 with total 7 is Medium without any promotion
        let comparables = mix(2, 4, 1, 0);
        assert_eq!(level_of(&comparables, &lot), ConfidenceLevel::Medium);

        let scorer = ConfidenceScorer::new();
        let breakdown = SourceBreakdown {
            portal_verified: 2,
            zone_similar: 4,
            zone_estimate: 1,
            municipal_average: 0,
        };
        // scattered prices push the score under every Medium cutoff
        assert_eq!(scorer.level(1.0, true, &breakdown, true), ConfidenceLevel::Medium);
        assert_eq!(scorer.level(1.0, true, &breakdown, false), ConfidenceLevel::Low);
    }

    #[test]
    fn test_estimate_heavy_samples_are_demoted() {
        let scorer = ConfidenceScorer::new();
        let breakdown = SourceBreakdown {
            portal_verified: 4,
            zone_similar: 0,
            zone_estimate: 3,
            municipal_average: 3,
        };
        // High by score, but 60% estimates
        assert_eq!(scorer.level(2.5, false, &breakdown, false), ConfidenceLevel::Medium);

        let breakdown = SourceBreakdown {
            portal_verified: 2,
            zone_similar: 0,
            zone_estimate: 4,
            municipal_average: 4,
        };
        // Medium by score, but 80% estimates
        assert_eq!(scorer.level(2.0, false, &breakdown, false), ConfidenceLevel::Low);
    }

    #[test]
    fn test_dispersion_coefficient() {
        assert_eq!(dispersion_coefficient(&[3.0e6]), 0.0);
        assert_eq!(dispersion_coefficient(&[0.0, 0.0]), 0.0);
        let d = dispersion_coefficient(&[2.0e6, 3.0e6, 6.0e6]);
        assert!((d - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_order_independent() {
        let comparables = mix(3, 2, 1, 1);
        let mut reversed = comparables.clone();
        reversed.reverse();
        let target = TargetProperty::new(70.0);
        assert_eq!(
            ConfidenceScorer::new().score(&comparables, &target),
            ConfidenceScorer::new().score(&reversed, &target)
        );
    }
}
