use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{Comparable, RangeStage, TargetProperty};

/// Area (and optional price per m²) bands around the target property.
///
/// Factors multiply the target area, or the zone reference price per m² for the price band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeConfig {
    pub strict_min_factor: f64,
    pub strict_max_factor: f64,
    /// Lots larger than this (m²) get the relaxed fallback
    pub large_lot_area: f64,
    /// Survivors the strict band must keep before a large lot relaxes it
    pub strict_min_survivors: usize,
    pub relaxed_min_factor: f64,
    pub relaxed_max_factor: f64,
    /// Survivors the relaxed band must keep before falling back to the unfiltered set
    pub relaxed_min_survivors: usize,
    pub price_band_min_factor: f64,
    pub price_band_max_factor: f64,
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            strict_min_factor: 0.5,
            strict_max_factor: 1.5,
            large_lot_area: 1000.0,
            strict_min_survivors: 5,
            relaxed_min_factor: 0.3,
            relaxed_max_factor: 1.7,
            relaxed_min_survivors: 3,
            price_band_min_factor: 0.5,
            price_band_max_factor: 2.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RangeOutcome {
    pub comparables: Vec<Comparable>,
    pub stage: RangeStage,
}

pub struct RangeFilter {
    pub config: RangeConfig,
}

impl RangeFilter {
    pub fn new() -> Self {
        Self {
            config: RangeConfig::default(),
        }
    }

    pub fn with_config(config: RangeConfig) -> Self {
        Self { config }
    }

    /// Keep comparables of similar size to the target.
    ///
    /// `zone_price_per_area`, when positive, also bounds price per m² in the banded stages.
    pub fn filter(
        &self,
        comparables: Vec<Comparable>,
        target: &TargetProperty,
        zone_price_per_area: Option<f64>,
    ) -> RangeOutcome {
        let reference = zone_price_per_area.filter(|price| *price > 0.0);
        let strict = self.band(
            &comparables,
            target.area,
            self.config.strict_min_factor,
            self.config.strict_max_factor,
            reference,
        );

        if !target.is_large_lot(self.config.large_lot_area)
            || strict.len() >= self.config.strict_min_survivors
        {
            debug!(kept = strict.len(), received = comparables.len(), "Strict range band applied");
            return RangeOutcome {
                comparables: strict,
                stage: RangeStage::Strict,
            };
        }

        let relaxed = self.band(
            &comparables,
            target.area,
            self.config.relaxed_min_factor,
            self.config.relaxed_max_factor,
            reference,
        );

        if relaxed.len() >= self.config.relaxed_min_survivors {
            debug!(
                strict = strict.len(),
                kept = relaxed.len(),
                "Large lot: relaxed range band applied"
            );
            return RangeOutcome {
                comparables: relaxed,
                stage: RangeStage::Relaxed,
            };
        }

        debug!(
            relaxed = relaxed.len(),
            kept = comparables.len(),
            "Large lot: range bands too narrow, keeping unfiltered set"
        );
        RangeOutcome {
            comparables,
            stage: RangeStage::Unfiltered,
        }
    }

    fn band(
        &self,
        comparables: &[Comparable],
        target_area: f64,
        min_factor: f64,
        max_factor: f64,
        reference_price: Option<f64>,
    ) -> Vec<Comparable> {
        let (min_area, max_area) = (target_area * min_factor, target_area * max_factor);

        comparables
            .iter()
            .filter(|c| c.area >= min_area && c.area <= max_area)
            .filter(|c| match reference_price {
                Some(reference) => {
                    c.price_per_area >= reference * self.config.price_band_min_factor
                        && c.price_per_area <= reference * self.config.price_band_max_factor
                }
                None => true,
            })
            .cloned()
            .collect()
    }
}

impl Default for RangeFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OperationKind, SourceValidation};

    fn with_area(area: f64) -> Comparable {
        let price = area * 1_000_000.0;
        Comparable {
            title: format!("Lote {} m²", area),
            operation_kind: OperationKind::Sale,
            area,
            listed_price: price,
            estimated_sale_price: price,
            price_per_area: 1_000_000.0,
            monthly_yield: None,
            source_validation: SourceValidation::PortalVerified,
            note: None,
            rooms: None,
            bathrooms: None,
            neighborhood: None,
            municipality: None,
            source: None,
        }
    }

    fn areas(outcome: &RangeOutcome) -> Vec<f64> {
        outcome.comparables.iter().map(|c| c.area).collect()
    }

    #[test]
    fn test_strict_band_is_inclusive() {
        let outcome = RangeFilter::new().filter(
            [34.0, 35.0, 70.0, 105.0, 106.0].map(with_area).to_vec(),
            &TargetProperty::new(70.0),
            None,
        );
        assert_eq!(outcome.stage, RangeStage::Strict);
        assert_eq!(areas(&outcome), vec![35.0, 70.0, 105.0]);
    }

    #[test]
    fn test_non_lot_never_relaxes() {
        let outcome = RangeFilter::new().filter(
            [10.0, 200.0].map(with_area).to_vec(),
            &TargetProperty::new(2000.0),
            None,
        );
        assert_eq!(outcome.stage, RangeStage::Strict);
        assert!(outcome.comparables.is_empty());
    }

    #[test]
    fn test_large_lot_relaxes_then_falls_back() {
        let target = TargetProperty::lot(2000.0, None);

        // two inside the strict band, five inside the relaxed one
        let outcome = RangeFilter::new().filter(
            [700.0, 900.0, 1500.0, 2500.0, 3300.0, 9000.0].map(with_area).to_vec(),
            &target,
            None,
        );
        assert_eq!(outcome.stage, RangeStage::Relaxed);
        assert_eq!(areas(&outcome), vec![700.0, 900.0, 1500.0, 2500.0, 3300.0]);

        let outcome = RangeFilter::new().filter(
            [100.0, 1500.0, 9000.0].map(with_area).to_vec(),
            &target,
            None,
        );
        assert_eq!(outcome.stage, RangeStage::Unfiltered);
        assert_eq!(outcome.comparables.len(), 3);
    }

    #[test]
    fn test_large_lot_keeps_strict_with_enough_survivors() {
        let outcome = RangeFilter::new().filter(
            [1500.0, 1800.0, 2000.0, 2200.0, 2900.0, 9000.0].map(with_area).to_vec(),
            &TargetProperty::lot(2000.0, None),
            None,
        );
        assert_eq!(outcome.stage, RangeStage::Strict);
        assert_eq!(outcome.comparables.len(), 5);
    }

    #[test]
    fn test_price_band_only_with_reference() {
        let mut cheap = with_area(70.0);
        cheap.price_per_area = 400_000.0;
        let input = vec![with_area(70.0), cheap];
        let target = TargetProperty::new(70.0);

        let outcome = RangeFilter::new().filter(input.clone(), &target, Some(1_000_000.0));
        assert_eq!(outcome.comparables.len(), 1);

        let outcome = RangeFilter::new().filter(input.clone(), &target, None);
        assert_eq!(outcome.comparables.len(), 2);

        let outcome = RangeFilter::new().filter(input, &target, Some(0.0));
        assert_eq!(outcome.comparables.len(), 2);
    }
}
