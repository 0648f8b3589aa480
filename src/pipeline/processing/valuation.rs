use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{
    Comparable, ConfidenceReport, FinalValueSource, OperationKind, RentabilitySource,
    TargetProperty, ValuationResult, YieldRate,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationConfig {
    /// Sales needed before the extremes are trimmed from the direct-sale mean
    pub trim_min_sales: usize,
    /// Share trimmed from each end, by price per m²
    pub trim_fraction: f64,
    pub direct_weight: f64,
    pub rentability_weight: f64,
    /// Synthetic range below the final value, as a fraction of it
    pub range_padding_below: f64,
    /// Synthetic range above the final value, as a fraction of it
    pub range_padding_above: f64,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            trim_min_sales: 5,
            trim_fraction: 0.1,
            direct_weight: 0.6,
            rentability_weight: 0.4,
            range_padding_below: 0.03,
            range_padding_above: 0.05,
        }
    }
}

/// Values the market narrative stated outright, already sanitized
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MarketOverrides {
    pub recommended_value: Option<f64>,
    pub range_min: Option<f64>,
    pub range_max: Option<f64>,
}

/// Everything in a `ValuationResult` except the confidence rating
#[derive(Debug, Clone, PartialEq)]
pub struct ValuationFigures {
    pub direct_sale_value: Option<f64>,
    pub rentability_value: Option<f64>,
    pub final_value: f64,
    pub final_value_source: FinalValueSource,
    pub range_min: f64,
    pub range_max: f64,
    pub price_per_area_used: f64,
    pub average_canon: Option<f64>,
    pub rentability_source: RentabilitySource,
}

impl ValuationFigures {
    pub fn with_confidence(self, confidence: ConfidenceReport) -> ValuationResult {
        ValuationResult {
            direct_sale_value: self.direct_sale_value,
            rentability_value: self.rentability_value,
            final_value: self.final_value,
            final_value_source: self.final_value_source,
            range_min: self.range_min,
            range_max: self.range_max,
            price_per_area_used: self.price_per_area_used,
            average_canon: self.average_canon,
            rentability_source: self.rentability_source,
            confidence,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectSale {
    pub price_per_area_used: f64,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rentability {
    pub value: f64,
    pub average_canon: f64,
    pub source: RentabilitySource,
}

/// Direct comparison and income capitalization, reconciled into one value
pub struct ValuationCalculator {
    pub config: ValuationConfig,
}

impl ValuationCalculator {
    pub fn new() -> Self {
        Self {
            config: ValuationConfig::default(),
        }
    }

    pub fn with_config(config: ValuationConfig) -> Self {
        Self { config }
    }

    pub fn calculate(
        &self,
        comparables: &[Comparable],
        target: &TargetProperty,
        yield_rate: &YieldRate,
        overrides: &MarketOverrides,
    ) -> ValuationFigures {
        let direct = self.direct_sale(comparables, target.area);
        let rentability = self.rentability(comparables, target, yield_rate, direct.as_ref());

        let direct_value = direct.map(|d| d.value);
        let rentability_value = rentability.map(|r| r.value);

        let computed = if target.is_lot {
            direct_value.unwrap_or(0.0)
        } else {
            match (direct_value, rentability) {
                (Some(direct), Some(rent)) if rent.source == RentabilitySource::Comparables => {
                    self.blend(direct, rent.value)
                }
                _ => direct_value.or(rentability_value).unwrap_or(0.0),
            }
        };

        let (final_value, final_value_source) = match overrides.recommended_value {
            Some(recommended) if recommended > 0.0 => {
                debug!(recommended, computed, "Using recommended value from market narrative");
                (recommended, FinalValueSource::LlmRecommended)
            }
            _ => (computed, FinalValueSource::Computed),
        };

        let (range_min, range_max) = self.range(final_value, overrides);

        let price_per_area_used = match direct {
            Some(d) => d.price_per_area_used,
            None => (final_value / target.area).round(),
        };

        ValuationFigures {
            direct_sale_value: direct_value,
            rentability_value,
            final_value,
            final_value_source,
            range_min,
            range_max,
            price_per_area_used,
            average_canon: rentability.map(|r| r.average_canon),
            rentability_source: rentability
                .map(|r| r.source)
                .unwrap_or(RentabilitySource::NotApplicable),
        }
    }

    /// Trimmed mean price per m² of the sales, times the target area
    pub fn direct_sale(&self, comparables: &[Comparable], target_area: f64) -> Option<DirectSale> {
        let mut ppa: Vec<f64> = comparables
            .iter()
            .filter(|c| c.operation_kind == OperationKind::Sale)
            .map(|c| c.price_per_area)
            .collect();

        if ppa.is_empty() {
            return None;
        }
        ppa.sort_by(f64::total_cmp);

        let n = ppa.len();
        let trimmed = if n >= self.config.trim_min_sales {
            let k = (n as f64 * self.config.trim_fraction).floor() as usize;
            if 2 * k < n {
                &ppa[k..n - k]
            } else {
                &ppa[..]
            }
        } else {
            &ppa[..]
        };

        let price_per_area_used = mean(trimmed).round();
        Some(DirectSale {
            price_per_area_used,
            value: (price_per_area_used * target_area).round(),
        })
    }

    /// Capitalized average rent, or a mirror of the direct value for non-lots without rentals
    pub fn rentability(
        &self,
        comparables: &[Comparable],
        target: &TargetProperty,
        yield_rate: &YieldRate,
        direct: Option<&DirectSale>,
    ) -> Option<Rentability> {
        let canons: Vec<f64> = comparables
            .iter()
            .filter(|c| c.operation_kind == OperationKind::Rental)
            .map(|c| c.listed_price)
            .collect();

        if !canons.is_empty() && yield_rate.value > 0.0 {
            let average_canon = mean(&canons);
            return Some(Rentability {
                value: (average_canon / yield_rate.value).round(),
                average_canon,
                source: RentabilitySource::Comparables,
            });
        }

        if target.is_lot {
            return None;
        }

        direct.map(|d| Rentability {
            value: d.value,
            average_canon: (d.value * yield_rate.value).round(),
            source: RentabilitySource::SyntheticFromDirect,
        })
    }

    fn blend(&self, direct: f64, rentability: f64) -> f64 {
        let total_weight = self.config.direct_weight + self.config.rentability_weight;
        if total_weight <= 0.0 {
            return direct;
        }
        ((self.config.direct_weight * direct + self.config.rentability_weight * rentability)
            / total_weight)
            .round()
    }

    fn range(&self, final_value: f64, overrides: &MarketOverrides) -> (f64, f64) {
        match (overrides.range_min, overrides.range_max) {
            (Some(min), Some(max)) if min > 0.0 && max > 0.0 && min <= max => (min, max),
            _ => (
                (final_value * (1.0 - self.config.range_padding_below)).round(),
                (final_value * (1.0 + self.config.range_padding_above)).round(),
            ),
        }
    }
}

impl Default for ValuationCalculator {
    fn default() -> Self {
        Self::new()
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
