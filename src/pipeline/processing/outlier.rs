use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::Comparable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierConfig {
    /// Below this many values the quartiles mean nothing and the filter is skipped
    pub min_values: usize,
    pub iqr_multiplier: f64,
    /// The trimmed set is only used when at least this many comparables survive
    pub min_retained: usize,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            min_values: 4,
            iqr_multiplier: 1.5,
            min_retained: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutlierOutcome {
    pub comparables: Vec<Comparable>,
    /// Whether the trimmed set replaced the input
    pub committed: bool,
}

/// IQR trimming of price-per-area outliers
pub struct OutlierFilter {
    pub config: OutlierConfig,
}

/// Quartile band over a set of values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IqrBand {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

impl IqrBand {
    /// `Q1 = v[floor(n/4)]`, `Q3 = v[floor(3n/4)]` over the sorted values, no interpolation
    pub fn compute(values: &[f64], multiplier: f64) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len();
        let q1 = sorted[(n as f64 * 0.25).floor() as usize];
        let q3 = sorted[((n as f64 * 0.75).floor() as usize).min(n - 1)];
        let iqr = q3 - q1;

        Some(Self {
            q1,
            q3,
            lower: q1 - multiplier * iqr,
            upper: q3 + multiplier * iqr,
        })
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

impl OutlierFilter {
    pub fn new() -> Self {
        Self {
            config: OutlierConfig::default(),
        }
    }

    pub fn with_config(config: OutlierConfig) -> Self {
        Self { config }
    }

    pub fn filter(&self, comparables: Vec<Comparable>) -> OutlierOutcome {
        if comparables.len() < self.config.min_values {
            debug!(count = comparables.len(), "Too few comparables for IQR, skipping");
            return OutlierOutcome {
                comparables,
                committed: false,
            };
        }

        let values: Vec<f64> = comparables.iter().map(|c| c.price_per_area).collect();
        let Some(band) = IqrBand::compute(&values, self.config.iqr_multiplier) else {
            return OutlierOutcome {
                comparables,
                committed: false,
            };
        };

        let kept: Vec<Comparable> = comparables
            .iter()
            .filter(|c| band.contains(c.price_per_area))
            .cloned()
            .collect();

        if kept.len() < self.config.min_retained {
            debug!(
                would_keep = kept.len(),
                count = comparables.len(),
                "IQR trimming would leave too few comparables, keeping pre-filter set"
            );
            return OutlierOutcome {
                comparables,
                committed: false,
            };
        }

        debug!(
            q1 = band.q1,
            q3 = band.q3,
            removed = comparables.len() - kept.len(),
            kept = kept.len(),
            "IQR outlier filter applied"
        );
        OutlierOutcome {
            comparables: kept,
            committed: true,
        }
    }
}

impl Default for OutlierFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OperationKind, SourceValidation};

    fn with_ppa(price_per_area: f64) -> Comparable {
        Comparable {
            title: "Apartamento".to_string(),
            operation_kind: OperationKind::Sale,
            area: 70.0,
            listed_price: price_per_area * 70.0,
            estimated_sale_price: price_per_area * 70.0,
            price_per_area,
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

    #[test]
    fn test_iqr_band_uses_floor_indices() {
        let band = IqrBand::compute(
            &[9.0e6, 3.0e6, 3.1e6, 3.2e6, 3.3e6, 3.4e6],
            1.5,
        )
        .unwrap();
        assert_eq!(band.q1, 3.1e6);
        assert_eq!(band.q3, 3.4e6);
        assert!(band.contains(3.0e6));
        assert!(!band.contains(9.0e6));
        assert!(IqrBand::compute(&[], 1.5).is_none());
    }

    #[test]
    fn test_removes_extreme_price_per_area() {
        let input = [3.0e6, 3.1e6, 3.2e6, 3.3e6, 3.4e6, 9.0e6].map(with_ppa).to_vec();
        let outcome = OutlierFilter::new().filter(input);

        assert!(outcome.committed);
        assert_eq!(outcome.comparables.len(), 5);
        assert!(outcome.comparables.iter().all(|c| c.price_per_area < 9.0e6));
    }

    #[test]
    fn test_skipped_below_minimum_values() {
        let input = [1.0e6, 3.0e6, 90.0e6].map(with_ppa).to_vec();
        let outcome = OutlierFilter::new().filter(input);
        assert!(!outcome.committed);
        assert_eq!(outcome.comparables.len(), 3);
    }

    #[test]
    fn test_not_committed_when_too_few_remain() {
        // five values, one outlier: trimming would leave four
        let input = [3.0e6, 3.1e6, 3.2e6, 3.3e6, 9.0e6].map(with_ppa).to_vec();
        let outcome = OutlierFilter::new().filter(input);
        assert!(!outcome.committed);
        assert_eq!(outcome.comparables.len(), 5);
    }
}
