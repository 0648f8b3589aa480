// Pipeline processing: each stage is a pure function of the list it receives

pub mod sanitize;
pub mod similarity;
pub mod normalize;
pub mod dedup;
pub mod range_filter;
pub mod outlier;
pub mod valuation;
pub mod confidence;

pub use confidence::{ConfidenceConfig, ConfidenceScorer};
pub use dedup::{DedupConfig, Deduplicator};
pub use normalize::{ComparableNormalizer, DropReason, NormalizationOutcome};
pub use outlier::{OutlierConfig, OutlierFilter, OutlierOutcome};
pub use range_filter::{RangeConfig, RangeFilter, RangeOutcome};
pub use sanitize::NumericSanitizer;
pub use similarity::TextSimilarity;
pub use valuation::{MarketOverrides, ValuationCalculator, ValuationConfig, ValuationFigures};
