use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Result, ValuationError};
use crate::pipeline::processing::{
    ConfidenceConfig, DedupConfig, OutlierConfig, RangeConfig, ValuationConfig,
};
use crate::pipeline::yield_rate::YieldRateConfig;

/// Every tunable of the valuation engine. Missing sections and keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Valid comparables required to produce a value at all
    pub min_comparables: usize,
    pub yield_rate: YieldRateConfig,
    pub dedup: DedupConfig,
    pub range: RangeConfig,
    pub outlier: OutlierConfig,
    pub valuation: ValuationConfig,
    pub confidence: ConfidenceConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_comparables: 5,
            yield_rate: YieldRateConfig::default(),
            dedup: DedupConfig::default(),
            range: RangeConfig::default(),
            outlier: OutlierConfig::default(),
            valuation: ValuationConfig::default(),
            confidence: ConfidenceConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ValuationError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ValuationError::Config(format!("Failed to render config: {}", e)))
    }

    /// Reject settings that would make a stage meaningless
    pub fn validate(&self) -> Result<()> {
        let y = &self.yield_rate;
        check(
            y.default_monthly > 0.0 && y.default_monthly <= y.max_monthly,
            "yield_rate.default_monthly must be in (0, max_monthly]",
        )?;

        let d = &self.dedup;
        check(
            d.price_tolerance >= 0.0 && d.area_tolerance >= 0.0,
            "dedup tolerances must not be negative",
        )?;
        check(
            (0.0..=1.0).contains(&d.title_similarity_threshold),
            "dedup.title_similarity_threshold must be within [0, 1]",
        )?;

        let r = &self.range;
        check(
            r.strict_min_factor >= 0.0 && r.strict_min_factor <= r.strict_max_factor,
            "range strict band is inverted",
        )?;
        check(
            r.relaxed_min_factor >= 0.0 && r.relaxed_min_factor <= r.relaxed_max_factor,
            "range relaxed band is inverted",
        )?;
        check(
            r.price_band_min_factor >= 0.0 && r.price_band_min_factor <= r.price_band_max_factor,
            "range price band is inverted",
        )?;

        check(
            self.outlier.iqr_multiplier >= 0.0,
            "outlier.iqr_multiplier must not be negative",
        )?;

        let v = &self.valuation;
        check(
            (0.0..0.5).contains(&v.trim_fraction),
            "valuation.trim_fraction must be within [0, 0.5)",
        )?;
        check(
            v.direct_weight >= 0.0
                && v.rentability_weight >= 0.0
                && v.direct_weight + v.rentability_weight > 0.0,
            "valuation blend weights must be non-negative and not both zero",
        )?;
        check(
            (0.0..1.0).contains(&v.range_padding_below) && v.range_padding_above >= 0.0,
            "valuation range padding out of bounds",
        )?;

        let c = &self.confidence;
        check(
            c.portal_verified_weight >= 0.0 && c.zone_similar_weight >= 0.0 && c.estimate_weight >= 0.0,
            "confidence source weights must not be negative",
        )?;
        check(
            c.dispersion_threshold >= 0.0 && c.dispersion_penalty >= 0.0,
            "confidence dispersion settings must not be negative",
        )?;

        Ok(())
    }
}

fn check(condition: bool, message: &str) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(ValuationError::Config(message.to_string()))
    }
}
