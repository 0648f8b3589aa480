// Valuation pipeline: raw comparables in, one defensible value out

pub mod processing;
pub mod yield_rate;

use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{Result, ValuationError};
use crate::observability::metrics;
use crate::pipeline::processing::sanitize::integer_field;
use crate::pipeline::processing::{
    ComparableNormalizer, ConfidenceScorer, Deduplicator, MarketOverrides, OutlierFilter,
    RangeFilter, ValuationCalculator,
};
use crate::pipeline::yield_rate::resolve_yield_rate;
use crate::types::{StageCounts, ValuationInput, ValuationReport};

pub const STAGE_NORMALIZATION: &str = "normalization";
pub const STAGE_FILTERING: &str = "filtering";

/// Runs every stage in order for one target property.
///
/// Synchronous and free of I/O; one instance can serve any number of runs.
pub struct ValuationPipeline {
    config: EngineConfig,
}

impl ValuationPipeline {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[instrument(
        skip(self, input),
        fields(target_area = input.target.area, is_lot = input.target.is_lot)
    )]
    pub fn run(&self, input: &ValuationInput) -> Result<ValuationReport> {
        let started = Instant::now();
        let target = &input.target;
        target.validate()?;

        let received = input.comparables.len();
        metrics::pipeline::run_started(received);
        info!("🏠 Valuing {:.1} m² target with {} raw comparables", target.area, received);

        let yield_rate = resolve_yield_rate(input.market.yield_rate.as_ref(), &self.config.yield_rate);

        // Normalize
        let normalized = ComparableNormalizer::new(target, &yield_rate).normalize(&input.comparables);
        for (_, reason) in &normalized.dropped {
            metrics::pipeline::normalize_dropped(reason.as_str());
        }
        let normalized_count = normalized.comparables.len();
        self.ensure_enough(normalized_count, STAGE_NORMALIZATION)?;

        // Deduplicate
        let deduplicated = Deduplicator::with_config(self.config.dedup.clone())
            .deduplicate(normalized.comparables);
        let deduplicated_count = deduplicated.len();
        metrics::pipeline::duplicates_removed(normalized_count - deduplicated_count);

        // Range filter
        let zone_price_per_area = integer_field(input.market.zone_price_per_area.as_ref());
        let ranged = RangeFilter::with_config(self.config.range.clone()).filter(
            deduplicated,
            target,
            zone_price_per_area,
        );
        let in_range_count = ranged.comparables.len();
        metrics::pipeline::range_stage(ranged.stage.as_str());

        // Outliers
        let trimmed = OutlierFilter::with_config(self.config.outlier.clone()).filter(ranged.comparables);
        metrics::pipeline::outliers_removed(in_range_count - trimmed.comparables.len());

        let comparables = trimmed.comparables;
        metrics::pipeline::final_comparables(comparables.len());
        self.ensure_enough(comparables.len(), STAGE_FILTERING)?;

        debug!(
            received,
            normalized = normalized_count,
            deduplicated = deduplicated_count,
            in_range = in_range_count,
            range_stage = ranged.stage.as_str(),
            outlier_filter_committed = trimmed.committed,
            final_count = comparables.len(),
            "Comparable set settled"
        );

        // Value and rate
        let overrides = MarketOverrides {
            recommended_value: integer_field(input.market.recommended_value.as_ref()),
            range_min: integer_field(input.market.range_min.as_ref()),
            range_max: integer_field(input.market.range_max.as_ref()),
        };
        let figures = ValuationCalculator::with_config(self.config.valuation.clone()).calculate(
            &comparables,
            target,
            &yield_rate,
            &overrides,
        );
        let confidence =
            ConfidenceScorer::with_config(self.config.confidence.clone()).score(&comparables, target);
        let result = figures.with_confidence(confidence);

        metrics::pipeline::valuation_completed(
            result.final_value_source.as_str(),
            result.confidence.level.as_str(),
        );
        metrics::pipeline::run_duration(started.elapsed().as_secs_f64());

        info!(
            "✅ Final value {:.0} ({}) from {} comparables, confidence {}",
            result.final_value,
            result.final_value_source.as_str(),
            comparables.len(),
            result.confidence.level
        );

        Ok(ValuationReport {
            run_id: Uuid::new_v4(),
            valued_at: Utc::now(),
            target: target.clone(),
            yield_rate,
            stages: StageCounts {
                received,
                normalized: normalized_count,
                deduplicated: deduplicated_count,
                in_range: in_range_count,
                range_stage: ranged.stage,
                outlier_filter_committed: trimmed.committed,
                final_count: comparables.len(),
            },
            result,
            comparables,
        })
    }

    fn ensure_enough(&self, found: usize, stage: &'static str) -> Result<()> {
        let required = self.config.min_comparables;
        if found >= required {
            return Ok(());
        }
        warn!(found, required, stage, "⚠️ Not enough valid comparables to value the property");
        metrics::pipeline::insufficient_data(stage);
        Err(ValuationError::InsufficientComparables {
            found,
            required,
            stage,
        })
    }
}

impl Default for ValuationPipeline {
    fn default() -> Self {
        Self::new()
    }
}
