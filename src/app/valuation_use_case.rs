use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::app::ports::{ExtractionSource, ValuationOutputPort};
use crate::observability::metrics;
use crate::pipeline::ValuationPipeline;
use crate::types::{TargetProperty, ValuationInput, ValuationReport};

/// Use case for valuing one property: extract, run the pipeline, hand the report on.
///
/// An insufficient sample comes back as a [`crate::error::ValuationError`] inside the
/// `anyhow::Error`, so callers can `downcast_ref` it and show a "not enough data" answer.
pub struct ValuationUseCase {
    source: Box<dyn ExtractionSource>,
    pipeline: ValuationPipeline,
    output: Box<dyn ValuationOutputPort>,
}

impl ValuationUseCase {
    pub fn new(
        source: Box<dyn ExtractionSource>,
        pipeline: ValuationPipeline,
        output: Box<dyn ValuationOutputPort>,
    ) -> Self {
        Self {
            source,
            pipeline,
            output,
        }
    }

    /// Create a use case with the default engine configuration
    pub fn with_default_pipeline(
        source: Box<dyn ExtractionSource>,
        output: Box<dyn ValuationOutputPort>,
    ) -> Self {
        Self::new(source, ValuationPipeline::new(), output)
    }

    #[instrument(skip(self, target), fields(source = %self.source.source_name()))]
    pub async fn value_property(&self, target: &TargetProperty) -> Result<ValuationReport> {
        let source_name = self.source.source_name().to_string();

        let extraction = match self.source.extract(target).await {
            Ok(extraction) => extraction,
            Err(e) => {
                metrics::use_case::extraction_error(&source_name);
                return Err(e.context(format!("Extraction from '{}' failed", source_name)));
            }
        };
        info!(
            "📥 Extracted {} raw comparables from {}",
            extraction.comparables.len(),
            source_name
        );

        let input = ValuationInput::from_extraction(target.clone(), extraction);
        let report = self.pipeline.run(&input)?;

        if let Err(e) = self.output.write_report(&report).await {
            metrics::use_case::report_write_error();
            return Err(e).context(format!("Failed to write report {}", report.run_id));
        }
        metrics::use_case::report_written();

        Ok(report)
    }
}
