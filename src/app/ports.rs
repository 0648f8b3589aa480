use anyhow::Result;
use async_trait::async_trait;

use crate::types::{ExtractionOutput, TargetProperty, ValuationReport};

/// Produces the raw comparables and market signals for a target property
/// (in production: the LLM narrative and listing extraction calls).
#[async_trait]
pub trait ExtractionSource: Send + Sync {
    fn source_name(&self) -> &str;
    async fn extract(&self, target: &TargetProperty) -> Result<ExtractionOutput>;
}

/// Receives finished valuation reports (persistence, rendering, delivery)
#[async_trait]
pub trait ValuationOutputPort: Send + Sync {
    async fn write_report(&self, report: &ValuationReport) -> Result<()>;
}
