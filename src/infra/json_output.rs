use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::app::ports::ValuationOutputPort;
use crate::types::ValuationReport;

/// Writes each report as pretty JSON into an output directory
pub struct JsonFileOutput {
    output_dir: PathBuf,
}

impl JsonFileOutput {
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    /// `valuation_<timestamp>_<run id prefix>.json`, derived from the report alone
    pub fn report_path(&self, report: &ValuationReport) -> PathBuf {
        let run_id = report.run_id.simple().to_string();
        let file_name = format!(
            "valuation_{}_{}.json",
            report.valued_at.format("%Y%m%d_%H%M%S"),
            &run_id[..8]
        );
        self.output_dir.join(file_name)
    }
}

#[async_trait]
impl ValuationOutputPort for JsonFileOutput {
    async fn write_report(&self, report: &ValuationReport) -> Result<()> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| format!("Failed to create {}", self.output_dir.display()))?;

        let path = self.report_path(report);
        let json = serde_json::to_vec_pretty(report)?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        info!("💾 Saved valuation report to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ValuationPipeline;
    use crate::types::{MarketSignals, RawComparable, RawNumber, TargetProperty, ValuationInput};
    use tempfile::TempDir;

    fn report() -> ValuationReport {
        let comparables = (0..5)
            .map(|i| RawComparable {
                title: Some(format!("Casa {}", i)),
                operation_type: Some("venta".to_string()),
                listed_price: Some(RawNumber::Number(300_000_000.0 + i as f64 * 10_000_000.0)),
                area: Some(RawNumber::Number(100.0)),
                ..Default::default()
            })
            .collect();
        ValuationPipeline::new()
            .run(&ValuationInput {
                target: TargetProperty::new(100.0),
                comparables,
                market: MarketSignals::default(),
            })
            .unwrap()
    }

    #[tokio::test]
    async fn test_writes_camel_case_json() {
        let dir = TempDir::new().unwrap();
        let output = JsonFileOutput::new(dir.path().join("reports"));
        let report = report();

        output.write_report(&report).await.unwrap();

        let path = output.report_path(&report);
        assert!(path.exists());
        let json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(json["runId"], serde_json::json!(report.run_id.to_string()));
        assert!(json["result"]["finalValue"].is_number());
        assert_eq!(json["stages"]["rangeStage"], "strict");
    }
}
