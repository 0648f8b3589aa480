use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::app::ports::ExtractionSource;
use crate::types::{ExtractionOutput, TargetProperty, ValuationInput};

/// Reads a valuation request (`target`, `comparables`, `market`) from a JSON file.
///
/// Stands in for the LLM extraction calls: the file holds what they would have returned.
/// The file is read and parsed once; `extract` serves the comparables of that same request.
pub struct JsonFileSource {
    path: PathBuf,
    name: String,
    request: OnceCell<ValuationInput>,
}

impl JsonFileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = format!("json_file:{}", path.display());
        Self {
            path,
            name,
            request: OnceCell::new(),
        }
    }

    /// The full request, target included
    pub async fn load_request(&self) -> Result<&ValuationInput> {
        self.request.get_or_try_init(|| self.read_request()).await
    }

    async fn read_request(&self) -> Result<ValuationInput> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("Invalid valuation request in {}", self.path.display()))
    }
}

#[async_trait]
impl ExtractionSource for JsonFileSource {
    fn source_name(&self) -> &str {
        &self.name
    }

    async fn extract(&self, target: &TargetProperty) -> Result<ExtractionOutput> {
        let request = self.load_request().await?;
        let output = ExtractionOutput {
            comparables: request.comparables.clone(),
            market: request.market.clone(),
        };
        debug!(
            target_area = target.area,
            comparables = output.comparables.len(),
            "Serving extraction output from request file"
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawNumber;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const REQUEST: &str = r#"{
        "target": { "area": 70, "location": { "neighborhood": "Laureles" } },
        "comparables": [
            { "title": "Apto Laureles", "operationType": "Venta", "listedPrice": "$ 210.000.000", "area": "70" },
            { "title": "Apto Estadio", "operationType": "Arriendo", "listedPrice": 1100000, "area": 72 }
        ],
        "market": { "yieldRate": "0,5% mensual" }
    }"#;

    fn request_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(REQUEST.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_load_request() {
        let file = request_file();
        let source = JsonFileSource::new(file.path());
        let request = source.load_request().await.unwrap();

        assert_eq!(request.target.area, 70.0);
        assert_eq!(request.target.location.neighborhood.as_deref(), Some("Laureles"));
        assert_eq!(request.comparables.len(), 2);
        assert_eq!(
            request.market.yield_rate,
            Some(RawNumber::Text("0,5% mensual".to_string()))
        );
    }

    #[tokio::test]
    async fn test_file_is_read_once() {
        let file = request_file();
        let source = JsonFileSource::new(file.path());
        let target = source.load_request().await.unwrap().target.clone();

        let path = file.path().to_path_buf();
        drop(file);
        assert!(!path.exists());

        let output = source.extract(&target).await.unwrap();
        assert_eq!(output.comparables.len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_listing_fields_do_not_reject_request() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            br#"{
                "target": { "area": 70 },
                "comparables": [
                    { "title": "Apto Laureles", "operationType": "Venta", "listedPrice": {"v": 1}, "area": 70, "rooms": true },
                    { "title": "Apto Estadio", "operationType": "Venta", "listedPrice": 224000000, "area": 70, "rooms": "3" },
                    42
                ]
            }"#,
        )
        .unwrap();

        let source = JsonFileSource::new(file.path());
        let request = source.load_request().await.unwrap();
        assert_eq!(request.comparables.len(), 3);

        let target = request.target.clone();
        let yield_rate = crate::types::YieldRate::fallback(0.005);
        let outcome = crate::pipeline::processing::ComparableNormalizer::new(&target, &yield_rate)
            .normalize(&request.comparables);

        assert_eq!(outcome.comparables.len(), 1);
        assert_eq!(outcome.comparables[0].rooms, Some(3));
        assert_eq!(outcome.dropped.len(), 2);
    }

    #[tokio::test]
    async fn test_extract_serves_request_listings() {
        let file = request_file();
        let source = JsonFileSource::new(file.path());
        let output = source.extract(&TargetProperty::new(70.0)).await.unwrap();

        assert_eq!(output.comparables.len(), 2);
        assert!(source.source_name().starts_with("json_file:"));
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let source = JsonFileSource::new("/nonexistent/avaluo/request.json");
        assert!(source.load_request().await.is_err());
    }
}
