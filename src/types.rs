use crate::constants;
use crate::error::{Result, ValuationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// A numeric field exactly as the extraction layer hands it in.
///
/// LLM output mixes JSON numbers with strings like `"$ 450.000.000"` or `"85,5 m²"`,
/// so every numeric input is accepted in either shape and cleaned by the sanitizer.
/// Any other JSON shape is kept as `Other` and reads as no value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl From<f64> for RawNumber {
    fn from(value: f64) -> Self {
        RawNumber::Number(value)
    }
}

impl From<&str> for RawNumber {
    fn from(value: &str) -> Self {
        RawNumber::Text(value.to_string())
    }
}

impl From<String> for RawNumber {
    fn from(value: String) -> Self {
        RawNumber::Text(value)
    }
}

/// Intended use of a lot (terreno)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotUse {
    Residential,
    Commercial,
    Industrial,
    Agricultural,
    Mixed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub neighborhood: Option<String>,
    pub municipality: Option<String>,
}

/// The subject of the appraisal. Immutable for the duration of one valuation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetProperty {
    /// Built or lot area in m²
    pub area: f64,
    #[serde(default)]
    pub is_lot: bool,
    /// Only meaningful when `is_lot` is set
    #[serde(default)]
    pub lot_use: Option<LotUse>,
    #[serde(default)]
    pub location: Location,
}

impl TargetProperty {
    pub fn new(area: f64) -> Self {
        Self {
            area,
            is_lot: false,
            lot_use: None,
            location: Location::default(),
        }
    }

    pub fn lot(area: f64, lot_use: Option<LotUse>) -> Self {
        Self {
            area,
            is_lot: true,
            lot_use,
            location: Location::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.area.is_finite() || self.area <= 0.0 {
            return Err(ValuationError::InvalidTarget(format!(
                "area must be a positive number of m², got {}",
                self.area
            )));
        }
        if self.lot_use.is_some() && !self.is_lot {
            return Err(ValuationError::InvalidTarget(
                "lotUse is only allowed when isLot is set".to_string(),
            ));
        }
        Ok(())
    }

    /// Lots above `threshold` m² get the cascading area band
    pub fn is_large_lot(&self, threshold: f64) -> bool {
        self.is_lot && self.area > threshold
    }
}

/// How the extraction layer says a comparable was sourced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceValidation {
    #[default]
    PortalVerified,
    ZoneSimilar,
    ZoneEstimate,
    MunicipalAverage,
}

impl SourceValidation {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().as_str() {
            constants::TAG_PORTAL_VERIFIED => Some(SourceValidation::PortalVerified),
            constants::TAG_ZONE_SIMILAR => Some(SourceValidation::ZoneSimilar),
            constants::TAG_ZONE_ESTIMATE => Some(SourceValidation::ZoneEstimate),
            constants::TAG_MUNICIPAL_AVERAGE => Some(SourceValidation::MunicipalAverage),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceValidation::PortalVerified => constants::TAG_PORTAL_VERIFIED,
            SourceValidation::ZoneSimilar => constants::TAG_ZONE_SIMILAR,
            SourceValidation::ZoneEstimate => constants::TAG_ZONE_ESTIMATE,
            SourceValidation::MunicipalAverage => constants::TAG_MUNICIPAL_AVERAGE,
        }
    }

    /// Estimate-derived sources (not an actual listing)
    pub fn is_estimate(&self) -> bool {
        matches!(
            self,
            SourceValidation::ZoneEstimate | SourceValidation::MunicipalAverage
        )
    }
}

/// One listing exactly as extracted. Untrusted: nothing is validated yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawComparable {
    #[serde(deserialize_with = "lenient_text")]
    pub title: Option<String>,
    /// Free text, expected to contain "venta" or "arriendo"
    #[serde(deserialize_with = "lenient_text")]
    pub operation_type: Option<String>,
    pub listed_price: Option<RawNumber>,
    pub area: Option<RawNumber>,
    pub rooms: Option<RawNumber>,
    pub bathrooms: Option<RawNumber>,
    #[serde(deserialize_with = "lenient_text")]
    pub neighborhood: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub municipality: Option<String>,
    /// Portal name
    #[serde(deserialize_with = "lenient_text")]
    pub source: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub source_validation: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub note: Option<String>,
}

/// Strings pass, numbers become their text, any other shape is treated as absent
fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(text) => Some(text),
        serde_json::Value::Number(number) => Some(number.to_string()),
        _ => None,
    })
}

/// A listing that is not even a JSON object becomes an empty one, which normalization drops.
/// Positions in the list are preserved.
fn lenient_comparables<'de, D>(
    deserializer: D,
) -> std::result::Result<Vec<RawComparable>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<serde_json::Value>::deserialize(deserializer)?;
    Ok(values
        .into_iter()
        .map(|value| serde_json::from_value(value).unwrap_or_default())
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Sale,
    Rental,
}

/// A typed, sanitized comparable.
///
/// Invariant: `area > 0` and `estimated_sale_price > 0`; the normalizer drops anything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparable {
    pub title: String,
    pub operation_kind: OperationKind,
    pub area: f64,
    pub listed_price: f64,
    /// `listed_price` for sales, capitalized rent for rentals
    pub estimated_sale_price: f64,
    pub price_per_area: f64,
    /// Monthly canon, only set for rentals
    pub monthly_yield: Option<f64>,
    pub source_validation: SourceValidation,
    pub note: Option<String>,
    pub rooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub neighborhood: Option<String>,
    pub municipality: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YieldOrigin {
    /// Read from the extracted market narrative
    Market,
    /// Configured default
    Fallback,
}

/// Monthly gross rental yield used to capitalize rents
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YieldRate {
    pub value: f64,
    pub origin: YieldOrigin,
}

impl YieldRate {
    pub fn market(value: f64) -> Self {
        Self {
            value,
            origin: YieldOrigin::Market,
        }
    }

    pub fn fallback(value: f64) -> Self {
        Self {
            value,
            origin: YieldOrigin::Fallback,
        }
    }
}

/// What the narrative extraction surfaced besides the listings. All values are unclean.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarketSignals {
    pub yield_rate: Option<RawNumber>,
    /// Explicit value recommended by the narrative; overrides the computed one
    pub recommended_value: Option<RawNumber>,
    pub range_min: Option<RawNumber>,
    pub range_max: Option<RawNumber>,
    /// Reference price per m² for the zone, enables the price band of the range filter
    pub zone_price_per_area: Option<RawNumber>,
}

/// What an extraction source returns for one target
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractionOutput {
    #[serde(deserialize_with = "lenient_comparables")]
    pub comparables: Vec<RawComparable>,
    pub market: MarketSignals,
}

/// Everything one valuation run needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationInput {
    pub target: TargetProperty,
    #[serde(default, deserialize_with = "lenient_comparables")]
    pub comparables: Vec<RawComparable>,
    #[serde(default)]
    pub market: MarketSignals,
}

impl ValuationInput {
    pub fn from_extraction(target: TargetProperty, extraction: ExtractionOutput) -> Self {
        Self {
            target,
            comparables: extraction.comparables,
            market: extraction.market,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalValueSource {
    LlmRecommended,
    Computed,
}

impl FinalValueSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinalValueSource::LlmRecommended => "llm_recommended",
            FinalValueSource::Computed => "computed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RentabilitySource {
    /// Averaged from real rental comparables
    Comparables,
    /// No rentals available, mirrored from the direct-sale value
    SyntheticFromDirect,
    /// Lots, or nothing to derive it from
    NotApplicable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::Low => "low",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::High => "high",
        }
    }
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceBreakdown {
    pub portal_verified: usize,
    pub zone_similar: usize,
    pub zone_estimate: usize,
    pub municipal_average: usize,
}

impl SourceBreakdown {
    pub fn tally<'a>(comparables: impl IntoIterator<Item = &'a Comparable>) -> Self {
        let mut breakdown = Self::default();
        for comparable in comparables {
            match comparable.source_validation {
                SourceValidation::PortalVerified => breakdown.portal_verified += 1,
                SourceValidation::ZoneSimilar => breakdown.zone_similar += 1,
                SourceValidation::ZoneEstimate => breakdown.zone_estimate += 1,
                SourceValidation::MunicipalAverage => breakdown.municipal_average += 1,
            }
        }
        breakdown
    }

    pub fn total(&self) -> usize {
        self.portal_verified + self.zone_similar + self.zone_estimate + self.municipal_average
    }

    /// Comparables derived from zone or municipal estimates rather than listings
    pub fn estimates(&self) -> usize {
        self.zone_estimate + self.municipal_average
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceReport {
    pub level: ConfidenceLevel,
    pub quality_score: f64,
    pub dispersion_coefficient: f64,
    pub dispersion_high: bool,
    pub source_breakdown: SourceBreakdown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationResult {
    pub direct_sale_value: Option<f64>,
    pub rentability_value: Option<f64>,
    pub final_value: f64,
    pub final_value_source: FinalValueSource,
    pub range_min: f64,
    pub range_max: f64,
    pub price_per_area_used: f64,
    /// Average monthly canon behind the rentability value (synthetic when mirrored)
    pub average_canon: Option<f64>,
    pub rentability_source: RentabilitySource,
    pub confidence: ConfidenceReport,
}

/// Which band the range filter settled on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeStage {
    Strict,
    Relaxed,
    Unfiltered,
}

impl RangeStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RangeStage::Strict => "strict",
            RangeStage::Relaxed => "relaxed",
            RangeStage::Unfiltered => "unfiltered",
        }
    }
}

/// List sizes as they flow through the stages of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageCounts {
    pub received: usize,
    pub normalized: usize,
    pub deduplicated: usize,
    pub in_range: usize,
    pub range_stage: RangeStage,
    pub outlier_filter_committed: bool,
    pub final_count: usize,
}

/// Result of a complete valuation run, handed back to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationReport {
    pub run_id: Uuid,
    pub valued_at: DateTime<Utc>,
    pub target: TargetProperty,
    pub yield_rate: YieldRate,
    pub result: ValuationResult,
    /// Final comparable set the value was computed from
    pub comparables: Vec<Comparable>,
    pub stages: StageCounts,
}
