/// Keyword and tag constants shared across the pipeline stages.
/// Extracted listings are written in Spanish, so the operation keywords are too.

// Operation type keywords (matched case-insensitively)
pub const RENTAL_KEYWORD: &str = "arriendo";
pub const SALE_KEYWORD: &str = "venta";

// Source validation tags as emitted by the extraction layer
pub const TAG_PORTAL_VERIFIED: &str = "portal_verified";
pub const TAG_ZONE_SIMILAR: &str = "zone_similar";
pub const TAG_ZONE_ESTIMATE: &str = "zone_estimate";
pub const TAG_MUNICIPAL_AVERAGE: &str = "municipal_average";

// Period words in extracted yield text, matched as whole words next to the rate they qualify
pub const ANNUAL_YIELD_PATTERN: &str = r"\b(?:anual(?:es)?|annual(?:ly)?|años?|yearly|e\.a)\b";
pub const MONTHLY_YIELD_PATTERN: &str = r"\b(?:mensual(?:es)?|mes(?:es)?|monthly|month)\b";

/// Get all supported source validation tags
pub fn get_supported_validation_tags() -> Vec<&'static str> {
    vec![
        TAG_PORTAL_VERIFIED,
        TAG_ZONE_SIMILAR,
        TAG_ZONE_ESTIMATE,
        TAG_MUNICIPAL_AVERAGE,
    ]
}
