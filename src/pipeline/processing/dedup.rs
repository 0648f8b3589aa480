use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::pipeline::processing::similarity::TextSimilarity;
use crate::types::Comparable;

/// Thresholds that decide when two listings are the same property posted twice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Relative price difference below which prices count as equal
    pub price_tolerance: f64,
    /// Relative area difference below which areas count as equal
    pub area_tolerance: f64,
    /// Minimum title similarity after diacritic folding
    pub title_similarity_threshold: f64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            price_tolerance: 0.01,
            area_tolerance: 0.01,
            title_similarity_threshold: 0.7,
        }
    }
}

/// First-seen-wins removal of near-duplicate comparables
pub struct Deduplicator {
    pub config: DedupConfig,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self {
            config: DedupConfig::default(),
        }
    }

    pub fn with_config(config: DedupConfig) -> Self {
        Self { config }
    }

    /// Keep arrival order; a listing is dropped when it duplicates any already accepted one
    pub fn deduplicate(&self, comparables: Vec<Comparable>) -> Vec<Comparable> {
        let received = comparables.len();
        let mut accepted: Vec<(Comparable, String)> = Vec::with_capacity(received);

        for candidate in comparables {
            let title = TextSimilarity::normalize_title(&candidate.title);
            let duplicate_of = accepted
                .iter()
                .position(|(existing, existing_title)| {
                    self.is_duplicate(existing, existing_title, &candidate, &title)
                });

            match duplicate_of {
                Some(position) => {
                    debug!(
                        title = candidate.title.as_str(),
                        kept = accepted[position].0.title.as_str(),
                        "Removed duplicate comparable"
                    );
                }
                None => accepted.push((candidate, title)),
            }
        }

        debug!(received, kept = accepted.len(), "Deduplication finished");
        accepted.into_iter().map(|(comparable, _)| comparable).collect()
    }

    fn is_duplicate(
        &self,
        existing: &Comparable,
        existing_title: &str,
        candidate: &Comparable,
        candidate_title: &str,
    ) -> bool {
        within_tolerance(
            existing.estimated_sale_price,
            candidate.estimated_sale_price,
            self.config.price_tolerance,
        ) && within_tolerance(existing.area, candidate.area, self.config.area_tolerance)
            && TextSimilarity::similarity(existing_title, candidate_title)
                >= self.config.title_similarity_threshold
    }
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new()
    }
}

/// Relative difference against the already accepted value; a non-positive reference never matches
fn within_tolerance(reference: f64, value: f64, tolerance: f64) -> bool {
    reference > 0.0 && ((value - reference).abs() / reference) < tolerance
}
