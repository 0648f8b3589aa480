use tracing::debug;

use crate::constants::{RENTAL_KEYWORD, SALE_KEYWORD};
use crate::pipeline::processing::sanitize::{float_field, integer_field};
use crate::types::{
    Comparable, OperationKind, RawComparable, SourceValidation, TargetProperty, YieldRate,
};

/// Why a raw listing did not make it into the comparable set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    /// Area missing, unreadable or not positive
    InvalidArea,
    /// No positive sale price could be established
    InvalidPrice,
    /// Rentals say nothing about the value of a lot
    RentalForLot,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::InvalidArea => "invalid_area",
            DropReason::InvalidPrice => "invalid_price",
            DropReason::RentalForLot => "rental_for_lot",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NormalizationOutcome {
    /// Typed comparables, in arrival order
    pub comparables: Vec<Comparable>,
    /// Position in the raw list and reason for every discarded listing
    pub dropped: Vec<(usize, DropReason)>,
}

/// Converts raw extracted listings into typed comparables for one target.
///
/// Rentals are capitalized into an estimated sale price with the run's monthly yield.
pub struct ComparableNormalizer {
    is_lot: bool,
    yield_rate: f64,
}

impl ComparableNormalizer {
    pub fn new(target: &TargetProperty, yield_rate: &YieldRate) -> Self {
        Self {
            is_lot: target.is_lot,
            yield_rate: yield_rate.value,
        }
    }

    pub fn normalize(&self, raw: &[RawComparable]) -> NormalizationOutcome {
        let mut outcome = NormalizationOutcome::default();

        for (index, listing) in raw.iter().enumerate() {
            match self.normalize_one(listing) {
                Ok(comparable) => outcome.comparables.push(comparable),
                Err(reason) => {
                    debug!(
                        index,
                        title = listing.title.as_deref().unwrap_or(""),
                        reason = reason.as_str(),
                        "Dropped raw comparable"
                    );
                    outcome.dropped.push((index, reason));
                }
            }
        }

        debug!(
            received = raw.len(),
            kept = outcome.comparables.len(),
            "Normalization finished"
        );
        outcome
    }

    pub fn normalize_one(&self, raw: &RawComparable) -> Result<Comparable, DropReason> {
        let area = float_field(raw.area.as_ref()).unwrap_or(0.0);
        let listed_price = integer_field(raw.listed_price.as_ref()).unwrap_or(0.0);
        let operation_kind = classify_operation(raw.operation_type.as_deref());

        if self.is_lot && operation_kind == OperationKind::Rental {
            return Err(DropReason::RentalForLot);
        }

        let estimated_sale_price = match operation_kind {
            OperationKind::Sale => listed_price,
            OperationKind::Rental if listed_price > 0.0 && self.yield_rate > 0.0 => {
                (listed_price / self.yield_rate).round()
            }
            OperationKind::Rental => 0.0,
        };

        if area <= 0.0 {
            return Err(DropReason::InvalidArea);
        }
        if estimated_sale_price <= 0.0 {
            return Err(DropReason::InvalidPrice);
        }

        let price_per_area = (estimated_sale_price / area).round();

        let source_validation = match raw.source_validation.as_deref() {
            Some(tag) => SourceValidation::from_tag(tag).unwrap_or_else(|| {
                debug!(tag, "Unknown source validation tag, treating as portal_verified");
                SourceValidation::default()
            }),
            None => SourceValidation::default(),
        };

        Ok(Comparable {
            title: raw.title.as_deref().unwrap_or("").trim().to_string(),
            operation_kind,
            area,
            listed_price,
            estimated_sale_price,
            price_per_area,
            monthly_yield: (operation_kind == OperationKind::Rental).then_some(listed_price),
            source_validation,
            note: raw.note.clone(),
            rooms: integer_field(raw.rooms.as_ref()).and_then(to_count),
            bathrooms: integer_field(raw.bathrooms.as_ref()).and_then(to_count),
            neighborhood: raw.neighborhood.clone(),
            municipality: raw.municipality.clone(),
            source: raw.source.clone(),
        })
    }
}

/// Rental when the operation text mentions "arriendo", sale otherwise
pub fn classify_operation(operation_type: Option<&str>) -> OperationKind {
    let text = operation_type.unwrap_or("").to_lowercase();
    if text.contains(RENTAL_KEYWORD) {
        OperationKind::Rental
    } else {
        if !text.contains(SALE_KEYWORD) {
            debug!(operation_type = text.as_str(), "No operation keyword, assuming sale");
        }
        OperationKind::Sale
    }
}

fn to_count(value: f64) -> Option<u32> {
    (value > 0.0 && value <= u32::MAX as f64).then(|| value.round() as u32)
}
