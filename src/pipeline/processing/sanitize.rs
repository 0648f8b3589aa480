use crate::types::RawNumber;

/// Turns the unclean numeric values of the extraction layer into plain numbers.
///
/// Nothing here fails: anything that cannot be read as a number becomes `None`.
pub struct NumericSanitizer;

impl NumericSanitizer {
    /// Integer-like values such as prices (`"$ 450.000.000"`, `"1,200,000 COP"`).
    ///
    /// Text keeps only its ASCII digits, so thousands separators of any locale vanish.
    /// Text results must be positive.
    pub fn sanitize_integer(input: &RawNumber) -> Option<f64> {
        match input {
            RawNumber::Number(value) => value.is_finite().then_some(*value),
            RawNumber::Text(text) => {
                let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
                if digits.is_empty() {
                    return None;
                }
                let value = digits.parse::<u64>().ok()? as f64;
                (value.is_finite() && value > 0.0).then_some(value)
            }
            RawNumber::Other(_) => None,
        }
    }

    /// Decimal values such as areas (`"85,5 m²"`). A comma is read as the decimal separator.
    /// Zero is a valid result.
    pub fn sanitize_float(input: &RawNumber) -> Option<f64> {
        match input {
            RawNumber::Number(value) => value.is_finite().then_some(*value),
            RawNumber::Text(text) => {
                let cleaned: String = text
                    .replace(',', ".")
                    .chars()
                    .filter(|c| c.is_ascii_digit() || *c == '.')
                    .collect();
                cleaned
                    .parse::<f64>()
                    .ok()
                    .filter(|value| value.is_finite())
            }
            RawNumber::Other(_) => None,
        }
    }
}

/// `sanitize_integer` over an optional field
pub fn integer_field(input: Option<&RawNumber>) -> Option<f64> {
    input.and_then(NumericSanitizer::sanitize_integer)
}

/// `sanitize_float` over an optional field
pub fn float_field(input: Option<&RawNumber>) -> Option<f64> {
    input.and_then(NumericSanitizer::sanitize_float)
}
