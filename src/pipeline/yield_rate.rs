use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{ANNUAL_YIELD_PATTERN, MONTHLY_YIELD_PATTERN};
use crate::types::{RawNumber, YieldRate};

static RATE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(\d+(?:[.,]\d+)?)\s*(%)?").ok());
// Parentheses, semicolons, ", " and joining words separate one stated rate from the next
static CLAUSE_BREAK: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"[()\[\];|]|,\s|\s(?:y|o|and|or)\s").ok());
static ANNUAL_MARKER: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(ANNUAL_YIELD_PATTERN).ok());
static MONTHLY_MARKER: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(MONTHLY_YIELD_PATTERN).ok());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Period {
    Monthly,
    Annual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YieldRateConfig {
    /// Monthly yield used when the market narrative gives none (0.5%)
    pub default_monthly: f64,
    /// Highest monthly yield taken at face value; bare numbers above it are read as percentages
    pub max_monthly: f64,
}

impl Default for YieldRateConfig {
    fn default() -> Self {
        Self {
            default_monthly: 0.005,
            max_monthly: 0.05,
        }
    }
}

/// Resolve the monthly yield of a run from whatever the narrative extraction surfaced.
///
/// Accepts fractions (`0.005`), percentages (`"0,5 %"`, `0.5`) and annual rates
/// (`"6% anual"`). Anything unreadable or implausible falls back to the configured default.
pub fn resolve_yield_rate(raw: Option<&RawNumber>, config: &YieldRateConfig) -> YieldRate {
    let fallback = YieldRate::fallback(config.default_monthly);

    let Some(raw) = raw else {
        debug!(value = fallback.value, "No yield in market data, using default");
        return fallback;
    };

    let resolved = match raw {
        RawNumber::Number(value) => to_monthly(*value, false, Period::Monthly, config),
        RawNumber::Text(text) => parse_text(text, config),
        RawNumber::Other(_) => None,
    };

    match resolved {
        Some(value) if value > 0.0 && value <= config.max_monthly => {
            debug!(value, "Using market yield");
            YieldRate::market(value)
        }
        other => {
            debug!(
                raw = ?raw,
                resolved = ?other,
                default = fallback.value,
                "Market yield unreadable or implausible, using default"
            );
            fallback
        }
    }
}

/// Reads the first rate in the text. Its `%` sign and period come from the clause that
/// holds it, so a second rate quoted alongside ("0,5% mensual (6% anual)") is ignored.
fn parse_text(text: &str, config: &YieldRateConfig) -> Option<f64> {
    let lowered = text.to_lowercase();
    let rate = RATE.as_ref()?;
    let clause_break = CLAUSE_BREAK.as_ref()?;

    let (clause, captures) = clause_break
        .split(&lowered)
        .find_map(|clause| rate.captures(clause).map(|captures| (clause, captures)))?;
    let number = captures.get(1)?;
    let value = number.as_str().replace(',', ".").parse::<f64>().ok()?;
    let percent = captures.get(2).is_some();
    let period = period_of(clause, number.start(), number.end());

    to_monthly(value, percent, period, config)
}

/// Period word closest to the number within its clause; monthly when none is given
fn period_of(clause: &str, start: usize, end: usize) -> Period {
    let distance = |marker: &Lazy<Option<Regex>>| {
        marker.as_ref().and_then(|regex| {
            regex
                .find_iter(clause)
                .map(|m| {
                    if m.start() >= end {
                        m.start() - end
                    } else {
                        start.saturating_sub(m.end())
                    }
                })
                .min()
        })
    };

    match (distance(&ANNUAL_MARKER), distance(&MONTHLY_MARKER)) {
        (Some(annual), Some(monthly)) if annual < monthly => Period::Annual,
        (Some(_), None) => Period::Annual,
        _ => Period::Monthly,
    }
}

/// Normalize to a monthly fraction. Without a `%` sign, values too large to be a
/// fraction for their period are taken as percentages.
fn to_monthly(value: f64, percent: bool, period: Period, config: &YieldRateConfig) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }
    let annual = period == Period::Annual;
    let period_max = if annual {
        config.max_monthly * 12.0
    } else {
        config.max_monthly
    };

    let fraction = if percent || value > period_max {
        value / 100.0
    } else {
        value
    };

    Some(if annual { fraction / 12.0 } else { fraction })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::YieldOrigin;

    fn resolve(raw: RawNumber) -> YieldRate {
        resolve_yield_rate(Some(&raw), &YieldRateConfig::default())
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-12, "{} != {}", actual, expected);
    }

    #[test]
    fn test_absent_yield_falls_back() {
        let rate = resolve_yield_rate(None, &YieldRateConfig::default());
        assert_eq!(rate, YieldRate::fallback(0.005));
    }

    #[test]
    fn test_monthly_fraction_and_percentages() {
        let rate = resolve(RawNumber::Number(0.004));
        assert_eq!(rate.origin, YieldOrigin::Market);
        assert_close(rate.value, 0.004);

        assert_close(resolve(RawNumber::Number(0.6)).value, 0.006);
        assert_close(resolve("0,45 %".into()).value, 0.0045);
        assert_close(resolve("rentabilidad mensual de 0.5%".into()).value, 0.005);
    }

    #[test]
    fn test_annual_rates_are_divided() {
        assert_close(resolve("6% anual".into()).value, 0.005);
        assert_close(resolve("6,6 E.A.".into()).value, 0.0055);
        assert_close(resolve("0.06 annual".into()).value, 0.005);
    }

    #[test]
    fn test_period_comes_from_the_rate_it_qualifies() {
        let monthly = resolve("0,5% mensual (6% anual)".into());
        assert_eq!(monthly.origin, YieldOrigin::Market);
        assert_close(monthly.value, 0.005);

        assert_close(resolve("0,5% mensual y 6% anual".into()).value, 0.005);
        assert_close(resolve("6% anual (0,5% mensual)".into()).value, 0.005);
        assert_close(resolve("0,4% mensual, equivalente a 4,8% anual".into()).value, 0.004);
        // an unqualified rate is monthly even when an annual one follows
        assert_close(resolve("0,5% (6% e.a.)".into()).value, 0.005);
    }

    #[test]
    fn test_annual_markers_match_whole_words_only() {
        assert_close(resolve("0,5% mensual según tamaño del inmueble".into()).value, 0.005);
        assert_close(resolve("0,45% con baño privado".into()).value, 0.0045);
        assert_close(resolve("0,5% sin daño".into()).value, 0.005);
        assert_close(resolve("rentabilidad de 6% al año".into()).value, 0.005);
    }

    #[test]
    fn test_percent_sign_belongs_to_its_own_number() {
        // 0.004 is already a fraction; the % belongs to the annual rate
        assert_close(resolve("0.004 mensual (4,8% anual)".into()).value, 0.004);
    }

    #[test]
    fn test_unreadable_or_implausible_falls_back() {
        assert_eq!(resolve("no disponible".into()).origin, YieldOrigin::Fallback);
        assert_eq!(resolve(RawNumber::Number(0.0)).origin, YieldOrigin::Fallback);
        assert_eq!(resolve(RawNumber::Number(-0.01)).origin, YieldOrigin::Fallback);
        // 8% per month is not a plausible rent yield
        assert_eq!(resolve("8%".into()).origin, YieldOrigin::Fallback);
    }
}
