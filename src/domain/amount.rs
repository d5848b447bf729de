//! Lenient numeric coercion for amounts typed into forms or sent by the backend.
//!
//! Blank, missing, null, non-numeric and non-finite values never raise: amounts fall back
//! to `0.0` and forex rates fall back to `1.0`. Callers that care can inspect
//! [`Coercion::fallback`] to surface the substitution to the user.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};

pub const DEFAULT_FOREX_RATE: f64 = 1.0;

/// Why a raw value was replaced by its default.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FallbackReason {
    Blank,
    NotANumber(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Coercion {
    pub value: f64,
    pub fallback: Option<FallbackReason>,
}

impl Coercion {
    fn parsed(value: f64) -> Self {
        Self {
            value,
            fallback: None,
        }
    }

    fn defaulted(value: f64, reason: FallbackReason) -> Self {
        Self {
            value,
            fallback: Some(reason),
        }
    }
}

/// Parses a decimal. `_` may separate digits anywhere; `,` only groups thousands
/// (`1,250.75`), so a decimal comma such as `1,5` is rejected rather than read as `15`.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let cleaned: String = trimmed.chars().filter(|ch| *ch != '_').collect();
    let cleaned = strip_thousands_commas(&cleaned)?;
    cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Removes `,` from the integer part when every group after the first has exactly three digits.
fn strip_thousands_commas(text: &str) -> Option<String> {
    if !text.contains(',') {
        return Some(text.to_string());
    }
    let (sign, unsigned) = match text.strip_prefix(['-', '+']) {
        Some(rest) => (&text[..1], rest),
        None => ("", text),
    };
    let split = unsigned.find(['.', 'e', 'E']).unwrap_or(unsigned.len());
    let (integer, tail) = unsigned.split_at(split);
    if tail.contains(',') {
        return None;
    }
    let mut groups = integer.split(',');
    let first = groups.next()?;
    let digits = |group: &str| group.chars().all(|ch| ch.is_ascii_digit());
    if first.is_empty() || first.len() > 3 || !digits(first) {
        return None;
    }
    let mut joined = format!("{sign}{first}");
    for group in groups {
        if group.len() != 3 || !digits(group) {
            return None;
        }
        joined.push_str(group);
    }
    joined.push_str(tail);
    Some(joined)
}

pub fn coerce_amount(raw: &str) -> Coercion {
    coerce_with_default(raw, 0.0)
}

/// Forex rates default to `1.0`; a zero rate is treated as missing.
pub fn coerce_rate(raw: &str) -> Coercion {
    let coerced = coerce_with_default(raw, DEFAULT_FOREX_RATE);
    if coerced.fallback.is_none() && coerced.value == 0.0 {
        return Coercion::defaulted(DEFAULT_FOREX_RATE, FallbackReason::Blank);
    }
    coerced
}

/// VAT rates fall back to `default` (the order rate, or the configured one for orders).
pub fn coerce_percentage(raw: &str, default: f64) -> Coercion {
    coerce_with_default(raw, default)
}

fn coerce_with_default(raw: &str, default: f64) -> Coercion {
    if raw.trim().is_empty() {
        return Coercion::defaulted(default, FallbackReason::Blank);
    }
    match parse_amount(raw) {
        Some(value) => Coercion::parsed(value),
        None => Coercion::defaulted(default, FallbackReason::NotANumber(raw.trim().to_string())),
    }
}

/// Whole-number quantity; negatives clamp to zero and fractions truncate.
pub fn coerce_quantity(raw: &str) -> u32 {
    parse_amount(raw).map(quantity_from_f64).unwrap_or(0)
}

fn quantity_from_f64(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.trunc().min(u32::MAX as f64) as u32
    } else {
        0
    }
}

pub fn default_forex_rate() -> f64 {
    DEFAULT_FOREX_RATE
}

/// Serde helper: number, numeric string or null into an amount (`0.0` on anything else).
pub fn lenient_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserializer
        .deserialize_any(LenientNumber)?
        .unwrap_or(0.0))
}

/// Serde helper: like [`lenient_amount`] but missing or zero rates become `1.0`.
pub fn lenient_rate<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserializer
        .deserialize_any(LenientNumber)?
        .filter(|value| *value != 0.0)
        .unwrap_or(DEFAULT_FOREX_RATE))
}

pub fn lenient_quantity<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserializer
        .deserialize_any(LenientNumber)?
        .map(quantity_from_f64)
        .unwrap_or(0))
}

/// Serde helper for VAT flags stored as booleans, `0`/`1` or `"yes"`/`"no"` strings.
pub fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(LenientFlag)
}

/// Serde helper for optional percentages; unparsable values are treated as absent.
pub fn lenient_percentage<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(LenientNumber)
}

struct LenientNumber;

impl<'de> Visitor<'de> for LenientNumber {
    type Value = Option<f64>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a number, a numeric string or null")
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
        Ok(Some(value).filter(|v| v.is_finite()))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
        Ok(Some(value as f64))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
        Ok(Some(value as f64))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
        Ok(parse_amount(value))
    }

    fn visit_bool<E: de::Error>(self, _value: bool) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: de::SeqAccess<'de>,
    {
        while seq.next_element::<de::IgnoredAny>()?.is_some() {}
        Ok(None)
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: de::MapAccess<'de>,
    {
        while map
            .next_entry::<de::IgnoredAny, de::IgnoredAny>()?
            .is_some()
        {}
        Ok(None)
    }
}

struct LenientFlag;

impl<'de> Visitor<'de> for LenientFlag {
    type Value = bool;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a boolean flag")
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<Self::Value, E> {
        Ok(value)
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
        Ok(value != 0)
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
        Ok(value != 0)
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
        Ok(value != 0.0 && value.is_finite())
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
        Ok(matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "true" | "yes" | "y" | "1" | "on"
        ))
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(false)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(false)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde::Deserialize;

    use super::*;

    #[rstest]
    #[case("100", 100.0)]
    #[case(" 12.5 ", 12.5)]
    #[case("1,250.75", 1250.75)]
    #[case("12,345,678", 12345678.0)]
    #[case("-1,000", -1000.0)]
    #[case("1,5", 0.0)]
    #[case("1,23", 0.0)]
    #[case("1234,567", 0.0)]
    #[case("1,000.5,0", 0.0)]
    #[case("abc", 0.0)]
    #[case("", 0.0)]
    #[case("NaN", 0.0)]
    #[case("inf", 0.0)]
    fn amounts_coerce_to_zero_when_unreadable(#[case] raw: &str, #[case] expected: f64) {
        assert_eq!(coerce_amount(raw).value, expected);
    }

    #[rstest]
    #[case("", 1.0)]
    #[case("0", 1.0)]
    #[case("xyz", 1.0)]
    #[case("132.4", 132.4)]
    fn forex_rate_defaults_to_one(#[case] raw: &str, #[case] expected: f64) {
        assert_eq!(coerce_rate(raw).value, expected);
    }

    #[test]
    fn rejected_input_is_reported() {
        let coerced = coerce_amount("12abc");
        assert_eq!(coerced.value, 0.0);
        assert_eq!(
            coerced.fallback,
            Some(FallbackReason::NotANumber("12abc".to_string()))
        );

        assert_eq!(
            coerce_amount("1,5").fallback,
            Some(FallbackReason::NotANumber("1,5".to_string()))
        );

        let blank = coerce_amount("   ");
        assert_eq!(blank.fallback, Some(FallbackReason::Blank));
    }

    #[rstest]
    #[case("5", 13.0, 5.0, None)]
    #[case("", 13.0, 13.0, Some(FallbackReason::Blank))]
    #[case("5%", 13.0, 13.0, Some(FallbackReason::NotANumber("5%".to_string())))]
    fn percentages_fall_back_to_the_given_rate(
        #[case] raw: &str,
        #[case] default: f64,
        #[case] value: f64,
        #[case] fallback: Option<FallbackReason>,
    ) {
        assert_eq!(coerce_percentage(raw, default), Coercion { value, fallback });
    }

    #[rstest]
    #[case("3", 3)]
    #[case("2.9", 2)]
    #[case("-4", 0)]
    #[case("many", 0)]
    fn quantities_are_whole_and_non_negative(#[case] raw: &str, #[case] expected: u32) {
        assert_eq!(coerce_quantity(raw), expected);
    }

    #[derive(Deserialize)]
    struct LenientFields {
        #[serde(default, deserialize_with = "lenient_amount")]
        price: f64,
        #[serde(default = "default_forex_rate", deserialize_with = "lenient_rate")]
        forex_rate: f64,
        #[serde(default, deserialize_with = "lenient_flag")]
        vat: bool,
        #[serde(default, deserialize_with = "lenient_quantity")]
        quantity: u32,
    }

    #[test]
    fn json_fields_decode_leniently() {
        let fields: LenientFields = serde_json::from_str(
            r#"{"price": "abc", "forex_rate": null, "vat": "yes", "quantity": "7"}"#,
        )
        .unwrap();
        assert_eq!(fields.price, 0.0);
        assert_eq!(fields.forex_rate, 1.0);
        assert!(fields.vat);
        assert_eq!(fields.quantity, 7);

        let fields: LenientFields =
            serde_json::from_str(r#"{"price": 99.5, "vat": 0, "quantity": [1]}"#).unwrap();
        assert_eq!(fields.price, 99.5);
        assert_eq!(fields.forex_rate, 1.0);
        assert!(!fields.vat);
        assert_eq!(fields.quantity, 0);
    }
}
