//! Conversion of raw form fields into numbers.
//!
//! Car inputs arrive as the strings a user typed. The default policy is
//! permissive: anything empty or unparsable counts as zero. A strict parser is
//! available for callers that want to reject bad input instead; the engines do
//! not care which one produced their numbers.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use std::convert::Infallible;
use std::str::FromStr;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InputError {
    #[error("{field}: '{value}' is not a number")]
    InvalidNumber { field: &'static str, value: String },
}

pub trait FieldParser {
    type Error;

    fn parse(&self, field: &'static str, raw: &str) -> Result<Decimal, Self::Error>;
}

/// Empty or invalid values become zero, never fails
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOrZero;

/// Empty values become zero, invalid values are an error
#[derive(Debug, Clone, Copy, Default)]
pub struct Strict;

impl FieldParser for ParseOrZero {
    type Error = Infallible;

    fn parse(&self, _field: &'static str, raw: &str) -> Result<Decimal, Infallible> {
        Ok(parse_or_zero(raw))
    }
}

impl FieldParser for Strict {
    type Error = InputError;

    fn parse(&self, field: &'static str, raw: &str) -> Result<Decimal, InputError> {
        if raw.trim().is_empty() {
            return Ok(Decimal::ZERO);
        }
        parse_number(raw).ok_or_else(|| InputError::InvalidNumber {
            field,
            value: raw.to_string(),
        })
    }
}

/// Parse a plain or scientific-notation number, `None` if empty or invalid
pub fn parse_number(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

pub fn parse_or_zero(raw: &str) -> Decimal {
    parse_number(raw).unwrap_or(Decimal::ZERO)
}

/// Accept either a string or a bare number for a raw input field, keeping it
/// as text so the chosen [`FieldParser`] decides what it means.
pub fn deserialize_raw<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(Decimal),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

/// Optional variant of [`deserialize_raw`]; `null` stays `None`
pub fn deserialize_raw_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "deserialize_raw")] String);

    Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|Wrapper(s)| s))
}
