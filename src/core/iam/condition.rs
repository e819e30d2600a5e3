//! Built-in condition operators for IAM policies
//!
//! Operator families:
//! - String operations (Equals, NotEquals, EqualsIgnoreCase, Like, ...)
//! - Numeric operations (Equals, LessThan, GreaterThan, ...)
//! - Date operations (timestamps or RFC 3339 / ISO 8601 strings)
//! - Binary (base64 expected value against a byte buffer)
//! - Bool, Null, IpAddress / NotIpAddress
//!
//! Every operator is a pure predicate over `(actual, expected)` and returns
//! `false` on type mismatches or unparsable operands.

use super::{PatternCache, PatternMatcher, Value};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// Built-in condition operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinOperator {
    NumericEquals,
    NumericNotEquals,
    NumericLessThan,
    NumericLessThanEquals,
    NumericGreaterThan,
    NumericGreaterThanEquals,
    DateEquals,
    DateNotEquals,
    DateLessThan,
    DateLessThanEquals,
    DateGreaterThan,
    DateGreaterThanEquals,
    BinaryEquals,
    BinaryNotEquals,
    /// `true` requires the key to be absent, `false` requires it present
    Null,
    IpAddress,
    NotIpAddress,
    /// String equals (case-sensitive)
    StringEquals,
    StringNotEquals,
    StringEqualsIgnoreCase,
    StringNotEqualsIgnoreCase,
    /// String matches pattern (supports `*` and `?` wildcards)
    StringLike,
    StringNotLike,
    Bool,
}

/// Ordering test shared by the numeric and date families
#[derive(Debug, Clone, Copy)]
enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    fn apply<T: PartialOrd>(self, a: T, b: T) -> bool {
        match self {
            Comparison::Eq => a == b,
            Comparison::Ne => a != b,
            Comparison::Lt => a < b,
            Comparison::Le => a <= b,
            Comparison::Gt => a > b,
            Comparison::Ge => a >= b,
        }
    }
}

impl BuiltinOperator {
    /// Every built-in operator
    pub const ALL: [BuiltinOperator; 24] = [
        BuiltinOperator::NumericEquals,
        BuiltinOperator::NumericNotEquals,
        BuiltinOperator::NumericLessThan,
        BuiltinOperator::NumericLessThanEquals,
        BuiltinOperator::NumericGreaterThan,
        BuiltinOperator::NumericGreaterThanEquals,
        BuiltinOperator::DateEquals,
        BuiltinOperator::DateNotEquals,
        BuiltinOperator::DateLessThan,
        BuiltinOperator::DateLessThanEquals,
        BuiltinOperator::DateGreaterThan,
        BuiltinOperator::DateGreaterThanEquals,
        BuiltinOperator::BinaryEquals,
        BuiltinOperator::BinaryNotEquals,
        BuiltinOperator::Null,
        BuiltinOperator::IpAddress,
        BuiltinOperator::NotIpAddress,
        BuiltinOperator::StringEquals,
        BuiltinOperator::StringNotEquals,
        BuiltinOperator::StringEqualsIgnoreCase,
        BuiltinOperator::StringNotEqualsIgnoreCase,
        BuiltinOperator::StringLike,
        BuiltinOperator::StringNotLike,
        BuiltinOperator::Bool,
    ];

    /// Operator name as written in policy documents
    pub fn name(self) -> &'static str {
        match self {
            BuiltinOperator::NumericEquals => "NumericEquals",
            BuiltinOperator::NumericNotEquals => "NumericNotEquals",
            BuiltinOperator::NumericLessThan => "NumericLessThan",
            BuiltinOperator::NumericLessThanEquals => "NumericLessThanEquals",
            BuiltinOperator::NumericGreaterThan => "NumericGreaterThan",
            BuiltinOperator::NumericGreaterThanEquals => "NumericGreaterThanEquals",
            BuiltinOperator::DateEquals => "DateEquals",
            BuiltinOperator::DateNotEquals => "DateNotEquals",
            BuiltinOperator::DateLessThan => "DateLessThan",
            BuiltinOperator::DateLessThanEquals => "DateLessThanEquals",
            BuiltinOperator::DateGreaterThan => "DateGreaterThan",
            BuiltinOperator::DateGreaterThanEquals => "DateGreaterThanEquals",
            BuiltinOperator::BinaryEquals => "BinaryEquals",
            BuiltinOperator::BinaryNotEquals => "BinaryNotEquals",
            BuiltinOperator::Null => "Null",
            BuiltinOperator::IpAddress => "IpAddress",
            BuiltinOperator::NotIpAddress => "NotIpAddress",
            BuiltinOperator::StringEquals => "StringEquals",
            BuiltinOperator::StringNotEquals => "StringNotEquals",
            BuiltinOperator::StringEqualsIgnoreCase => "StringEqualsIgnoreCase",
            BuiltinOperator::StringNotEqualsIgnoreCase => "StringNotEqualsIgnoreCase",
            BuiltinOperator::StringLike => "StringLike",
            BuiltinOperator::StringNotLike => "StringNotLike",
            BuiltinOperator::Bool => "Bool",
        }
    }

    /// Evaluate this operator; `actual` is `None` when the request does not
    /// define the referenced variable
    pub fn evaluate(self, actual: Option<&Value>, expected: &Value) -> bool {
        self.evaluate_in(actual, expected, None)
    }

    /// Evaluate, compiling `StringLike`/`StringNotLike` patterns through
    /// `patterns`
    pub fn evaluate_cached(
        self,
        actual: Option<&Value>,
        expected: &Value,
        patterns: &PatternCache,
    ) -> bool {
        self.evaluate_in(actual, expected, Some(patterns))
    }

    fn evaluate_in(
        self,
        actual: Option<&Value>,
        expected: &Value,
        patterns: Option<&PatternCache>,
    ) -> bool {
        match (self, actual) {
            (BuiltinOperator::Null, None) => expected.as_bool() == Some(true),
            (_, None) => false,
            (op, Some(actual)) => op.evaluate_present(actual, expected, patterns),
        }
    }

    fn evaluate_present(
        self,
        actual: &Value,
        expected: &Value,
        patterns: Option<&PatternCache>,
    ) -> bool {
        use BuiltinOperator::*;

        match self {
            NumericEquals => numeric(Comparison::Eq, actual, expected),
            NumericNotEquals => numeric(Comparison::Ne, actual, expected),
            NumericLessThan => numeric(Comparison::Lt, actual, expected),
            NumericLessThanEquals => numeric(Comparison::Le, actual, expected),
            NumericGreaterThan => numeric(Comparison::Gt, actual, expected),
            NumericGreaterThanEquals => numeric(Comparison::Ge, actual, expected),
            DateEquals => date(Comparison::Eq, actual, expected),
            DateNotEquals => date(Comparison::Ne, actual, expected),
            DateLessThan => date(Comparison::Lt, actual, expected),
            DateLessThanEquals => date(Comparison::Le, actual, expected),
            DateGreaterThan => date(Comparison::Gt, actual, expected),
            DateGreaterThanEquals => date(Comparison::Ge, actual, expected),
            BinaryEquals => binary(actual, expected).unwrap_or(false),
            BinaryNotEquals => binary(actual, expected).map(|eq| !eq).unwrap_or(false),
            Null => expected.as_bool() == Some(false),
            IpAddress => ip_in_range(actual, expected).unwrap_or(false),
            NotIpAddress => ip_in_range(actual, expected).map(|hit| !hit).unwrap_or(false),
            StringEquals => strings(actual, expected, |a, b| a == b),
            StringNotEquals => strings(actual, expected, |a, b| a != b),
            StringEqualsIgnoreCase => {
                strings(actual, expected, |a, b| a.to_lowercase() == b.to_lowercase())
            }
            StringNotEqualsIgnoreCase => {
                strings(actual, expected, |a, b| a.to_lowercase() != b.to_lowercase())
            }
            StringLike => strings(actual, expected, |a, b| like(patterns, a, b)),
            StringNotLike => strings(actual, expected, |a, b| !like(patterns, a, b)),
            Bool => match (actual.as_bool(), expected.as_bool()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

impl fmt::Display for BuiltinOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BuiltinOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BuiltinOperator::ALL
            .iter()
            .copied()
            .find(|op| op.name() == s)
            .ok_or_else(|| format!("unknown condition operator: {}", s))
    }
}

fn like(patterns: Option<&PatternCache>, actual: &str, pattern: &str) -> bool {
    match patterns {
        Some(cache) => cache.matches(actual, pattern),
        None => PatternMatcher::matches(actual, pattern),
    }
}

fn strings(actual: &Value, expected: &Value, compare: impl Fn(&str, &str) -> bool) -> bool {
    match (actual.as_str(), expected.as_str()) {
        (Some(a), Some(b)) => compare(a, b),
        _ => false,
    }
}

fn numeric(cmp: Comparison, actual: &Value, expected: &Value) -> bool {
    match (actual.as_f64(), expected.as_f64()) {
        (Some(a), Some(b)) => cmp.apply(a, b),
        _ => false,
    }
}

fn date(cmp: Comparison, actual: &Value, expected: &Value) -> bool {
    match (parse_date(actual), parse_date(expected)) {
        (Some(a), Some(b)) => cmp.apply(a, b),
        _ => false,
    }
}

/// Parse a date operand; the Unix epoch itself counts as unparsable
fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    let parsed = match value {
        Value::Timestamp(t) => *t,
        Value::String(s) => parse_date_str(s.trim())?,
        _ => return None,
    };

    if parsed.timestamp_millis() == 0 {
        None
    } else {
        Some(parsed)
    }
}

fn parse_date_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    if let Ok(t) = DateTime::parse_from_rfc2822(s) {
        return Some(t.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Compare a byte buffer against a base64 encoded expectation
fn binary(actual: &Value, expected: &Value) -> Option<bool> {
    let bytes = actual.as_bytes()?;
    let decoded = BASE64.decode(expected.as_str()?).ok()?;
    Some(bytes == decoded.as_slice())
}

/// Address (or network) with its prefix length
fn parse_network(s: &str) -> Option<(IpAddr, u32)> {
    let s = s.trim();
    match s.split_once('/') {
        Some((addr, prefix)) => {
            let addr: IpAddr = addr.parse().ok()?;
            let prefix: u32 = prefix.parse().ok()?;
            (prefix <= address_width(&addr)).then_some((addr, prefix))
        }
        None => {
            let addr: IpAddr = s.parse().ok()?;
            Some((addr, address_width(&addr)))
        }
    }
}

fn address_width(addr: &IpAddr) -> u32 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

fn address_bits(addr: &IpAddr) -> u128 {
    match addr {
        IpAddr::V4(v4) => u32::from(*v4) as u128,
        IpAddr::V6(v6) => u128::from(*v6),
    }
}

/// Is `actual` (address or CIDR) contained in `expected` (address or CIDR)?
///
/// `None` when either side is not a parsable address.
fn ip_in_range(actual: &Value, expected: &Value) -> Option<bool> {
    let (addr, addr_prefix) = parse_network(actual.as_str()?)?;
    let (net, net_prefix) = parse_network(expected.as_str()?)?;

    if address_width(&addr) != address_width(&net) {
        return Some(false);
    }
    if addr_prefix < net_prefix {
        return Some(false);
    }
    if net_prefix == 0 {
        return Some(true);
    }

    let shift = address_width(&net) - net_prefix;
    Some(address_bits(&addr) >> shift == address_bits(&net) >> shift)
}
