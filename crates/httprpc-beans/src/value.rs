//! Runtime value types handed to the renderer.
//!
//! The [`Value`] enum is the uniform shape every adapter produces. Scalars are
//! stored inline; structural values are lazy views ([`Dictionary`] and
//! [`Sequence`] trait objects) that adapt their contents on access.

use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};

use crate::dictionary::{Dictionary, Sequence};

/// A value resolved from a dictionary, borrowed from its source where possible.
///
/// # Example
///
/// ```
/// use httprpc_beans::{Number, Value};
///
/// let value = Value::from(42i64);
/// assert!(value.is_scalar());
/// assert_eq!(value.as_number(), Some(Number::I64(42)));
/// ```
pub enum Value<'a> {
    /// Absent or null.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Numeric value.
    Number(Number),
    /// String value.
    String(Cow<'a, str>),
    /// Point in time, in milliseconds since the Unix epoch.
    Timestamp(Timestamp),
    /// Nested dictionary.
    Dictionary(Box<dyn Dictionary + 'a>),
    /// Ordered sequence of values.
    Sequence(Box<dyn Sequence + 'a>),
}

impl<'a> Value<'a> {
    /// Wraps any dictionary as a value.
    pub fn dictionary(dictionary: impl Dictionary + 'a) -> Self {
        Value::Dictionary(Box::new(dictionary))
    }

    /// Wraps any sequence as a value.
    pub fn sequence(sequence: impl Sequence + 'a) -> Self {
        Value::Sequence(Box::new(sequence))
    }

    /// Returns `true` if this is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns `true` for strings, numbers, booleans and timestamps.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Bool(_) | Value::Number(_) | Value::String(_) | Value::Timestamp(_)
        )
    }

    /// Extracts the string value, if present.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Extracts the boolean value, if present.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Extracts the number value, if present.
    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Extracts the timestamp value, if present.
    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    /// Borrows the nested dictionary, if this is one.
    pub fn as_dictionary(&self) -> Option<&(dyn Dictionary + 'a)> {
        match self {
            Value::Dictionary(d) => Some(d.as_ref()),
            _ => None,
        }
    }

    /// Borrows the nested sequence, if this is one.
    pub fn as_sequence(&self) -> Option<&(dyn Sequence + 'a)> {
        match self {
            Value::Sequence(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    /// Copies a scalar into an owned [`Scalar`]. Returns `None` for null and
    /// structural values.
    pub fn to_scalar(&self) -> Option<Scalar> {
        match self {
            Value::Bool(b) => Some(Scalar::Bool(*b)),
            Value::Number(n) => Some(Scalar::Number(*n)),
            Value::String(s) => Some(Scalar::String(s.to_string())),
            Value::Timestamp(t) => Some(Scalar::Timestamp(*t)),
            Value::Null | Value::Dictionary(_) | Value::Sequence(_) => None,
        }
    }

    /// Produces a second view of this value that borrows from it.
    pub fn reborrow(&self) -> Value<'_> {
        match self {
            Value::Null => Value::Null,
            Value::Bool(b) => Value::Bool(*b),
            Value::Number(n) => Value::Number(*n),
            Value::String(s) => Value::String(Cow::Borrowed(s)),
            Value::Timestamp(t) => Value::Timestamp(*t),
            Value::Dictionary(d) => Value::Dictionary(Box::new(d.as_ref())),
            Value::Sequence(s) => Value::Sequence(Box::new(s.as_ref())),
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Timestamp(_) => "timestamp",
            Value::Dictionary(_) => "dictionary",
            Value::Sequence(_) => "sequence",
        }
    }
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::Timestamp(t) => f.debug_tuple("Timestamp").field(t).finish(),
            Value::Dictionary(_) => f.write_str("Dictionary(..)"),
            Value::Sequence(_) => f.write_str("Sequence(..)"),
        }
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(s: &'a str) -> Self {
        Value::String(Cow::Borrowed(s))
    }
}

impl From<String> for Value<'_> {
    fn from(s: String) -> Self {
        Value::String(Cow::Owned(s))
    }
}

impl From<bool> for Value<'_> {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Timestamp> for Value<'_> {
    fn from(t: Timestamp) -> Self {
        Value::Timestamp(t)
    }
}

impl From<Number> for Value<'_> {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

/// Numeric value supporting all common numeric types.
///
/// Numbers are stored in one of three variants to preserve precision:
/// - `I64` for signed integers
/// - `U64` for unsigned integers
/// - `F64` for floating point
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// Signed 64-bit integer.
    I64(i64),
    /// Unsigned 64-bit integer.
    U64(u64),
    /// 64-bit floating point.
    F64(f64),
}

impl Number {
    /// Converts the number to f64.
    pub fn to_f64(self) -> f64 {
        match self {
            Number::I64(n) => n as f64,
            Number::U64(n) => n as f64,
            Number::F64(n) => n,
        }
    }

    /// Converts the number to i64, truncating floats.
    pub fn to_i64(self) -> i64 {
        match self {
            Number::I64(n) => n,
            Number::U64(n) => n as i64,
            Number::F64(n) => n as i64,
        }
    }

    /// Returns `true` for the integer variants.
    pub fn is_integer(self) -> bool {
        !matches!(self, Number::F64(_))
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::I64(n) => write!(f, "{}", n),
            Number::U64(n) => write!(f, "{}", n),
            Number::F64(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e16 => {
                write!(f, "{:.1}", n)
            }
            Number::F64(n) => write!(f, "{}", n),
        }
    }
}

macro_rules! number_from {
    ($variant:ident, $target:ty; $($source:ty),*) => {
        $(
            impl From<$source> for Number {
                fn from(n: $source) -> Self {
                    Number::$variant(n as $target)
                }
            }

            impl From<$source> for Value<'_> {
                fn from(n: $source) -> Self {
                    Value::Number(Number::$variant(n as $target))
                }
            }

            impl From<$source> for Scalar {
                fn from(n: $source) -> Self {
                    Scalar::Number(Number::$variant(n as $target))
                }
            }
        )*
    };
}

number_from!(I64, i64; i8, i16, i32, i64, isize);
number_from!(U64, u64; u8, u16, u32, u64, usize);
number_from!(F64, f64; f32, f64);

/// Timestamp value represented as milliseconds since Unix epoch.
///
/// ```
/// use httprpc_beans::Timestamp;
///
/// let ts = Timestamp::from_millis(0);
/// assert_eq!(ts.to_string(), "1970-01-01T00:00:00.000Z");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Creates a timestamp from milliseconds since Unix epoch.
    pub fn from_millis(millis: i64) -> Self {
        Timestamp(millis)
    }

    /// Returns milliseconds since Unix epoch.
    pub fn as_millis(self) -> i64 {
        self.0
    }

    /// Converts to a zoned date-time, or `None` if out of chrono's range.
    pub fn to_datetime(self, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
        DateTime::<Utc>::from_timestamp_millis(self.0).map(|dt| dt.with_timezone(&offset))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match DateTime::<Utc>::from_timestamp_millis(self.0) {
            Some(dt) => f.write_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
            None => write!(f, "{}", self.0),
        }
    }
}

/// An owned scalar: the unit modifiers, cursors and context variables trade in.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    String(String),
    Number(Number),
    Bool(bool),
    Timestamp(Timestamp),
}

impl Scalar {
    /// Borrows this scalar as a [`Value`].
    pub fn as_value(&self) -> Value<'_> {
        match self {
            Scalar::String(s) => Value::String(Cow::Borrowed(s)),
            Scalar::Number(n) => Value::Number(*n),
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Timestamp(t) => Value::Timestamp(*t),
        }
    }

    /// Extracts the string value, if present.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::String(s) => f.write_str(s),
            Scalar::Number(n) => write!(f, "{}", n),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Timestamp(t) => write!(f, "{}", t),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::String(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::String(s)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl From<Timestamp> for Scalar {
    fn from(t: Timestamp) -> Self {
        Scalar::Timestamp(t)
    }
}

impl From<Number> for Scalar {
    fn from(n: Number) -> Self {
        Scalar::Number(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_print_without_fraction() {
        assert_eq!(Number::I64(-7).to_string(), "-7");
        assert_eq!(Number::U64(42).to_string(), "42");
    }

    #[test]
    fn whole_floats_keep_one_fractional_digit() {
        assert_eq!(Number::F64(2.0).to_string(), "2.0");
        assert_eq!(Number::F64(2.5).to_string(), "2.5");
    }

    #[test]
    fn timestamp_prints_rfc3339() {
        let ts = Timestamp::from_millis(1_500);
        assert_eq!(ts.to_string(), "1970-01-01T00:00:01.500Z");
    }

    #[test]
    fn scalar_round_trips_through_value() {
        let scalar = Scalar::from("hello");
        assert_eq!(scalar.as_value().to_scalar(), Some(scalar.clone()));
        assert_eq!(scalar.to_string(), "hello");
    }

    #[test]
    fn null_and_structures_are_not_scalars() {
        assert!(!Value::Null.is_scalar());
        assert!(Value::Null.to_scalar().is_none());
        assert!(Value::from(true).is_scalar());
        assert_eq!(Value::from(3u8).as_number(), Some(Number::U64(3)));
    }

    #[test]
    fn reborrow_preserves_scalars() {
        let value = Value::from(String::from("owned"));
        assert_eq!(value.reborrow().as_str(), Some("owned"));
    }
}
