//! Typed parametric segments.
//!
//! A parametric segment (`:name` in a pattern) accepts any single path
//! segment, but only after its [`SegmentMatcher`] converts the raw text into a
//! [`ParamValue`]. A matcher that cannot convert returns `None`; route lookup
//! treats that as an ordinary miss and backtracks.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

/// A value bound to a parametric segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Raw segment text.
    Str(String),
    /// A base-10 integer.
    Int(i64),
}

impl ParamValue {
    /// Returns the value as text, if it is text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            Self::Int(_) => None,
        }
    }

    /// Returns the value as an integer, if it is an integer.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Str(_) => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

/// Validates and converts one raw path segment.
pub trait SegmentMatcher: fmt::Debug + Send + Sync {
    /// Identifier of this matcher type. Two parametric segments at the same
    /// route position must agree on it.
    fn kind(&self) -> &'static str;

    /// Converts `raw`, or returns `None` if the segment is not acceptable.
    fn convert(&self, raw: &str) -> Option<ParamValue>;
}

/// Accepts any segment as text.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringSegment;

impl SegmentMatcher for StringSegment {
    fn kind(&self) -> &'static str {
        "string"
    }

    fn convert(&self, raw: &str) -> Option<ParamValue> {
        Some(ParamValue::Str(raw.to_string()))
    }
}

/// Accepts only base-10 integers, optionally signed.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerSegment;

impl SegmentMatcher for IntegerSegment {
    fn kind(&self) -> &'static str {
        "integer"
    }

    fn convert(&self, raw: &str) -> Option<ParamValue> {
        raw.parse::<i64>().ok().map(ParamValue::Int)
    }
}

/// Returns the built-in matcher registered under `kind`.
#[must_use]
pub fn matcher_for(kind: &str) -> Option<Arc<dyn SegmentMatcher>> {
    match kind {
        "string" => Some(Arc::new(StringSegment)),
        "integer" | "int" => Some(Arc::new(IntegerSegment)),
        _ => None,
    }
}

/// A named parametric segment and its matcher.
#[derive(Debug, Clone)]
pub struct ParamSegment {
    name: String,
    matcher: Arc<dyn SegmentMatcher>,
}

impl ParamSegment {
    /// Creates an untyped (string) parameter.
    pub fn new(name: impl Into<String>) -> Self {
        Self::typed(name, Arc::new(StringSegment))
    }

    /// Creates a parameter with an explicit matcher.
    pub fn typed(name: impl Into<String>, matcher: Arc<dyn SegmentMatcher>) -> Self {
        Self {
            name: name.into(),
            matcher,
        }
    }

    /// Returns the parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the matcher kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.matcher.kind()
    }

    /// Converts a raw segment through this parameter's matcher.
    #[must_use]
    pub fn convert(&self, raw: &str) -> Option<ParamValue> {
        self.matcher.convert(raw)
    }

    /// Returns true if both segments bind the same name with the same matcher kind.
    #[must_use]
    pub fn same_shape(&self, other: &Self) -> bool {
        self.name == other.name && self.kind() == other.kind()
    }
}

impl fmt::Display for ParamSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            "string" => write!(f, ":{}", self.name),
            kind => write!(f, ":{}<{kind}>", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_segment() {
        assert_eq!(IntegerSegment.convert("42"), Some(ParamValue::Int(42)));
        assert_eq!(IntegerSegment.convert("-7"), Some(ParamValue::Int(-7)));
        assert_eq!(IntegerSegment.convert("+7"), Some(ParamValue::Int(7)));
        assert_eq!(IntegerSegment.convert("4x"), None);
        assert_eq!(IntegerSegment.convert(" 4"), None);
        assert_eq!(IntegerSegment.convert("1.5"), None);
    }

    #[test]
    fn test_string_segment() {
        assert_eq!(StringSegment.convert("bob"), Some(ParamValue::from("bob")));
    }

    #[test]
    fn test_same_shape() {
        let a = ParamSegment::new("id");
        let b = ParamSegment::new("id");
        let c = ParamSegment::new("name");
        let d = ParamSegment::typed("id", Arc::new(IntegerSegment));

        assert!(a.same_shape(&b));
        assert!(!a.same_shape(&c));
        assert!(!a.same_shape(&d));
    }

    #[test]
    fn test_display() {
        assert_eq!(ParamSegment::new("id").to_string(), ":id");
        assert_eq!(
            ParamSegment::typed("id", Arc::new(IntegerSegment)).to_string(),
            ":id<integer>"
        );
        assert_eq!(ParamValue::Int(3).to_string(), "3");
    }

    #[test]
    fn test_matcher_for() {
        assert_eq!(matcher_for("integer").map(|m| m.kind()), Some("integer"));
        assert_eq!(matcher_for("string").map(|m| m.kind()), Some("string"));
        assert!(matcher_for("uuid").is_none());
    }
}
