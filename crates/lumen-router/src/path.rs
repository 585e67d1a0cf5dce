//! Path splitting and pattern parsing.

use std::fmt;
use std::sync::Arc;

use crate::error::{PathFormatError, Result, RouteFormatError};
use crate::request::PathParams;
use crate::segment::{ParamSegment, SegmentMatcher};

/// Splits a path into its `/`-delimited segments.
///
/// One leading and one trailing slash are discarded, so `/u`, `/u/` and `u`
/// all yield `["u"]`, and `/` yields no segments. Any other empty segment
/// (`/u//bob`, `/u//`) is rejected rather than collapsed. No decoding is
/// performed.
///
/// # Errors
///
/// Returns [`PathFormatError::EmptySegment`] if the path contains `//`.
///
/// # Example
///
/// ```
/// use lumen_router::split_path;
///
/// assert_eq!(split_path("/u/bob/").unwrap(), vec!["u", "bob"]);
/// assert!(split_path("/u//bob").is_err());
/// ```
pub fn split_path(path: &str) -> std::result::Result<Vec<&str>, PathFormatError> {
    if path.is_empty() || path == "/" {
        return Ok(Vec::new());
    }

    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    let segments: Vec<&str> = trimmed.split('/').collect();

    if segments.iter().any(|s| s.is_empty()) {
        return Err(PathFormatError::EmptySegment {
            path: path.to_string(),
        });
    }

    Ok(segments)
}

/// A segment in a path pattern.
#[derive(Debug, Clone)]
pub enum Segment {
    /// A literal segment, matched byte-for-byte.
    Static(String),
    /// A parameter segment (`:name`).
    Param(ParamSegment),
    /// A wildcard segment (`*`), matching one or more trailing segments.
    Wildcard,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(s) => f.write_str(s),
            Self::Param(p) => write!(f, "{p}"),
            Self::Wildcard => f.write_str("*"),
        }
    }
}

/// A parsed path pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    /// The original pattern string.
    pattern: String,
    /// Parsed segments.
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Parses a path pattern string.
    ///
    /// Pattern syntax:
    /// - `/users` - Literal path
    /// - `/users/:id` - Path with parameter
    /// - `/files/*` - Wildcard (matches the rest of the path)
    ///
    /// A segment is a parameter only if `:` is followed by at least one
    /// character; a bare `:` is a literal.
    ///
    /// # Errors
    ///
    /// Fails on an empty segment or a wildcard that is not the last segment.
    ///
    /// # Example
    ///
    /// ```
    /// use lumen_router::PathPattern;
    ///
    /// let pattern = PathPattern::parse("/posts/:id/comments/:comment_id").unwrap();
    /// let params = pattern.params("/posts/123/comments/456").unwrap();
    /// assert_eq!(params.get_str("id"), Some("123"));
    /// assert_eq!(params.get_str("comment_id"), Some("456"));
    /// ```
    pub fn parse(pattern: &str) -> Result<Self> {
        let parts = split_path(pattern).map_err(|_| RouteFormatError::EmptySegment {
            pattern: pattern.to_string(),
        })?;

        let mut segments = Vec::with_capacity(parts.len());
        for (i, part) in parts.iter().enumerate() {
            if *part == "*" {
                if i + 1 != parts.len() {
                    return Err(RouteFormatError::WildcardNotTerminal {
                        pattern: pattern.to_string(),
                    });
                }
                segments.push(Segment::Wildcard);
            } else if let Some(name) = part.strip_prefix(':').filter(|n| !n.is_empty()) {
                segments.push(Segment::Param(ParamSegment::new(name)));
            } else {
                segments.push(Segment::Static((*part).to_string()));
            }
        }

        Ok(Self {
            pattern: pattern.to_string(),
            segments,
        })
    }

    /// Replaces the matcher of every parameter called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RouteFormatError::UnknownParam`] if the pattern has no such parameter.
    ///
    /// # Example
    ///
    /// ```
    /// use std::sync::Arc;
    /// use lumen_router::{IntegerSegment, PathPattern};
    ///
    /// let pattern = PathPattern::parse("/users/:id")
    ///     .unwrap()
    ///     .with_matcher("id", Arc::new(IntegerSegment))
    ///     .unwrap();
    /// assert!(pattern.accepts(&["users", "42"]));
    /// assert!(!pattern.accepts(&["users", "bob"]));
    /// ```
    pub fn with_matcher(mut self, name: &str, matcher: Arc<dyn SegmentMatcher>) -> Result<Self> {
        let mut found = false;
        for segment in &mut self.segments {
            if let Segment::Param(param) = segment {
                if param.name() == name {
                    *param = ParamSegment::typed(name, Arc::clone(&matcher));
                    found = true;
                }
            }
        }

        if found {
            Ok(self)
        } else {
            Err(RouteFormatError::UnknownParam {
                pattern: self.pattern,
                name: name.to_string(),
            })
        }
    }

    /// Returns the original pattern string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Returns the parsed segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns true if the pattern ends in a wildcard.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        matches!(self.segments.last(), Some(Segment::Wildcard))
    }

    /// Returns the parameter names in order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(p) => Some(p.name()),
            _ => None,
        })
    }

    /// Returns false if a typed parameter rejects the segment at its position.
    ///
    /// Only parameters are checked; literal and wildcard positions are the
    /// tree's concern.
    #[must_use]
    pub fn accepts(&self, segments: &[&str]) -> bool {
        self.segments
            .iter()
            .zip(segments)
            .all(|(segment, raw)| match segment {
                Segment::Param(p) => p.convert(raw).is_some(),
                _ => true,
            })
    }

    /// Re-derives the parameter values this pattern binds for `path`.
    ///
    /// Segments are paired by position; a parameter whose matcher rejects its
    /// segment is left out.
    ///
    /// # Errors
    ///
    /// Returns [`PathFormatError`] if `path` is malformed.
    pub fn params(&self, path: &str) -> std::result::Result<PathParams, PathFormatError> {
        let parts = split_path(path)?;
        let mut params = PathParams::new();

        for (segment, raw) in self.segments.iter().zip(&parts) {
            if let Segment::Param(p) = segment {
                if let Some(value) = p.convert(raw) {
                    params.insert(p.name(), value);
                }
            }
        }

        Ok(params)
    }

    /// Re-derives the segments this pattern's trailing wildcard absorbs for `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PathFormatError`] if `path` is malformed.
    pub fn wildcards(&self, path: &str) -> std::result::Result<Vec<String>, PathFormatError> {
        let parts = split_path(path)?;
        if !self.is_wildcard() {
            return Ok(Vec::new());
        }

        let start = self.segments.len() - 1;
        Ok(parts
            .get(start..)
            .unwrap_or_default()
            .iter()
            .map(|s| (*s).to_string())
            .collect())
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}
