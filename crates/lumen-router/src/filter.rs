//! Multi-winner filter matching.
//!
//! Filters share the route pattern grammar but not its conflict rules: any
//! number of filters may bind the same or overlapping patterns, and a lookup
//! returns every binding whose pattern matches the path. A lookup visits every
//! viable branch at every depth (wildcard, literal and parametric alike), then
//! orders the survivors by priority and registration order.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use tracing::debug;

use crate::error::{PathFormatError, Result};
use crate::path::{PathPattern, split_path};
use crate::request::{Method, PathParams};
use crate::tree::PathTree;

/// Execution rank of a filter within its phase. Higher ranks run first.
///
/// The named levels are ordinary ranks; any integer is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "PriorityRepr")]
pub struct Priority(i32);

impl Priority {
    /// Highest named level.
    pub const HIGHEST: Self = Self(400);
    /// High level.
    pub const HIGH: Self = Self(300);
    /// Default level.
    pub const NORMAL: Self = Self(200);
    /// Low level.
    pub const LOW: Self = Self(100);
    /// Lowest named level.
    pub const LOWEST: Self = Self(0);

    const LEVELS: [(&'static str, Self); 5] = [
        ("highest", Self::HIGHEST),
        ("high", Self::HIGH),
        ("normal", Self::NORMAL),
        ("low", Self::LOW),
        ("lowest", Self::LOWEST),
    ];

    /// Creates a priority with an explicit rank.
    #[must_use]
    pub const fn new(rank: i32) -> Self {
        Self(rank)
    }

    /// Returns the rank.
    #[must_use]
    pub const fn rank(self) -> i32 {
        self.0
    }

    /// Looks up a named level, case-insensitively.
    #[must_use]
    pub fn from_level(name: &str) -> Option<Self> {
        Self::LEVELS
            .iter()
            .find(|(level, _)| level.eq_ignore_ascii_case(name))
            .map(|(_, priority)| *priority)
    }

    fn level(self) -> Option<&'static str> {
        Self::LEVELS
            .iter()
            .find(|(_, priority)| *priority == self)
            .map(|(level, _)| *level)
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level() {
            Some(level) => f.write_str(level),
            None => write!(f, "{}", self.0),
        }
    }
}

impl Serialize for Priority {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.level() {
            Some(level) => serializer.serialize_str(level),
            None => serializer.serialize_i32(self.0),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PriorityRepr {
    Rank(i32),
    Level(String),
}

impl TryFrom<PriorityRepr> for Priority {
    type Error = String;

    fn try_from(repr: PriorityRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            PriorityRepr::Rank(rank) => Ok(Self(rank)),
            PriorityRepr::Level(name) => {
                Self::from_level(&name).ok_or_else(|| format!("unknown priority level '{name}'"))
            }
        }
    }
}

/// Whether a filter runs before or after the route handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Runs before the route handler and may halt the request.
    Before,
    /// Runs after the route handler, or after a halt.
    After,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Before => f.write_str("before"),
            Self::After => f.write_str("after"),
        }
    }
}

/// A filter registered against a pattern.
///
/// A binding carries no bound values: one binding matches many concrete
/// paths, so values are re-derived per path with [`Self::params`] and
/// [`Self::wildcards`].
#[derive(Debug)]
pub struct FilterBinding<H> {
    pattern: PathPattern,
    methods: HashSet<Method>,
    priority: Priority,
    phase: Phase,
    handler: H,
    seq: u64,
}

impl<H> FilterBinding<H> {
    /// Returns the pattern.
    #[must_use]
    pub const fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    /// Returns the methods this binding applies to.
    #[must_use]
    pub const fn methods(&self) -> &HashSet<Method> {
        &self.methods
    }

    /// Returns the priority.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Returns the phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns the handler.
    #[must_use]
    pub const fn handler(&self) -> &H {
        &self.handler
    }

    /// Returns the registration sequence number.
    #[must_use]
    pub const fn seq(&self) -> u64 {
        self.seq
    }

    /// Returns the parameter values this binding's pattern binds for `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PathFormatError`] if `path` is malformed.
    pub fn params(&self, path: &str) -> std::result::Result<PathParams, PathFormatError> {
        self.pattern.params(path)
    }

    /// Returns the segments this binding's wildcard absorbs for `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PathFormatError`] if `path` is malformed.
    pub fn wildcards(&self, path: &str) -> std::result::Result<Vec<String>, PathFormatError> {
        self.pattern.wildcards(path)
    }

    fn applies(&self, method: Method, segments: &[&str]) -> bool {
        self.methods.contains(&method) && self.pattern.accepts(segments)
    }
}

/// Every filter applying to one request, ordered per phase.
#[derive(Debug)]
pub struct FilterMatch<'a, H> {
    before: Vec<&'a FilterBinding<H>>,
    after: Vec<&'a FilterBinding<H>>,
}

impl<'a, H> FilterMatch<'a, H> {
    /// Returns the before-filters, highest priority first.
    #[must_use]
    pub fn before_filters(&self) -> &[&'a FilterBinding<H>] {
        &self.before
    }

    /// Returns the after-filters, highest priority first.
    #[must_use]
    pub fn after_filters(&self) -> &[&'a FilterBinding<H>] {
        &self.after
    }

    /// Returns true if no filter applies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }
}

/// Collects filter registrations and answers multi-match lookups.
///
/// Registration needs `&mut self`; lookups take `&self` and keep their
/// results in the returned [`FilterMatch`], so a populated mapper can be
/// shared between request threads.
#[derive(Debug)]
pub struct FilterMapper<H> {
    root: PathTree<Vec<FilterBinding<H>>>,
    next_seq: u64,
    len: usize,
}

impl<H> Default for FilterMapper<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> FilterMapper<H> {
    /// Creates an empty mapper.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: PathTree::new(),
            next_seq: 0,
            len: 0,
        }
    }

    /// Registers a filter that runs before the route handler.
    ///
    /// An empty `methods` slice applies the filter to every method.
    ///
    /// # Errors
    ///
    /// Fails if the pattern is malformed.
    pub fn add_filter_before(
        &mut self,
        pattern: &str,
        methods: &[Method],
        priority: Priority,
        handler: H,
    ) -> Result<()> {
        self.add_filter(Phase::Before, pattern, methods, priority, handler)
    }

    /// Registers a filter that runs after the route handler.
    ///
    /// An empty `methods` slice applies the filter to every method.
    ///
    /// # Errors
    ///
    /// Fails if the pattern is malformed.
    pub fn add_filter_after(
        &mut self,
        pattern: &str,
        methods: &[Method],
        priority: Priority,
        handler: H,
    ) -> Result<()> {
        self.add_filter(Phase::After, pattern, methods, priority, handler)
    }

    /// Registers a filter for `phase`.
    ///
    /// # Errors
    ///
    /// Fails if the pattern is malformed.
    pub fn add_filter(
        &mut self,
        phase: Phase,
        pattern: &str,
        methods: &[Method],
        priority: Priority,
        handler: H,
    ) -> Result<()> {
        let pattern = PathPattern::parse(pattern)?;
        self.add_filter_pattern(phase, pattern, methods, priority, handler);
        Ok(())
    }

    /// Registers a filter on an already parsed (possibly typed) pattern.
    pub fn add_filter_pattern(
        &mut self,
        phase: Phase,
        pattern: PathPattern,
        methods: &[Method],
        priority: Priority,
        handler: H,
    ) {
        let methods: HashSet<Method> = if methods.is_empty() {
            Method::ALL.into_iter().collect()
        } else {
            methods.iter().copied().collect()
        };

        let seq = self.next_seq;
        self.next_seq += 1;
        self.len += 1;

        debug!(%phase, pattern = %pattern, %priority, seq, "installing filter");
        self.root
            .shared_node_mut(&pattern)
            .payload_mut()
            .push(FilterBinding {
                pattern,
                methods,
                priority,
                phase,
                handler,
                seq,
            });
    }

    /// Returns every filter matching `path` for `method`.
    ///
    /// The result is never absent; empty lists mean no filter applies.
    ///
    /// # Errors
    ///
    /// Returns [`PathFormatError`] if the path is malformed.
    pub fn lookup(
        &self,
        path: &str,
        method: Method,
    ) -> std::result::Result<FilterMatch<'_, H>, PathFormatError> {
        let segments = split_path(path)?;

        let mut found = Vec::new();
        collect(&self.root, &segments, &mut found);

        let mut result = FilterMatch {
            before: Vec::new(),
            after: Vec::new(),
        };
        for binding in found {
            if !binding.applies(method, &segments) {
                continue;
            }
            match binding.phase {
                Phase::Before => result.before.push(binding),
                Phase::After => result.after.push(binding),
            }
        }

        for list in [&mut result.before, &mut result.after] {
            list.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.seq.cmp(&b.seq)));
        }

        debug!(
            %method,
            path,
            before = result.before.len(),
            after = result.after.len(),
            "filters matched"
        );
        Ok(result)
    }

    /// Returns the number of registered filters.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if no filters are registered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Removes every filter.
    pub fn clear(&mut self) {
        self.root = PathTree::new();
        self.len = 0;
    }
}

fn collect<'t, H>(
    node: &'t PathTree<Vec<FilterBinding<H>>>,
    segments: &[&str],
    found: &mut Vec<&'t FilterBinding<H>>,
) {
    let Some((segment, rest)) = segments.split_first() else {
        found.extend(node.payload());
        return;
    };

    if let Some(wildcard) = node.wildcard() {
        found.extend(wildcard.payload());
    }
    if let Some(child) = node.literal(segment) {
        collect(child, rest, found);
    }
    if let Some((_, child)) = node.parametric() {
        collect(child, rest, found);
    }
}
