//! Single-winner route matching.
//!
//! Routes are registered on a [`RouteMapper`] and validated as a whole by
//! [`RouteMapper::compile`], which produces a read-only [`RouteTable`]. Only
//! the table can be queried, so a lookup before compilation does not compile.
//!
//! Lookup is depth-first: at every depth a literal child is tried first, then
//! the parametric child, then the wildcard child. A failed branch is undone
//! and the next one tried, so a literal route deeper in the tree still wins
//! over an earlier parametric bind.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::{PathFormatError, Result, RouteFormatError};
use crate::path::{PathPattern, Segment, split_path};
use crate::request::{Method, PathParams};
use crate::tree::{ParamPolicy, PathTree};

static LITERAL_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_\-.~]+$").unwrap_or_else(|e| unreachable!("literal segment regex: {e}"))
});

/// A route waiting for compilation.
#[derive(Debug)]
struct PendingRoute<H> {
    method: Method,
    pattern: PathPattern,
    handler: H,
}

/// A compiled route stored in the tree.
#[derive(Debug)]
pub struct Route<H> {
    /// HTTP method.
    pub method: Method,
    /// Path pattern.
    pub pattern: PathPattern,
    /// Request handler.
    pub handler: H,
}

type Slot<H> = HashMap<Method, Route<H>>;

/// Collects route registrations.
#[derive(Debug)]
pub struct RouteMapper<H> {
    pending: Vec<PendingRoute<H>>,
}

impl<H> Default for RouteMapper<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> RouteMapper<H> {
    /// Creates an empty mapper.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Registers `handler` for `method` on `pattern`.
    ///
    /// Conflicts with other routes are only detected by [`Self::compile`].
    ///
    /// # Errors
    ///
    /// Fails immediately if the pattern is malformed (empty segment, or a
    /// wildcard that is not the last segment).
    pub fn map(&mut self, method: Method, pattern: &str, handler: H) -> Result<()> {
        let pattern = PathPattern::parse(pattern)?;
        self.map_pattern(method, pattern, handler);
        Ok(())
    }

    /// Registers `handler` for `method` on an already parsed (possibly typed) pattern.
    pub fn map_pattern(&mut self, method: Method, pattern: PathPattern, handler: H) {
        self.pending.push(PendingRoute {
            method,
            pattern,
            handler,
        });
    }

    /// Returns the number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Removes all registered routes.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Builds the routing tree and validates it.
    ///
    /// Every registration is checked and all problems are reported together.
    ///
    /// # Errors
    ///
    /// Returns a [`RouteFormatError`] (or [`RouteFormatError::Multiple`]) for
    /// illegal characters in literal segments, differing parametric segments
    /// at one position, two wildcard routes for one method at one position,
    /// and duplicate method + pattern pairs.
    pub fn compile(self) -> Result<RouteTable<H>> {
        let mut root: PathTree<Slot<H>> = PathTree::new();
        let mut errors = Vec::new();
        let mut len = 0;

        for route in self.pending {
            debug!(method = %route.method, pattern = %route.pattern, "installing route");

            if let Some(segment) = invalid_literal(&route.pattern) {
                errors.push(RouteFormatError::InvalidCharacters {
                    method: route.method,
                    pattern: route.pattern.to_string(),
                    segment: segment.to_string(),
                });
                continue;
            }

            let node = match root.node_mut(&route.pattern, ParamPolicy::Strict) {
                Ok(node) => node,
                Err(conflict) => {
                    errors.push(RouteFormatError::ParamConflict {
                        method: route.method,
                        pattern: route.pattern.to_string(),
                        param: conflict.requested.to_string(),
                        existing_pattern: conflict.existing_pattern,
                        existing_param: conflict.existing.to_string(),
                    });
                    continue;
                }
            };

            if let Some(existing) = node.payload().get(&route.method) {
                let existing_pattern = existing.pattern.to_string();
                errors.push(if route.pattern.is_wildcard() {
                    RouteFormatError::WildcardConflict {
                        method: route.method,
                        pattern: route.pattern.to_string(),
                        existing_pattern,
                    }
                } else {
                    RouteFormatError::DuplicateRoute {
                        method: route.method,
                        pattern: route.pattern.to_string(),
                        existing_pattern,
                    }
                });
                continue;
            }

            node.payload_mut().insert(
                route.method,
                Route {
                    method: route.method,
                    pattern: route.pattern,
                    handler: route.handler,
                },
            );
            len += 1;
        }

        for error in &errors {
            warn!(%error, "rejected route");
        }
        if let Some(error) = RouteFormatError::aggregate(errors) {
            return Err(error);
        }

        info!(routes = len, nodes = root.node_count(), "compiled route table");
        Ok(RouteTable { root, len })
    }
}

/// Returns the first literal segment with characters outside the allowed set.
fn invalid_literal(pattern: &PathPattern) -> Option<&str> {
    pattern.segments().iter().find_map(|segment| match segment {
        Segment::Static(literal) if !LITERAL_SEGMENT.is_match(literal) => Some(literal.as_str()),
        _ => None,
    })
}

/// A successful route lookup.
#[derive(Debug)]
pub struct RouteMatch<'a, H> {
    /// The matched route.
    pub route: &'a Route<H>,
    /// Converted values of the route's parametric segments.
    pub params: PathParams,
    /// Segments absorbed by a trailing wildcard, in order.
    pub wildcards: Vec<String>,
}

impl<'a, H> RouteMatch<'a, H> {
    /// Returns the matched handler.
    #[must_use]
    pub const fn handler(&self) -> &'a H {
        &self.route.handler
    }

    /// Returns the matched pattern.
    #[must_use]
    pub const fn pattern(&self) -> &'a PathPattern {
        &self.route.pattern
    }
}

/// Bindings accumulated during one lookup.
#[derive(Default)]
struct Captures {
    params: PathParams,
    wildcards: Vec<String>,
}

/// A compiled, read-only routing table.
///
/// Lookups take `&self` and never touch shared state, so a table can be
/// shared between request threads as-is.
#[derive(Debug)]
pub struct RouteTable<H> {
    root: PathTree<Slot<H>>,
    len: usize,
}

impl<H> RouteTable<H> {
    /// Finds the route for `method` and `path`.
    ///
    /// Returns `Ok(None)` when no route matches.
    ///
    /// # Errors
    ///
    /// Returns [`PathFormatError`] if the path contains an empty segment
    /// (`/u//bob`), so callers can tell a malformed request from a missing
    /// route.
    ///
    /// # Example
    ///
    /// ```
    /// use lumen_router::{Method, RouteMapper};
    ///
    /// let mut mapper = RouteMapper::new();
    /// mapper.map(Method::Get, "/u/:username", "profile").unwrap();
    /// mapper.map(Method::Get, "/u/*", "catch_all").unwrap();
    /// let table = mapper.compile().unwrap();
    ///
    /// let found = table.lookup(Method::Get, "/u/bob").unwrap().unwrap();
    /// assert_eq!(*found.handler(), "profile");
    /// assert_eq!(found.params.get_str("username"), Some("bob"));
    ///
    /// let found = table.lookup(Method::Get, "/u/bob/asdf").unwrap().unwrap();
    /// assert_eq!(*found.handler(), "catch_all");
    /// assert_eq!(found.wildcards, vec!["bob", "asdf"]);
    /// ```
    pub fn lookup(
        &self,
        method: Method,
        path: &str,
    ) -> std::result::Result<Option<RouteMatch<'_, H>>, PathFormatError> {
        let segments = split_path(path)?;
        let mut captures = Captures::default();

        let Some(route) = search(&self.root, &segments, method, &mut captures) else {
            debug!(%method, path, "no route matched");
            return Ok(None);
        };

        debug!(
            %method,
            path,
            pattern = %route.pattern,
            params = ?captures.params,
            wildcards = ?captures.wildcards,
            "route matched"
        );
        Ok(Some(RouteMatch {
            route,
            params: captures.params,
            wildcards: captures.wildcards,
        }))
    }

    /// Returns the methods that have a route matching `path`.
    ///
    /// An empty result with a well-formed path means "not found"; a
    /// non-empty one without the request's method means "method not allowed".
    ///
    /// # Errors
    ///
    /// Returns [`PathFormatError`] if the path is malformed.
    pub fn allowed_methods(
        &self,
        path: &str,
    ) -> std::result::Result<Vec<Method>, PathFormatError> {
        let segments = split_path(path)?;
        Ok(Method::ALL
            .into_iter()
            .filter(|m| search(&self.root, &segments, *m, &mut Captures::default()).is_some())
            .collect())
    }

    /// Returns the number of compiled routes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the table holds no routes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

fn search<'t, H>(
    node: &'t PathTree<Slot<H>>,
    segments: &[&str],
    method: Method,
    captures: &mut Captures,
) -> Option<&'t Route<H>> {
    let Some((segment, rest)) = segments.split_first() else {
        return node.payload().get(&method);
    };

    if let Some(route) = node
        .literal(segment)
        .and_then(|child| search(child, rest, method, captures))
    {
        return Some(route);
    }

    let parametric = node
        .parametric()
        .and_then(|(param, child)| Some((param, child, param.convert(segment)?)));
    if let Some((param, child, value)) = parametric {
        let shadowed = captures.params.remove(param.name());
        captures.params.insert(param.name(), value);
        if let Some(route) = search(child, rest, method, captures) {
            return Some(route);
        }
        // Backtrack.
        captures.params.remove(param.name());
        if let Some(previous) = shadowed {
            captures.params.insert(param.name(), previous);
        }
    }

    // A wildcard is always a leaf and absorbs everything left.
    let route = node.wildcard()?.payload().get(&method)?;
    captures
        .wildcards
        .extend(segments.iter().map(|s| (*s).to_string()));
    Some(route)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(routes: &[(Method, &str, &'static str)]) -> RouteTable<&'static str> {
        let mut mapper = RouteMapper::new();
        for (method, pattern, handler) in routes {
            mapper.map(*method, pattern, *handler).unwrap();
        }
        mapper.compile().unwrap()
    }

    #[test]
    fn test_root_route() {
        let table = table(&[(Method::Get, "/", "root")]);
        let found = table.lookup(Method::Get, "/").unwrap().unwrap();
        assert_eq!(*found.handler(), "root");
        assert!(found.params.is_empty());
        assert!(found.wildcards.is_empty());
    }

    #[test]
    fn test_literal_beats_param_after_backtracking() {
        let table = table(&[
            (Method::Get, "/a/:x/c", "param"),
            (Method::Get, "/a/b/d", "literal"),
        ]);

        // `b` first descends the literal branch, fails at `c`, then retries as `:x`.
        let found = table.lookup(Method::Get, "/a/b/c").unwrap().unwrap();
        assert_eq!(*found.handler(), "param");
        assert_eq!(found.params.get_str("x"), Some("b"));

        let found = table.lookup(Method::Get, "/a/b/d").unwrap().unwrap();
        assert_eq!(*found.handler(), "literal");
        assert!(found.params.is_empty());
    }

    #[test]
    fn test_failed_param_branch_leaves_no_binding() {
        let table = table(&[
            (Method::Get, "/a/:x/c", "param"),
            (Method::Get, "/a/*", "wild"),
        ]);
        let found = table.lookup(Method::Get, "/a/b/z").unwrap().unwrap();
        assert_eq!(*found.handler(), "wild");
        assert!(found.params.is_empty());
        assert_eq!(found.wildcards, vec!["b", "z"]);
    }

    #[test]
    fn test_wildcard_needs_a_segment() {
        let table = table(&[(Method::Get, "/u/*", "wild")]);
        assert!(table.lookup(Method::Get, "/u").unwrap().is_none());
        assert!(table.lookup(Method::Get, "/u/x").unwrap().is_some());
    }

    #[test]
    fn test_method_mismatch() {
        let table = table(&[(Method::Get, "/u", "get")]);
        assert!(table.lookup(Method::Post, "/u").unwrap().is_none());
        assert_eq!(table.allowed_methods("/u").unwrap(), vec![Method::Get]);
        assert!(table.allowed_methods("/nope").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_literal_characters() {
        let mut mapper = RouteMapper::new();
        mapper.map(Method::Get, "/$abc", "abc").unwrap();
        assert!(matches!(
            mapper.compile(),
            Err(RouteFormatError::InvalidCharacters { .. })
        ));
    }

    #[test]
    fn test_clear() {
        let mut mapper = RouteMapper::new();
        mapper.map(Method::Get, "/a", "a").unwrap();
        mapper.map(Method::Get, "/a", "b").unwrap();
        assert_eq!(mapper.len(), 2);

        mapper.clear();
        assert!(mapper.is_empty());
        assert!(mapper.compile().unwrap().is_empty());
    }
}
