//! Declarative route and filter registration.
//!
//! A manifest is a JSON document listing routes and filters by pattern and
//! handler name:
//!
//! ```json
//! {
//!   "routes": [
//!     { "methods": ["GET"], "path": "/u/:id", "handler": "user", "params": { "id": "integer" } }
//!   ],
//!   "filters": [
//!     { "phase": "before", "path": "/account/*", "priority": "high", "handler": "auth" }
//!   ]
//! }
//! ```
//!
//! Route methods default to `GET`; filter methods default to every method and
//! filter priority to `normal`. Handler names are turned into handler values
//! by a resolver supplied by the caller.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ManifestError;
use crate::filter::{FilterMapper, Phase, Priority};
use crate::path::PathPattern;
use crate::request::Method;
use crate::route::{RouteMapper, RouteTable};
use crate::segment::matcher_for;

/// A route declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteDecl {
    /// Methods the handler serves.
    #[serde(default = "default_route_methods")]
    pub methods: Vec<Method>,
    /// Path pattern.
    pub path: String,
    /// Handler name.
    pub handler: String,
    /// Matcher kind per parameter name; unlisted parameters are strings.
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

/// A filter declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterDecl {
    /// Before or after the route handler.
    pub phase: Phase,
    /// Path pattern.
    pub path: String,
    /// Methods the filter applies to; empty means every method.
    #[serde(default)]
    pub methods: Vec<Method>,
    /// Execution rank within the phase.
    #[serde(default)]
    pub priority: Priority,
    /// Handler name.
    pub handler: String,
    /// Matcher kind per parameter name; unlisted parameters are strings.
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

fn default_route_methods() -> Vec<Method> {
    vec![Method::Get]
}

/// A list of route and filter declarations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteManifest {
    /// Route declarations.
    #[serde(default)]
    pub routes: Vec<RouteDecl>,
    /// Filter declarations, in registration order.
    #[serde(default)]
    pub filters: Vec<FilterDecl>,
}

impl RouteManifest {
    /// Parses a manifest from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Json`] if the text does not fit the schema.
    pub fn from_json(json: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a manifest file.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Io`] if the file cannot be read, or
    /// [`ManifestError::Json`] if it does not fit the schema.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let manifest = Self::from_json(&std::fs::read_to_string(path)?)?;
        info!(
            path = %path.display(),
            routes = manifest.routes.len(),
            filters = manifest.filters.len(),
            "loaded route manifest"
        );
        Ok(manifest)
    }

    /// Registers every route and compiles the table.
    ///
    /// `resolve` is called once per declared method.
    ///
    /// # Errors
    ///
    /// Fails on routes without methods, unknown handler names, unknown
    /// matcher kinds, malformed patterns, and on any conflict reported by
    /// [`RouteMapper::compile`].
    pub fn build_routes<H, F>(&self, mut resolve: F) -> Result<RouteTable<H>, ManifestError>
    where
        F: FnMut(&str) -> Option<H>,
    {
        let mut mapper = RouteMapper::new();
        for decl in &self.routes {
            if decl.methods.is_empty() {
                return Err(ManifestError::NoMethods {
                    path: decl.path.clone(),
                });
            }
            let pattern = typed_pattern(&decl.path, &decl.params)?;
            for method in &decl.methods {
                let handler = resolve(&decl.handler)
                    .ok_or_else(|| ManifestError::UnknownHandler(decl.handler.clone()))?;
                mapper.map_pattern(*method, pattern.clone(), handler);
            }
        }
        Ok(mapper.compile()?)
    }

    /// Registers every filter in declaration order.
    ///
    /// # Errors
    ///
    /// Fails on unknown handler names, unknown matcher kinds and malformed
    /// patterns.
    pub fn build_filters<H, F>(&self, mut resolve: F) -> Result<FilterMapper<H>, ManifestError>
    where
        F: FnMut(&str) -> Option<H>,
    {
        let mut mapper = FilterMapper::new();
        for decl in &self.filters {
            let pattern = typed_pattern(&decl.path, &decl.params)?;
            let handler = resolve(&decl.handler)
                .ok_or_else(|| ManifestError::UnknownHandler(decl.handler.clone()))?;
            mapper.add_filter_pattern(decl.phase, pattern, &decl.methods, decl.priority, handler);
        }
        Ok(mapper)
    }
}

fn typed_pattern(
    path: &str,
    params: &BTreeMap<String, String>,
) -> Result<PathPattern, ManifestError> {
    let mut pattern = PathPattern::parse(path)?;
    for (name, kind) in params {
        let matcher = matcher_for(kind).ok_or_else(|| ManifestError::UnknownMatcher {
            param: name.clone(),
            kind: kind.clone(),
        })?;
        pattern = pattern.with_matcher(name, matcher)?;
    }
    Ok(pattern)
}
