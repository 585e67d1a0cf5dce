//! # lumen-router
//!
//! HTTP path routing: a segment trie over URL paths with two matching
//! disciplines on the same tree shape.
//!
//! This crate provides:
//! - Single-winner route matching with compile-time conflict detection
//! - Multi-winner before/after filter matching ordered by priority
//! - Typed parametric segments (`IntegerSegment`)
//! - Nearest-ancestor error handler resolution
//! - An async dispatcher tying routes, filters and error handlers together
//! - A JSON route manifest for declarative registration
//!
//! ## Quick Start
//!
//! ```
//! use lumen_router::{Method, RouteMapper};
//!
//! let mut mapper = RouteMapper::new();
//! mapper.map(Method::Get, "/", "home").unwrap();
//! mapper.map(Method::Get, "/u/matt", "matt").unwrap();
//! mapper.map(Method::Get, "/u/:username", "user").unwrap();
//! mapper.map(Method::Get, "/u/*", "user_files").unwrap();
//!
//! // Conflicts are reported here, all at once.
//! let routes = mapper.compile().unwrap();
//!
//! let found = routes.lookup(Method::Get, "/u/bob").unwrap().unwrap();
//! assert_eq!(*found.handler(), "user");
//! assert_eq!(found.params.get_str("username"), Some("bob"));
//!
//! // Unmatched paths are `Ok(None)`; malformed ones are errors.
//! assert!(routes.lookup(Method::Get, "/nope").unwrap().is_none());
//! assert!(routes.lookup(Method::Get, "/u//bob").is_err());
//! ```
//!
//! ## Pattern Syntax
//!
//! - `/users` matches exactly that literal segment
//! - `/users/:id` binds one segment to `id`
//! - `/files/*` absorbs one or more trailing segments
//!
//! At each depth a literal child is preferred over a parametric one, and a
//! parametric one over a wildcard. A branch that fails further down is
//! abandoned and the next candidate tried.
//!
//! ## Filters
//!
//! ```
//! use lumen_router::{FilterMapper, Method, Priority};
//!
//! let mut filters = FilterMapper::new();
//! filters.add_filter_before("/account/*", &[Method::Get], Priority::HIGH, "auth").unwrap();
//! filters.add_filter_before("/*", &[Method::Get], Priority::LOW, "cors").unwrap();
//! filters.add_filter_before("/account/password", &[Method::Get], Priority::NORMAL, "recent_auth").unwrap();
//!
//! let found = filters.lookup("/account/password", Method::Get).unwrap();
//! let names: Vec<_> = found.before_filters().iter().map(|b| *b.handler()).collect();
//! assert_eq!(names, vec!["auth", "recent_auth", "cors"]);
//! ```

mod dispatch;
mod error;
mod exception;
mod filter;
mod manifest;
mod path;
mod request;
mod response;
mod route;
mod segment;
mod tree;

pub use dispatch::{
    Dispatcher, ErrorHandler, Filter, FilterOutcome, Handler, error_handler, handler,
};
pub use error::{
    ExceptionMapError, HttpError, ManifestError, PathFormatError, Result, RouteFormatError,
    UnknownMethod,
};
pub use exception::{ErrorClass, ErrorHierarchy, ExceptionMapper};
pub use filter::{FilterBinding, FilterMapper, FilterMatch, Phase, Priority};
pub use manifest::{FilterDecl, RouteDecl, RouteManifest};
pub use path::{PathPattern, Segment, split_path};
pub use request::{Method, PathParams, Request};
pub use response::Response;
pub use route::{Route, RouteMapper, RouteMatch, RouteTable};
pub use segment::{
    IntegerSegment, ParamSegment, ParamValue, SegmentMatcher, StringSegment, matcher_for,
};
pub use tree::{ParamConflict, ParamPolicy, PathTree};
