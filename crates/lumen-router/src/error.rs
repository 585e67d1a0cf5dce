//! Error types for routing.

use thiserror::Error;

use crate::exception::ErrorClass;
use crate::request::Method;

/// Errors raised while registering or compiling routes and filters.
///
/// These are startup-time errors: a server should refuse to start rather than
/// serve traffic with an ambiguous routing table.
#[derive(Debug, Error)]
pub enum RouteFormatError {
    /// A pattern contains an empty segment (e.g. `/a//b`).
    #[error("invalid pattern '{pattern}': empty path segment")]
    EmptySegment {
        /// The offending pattern.
        pattern: String,
    },

    /// A wildcard is followed by more segments.
    #[error("invalid pattern '{pattern}': wildcards may only appear at the end of a path")]
    WildcardNotTerminal {
        /// The offending pattern.
        pattern: String,
    },

    /// A typed matcher was attached to a parameter the pattern does not declare.
    #[error("invalid pattern '{pattern}': no parameter named '{name}'")]
    UnknownParam {
        /// The pattern being typed.
        pattern: String,
        /// The missing parameter name.
        name: String,
    },

    /// A literal route segment contains characters outside `[A-Za-z0-9_.~-]`.
    #[error("routing path {method} {pattern} contains illegal characters in segment '{segment}'")]
    InvalidCharacters {
        /// Method of the offending route.
        method: Method,
        /// The offending pattern.
        pattern: String,
        /// The literal segment that failed validation.
        segment: String,
    },

    /// Two parametric segments with different names or types share a tree position.
    #[error(
        "conflicting parameters at the same position: {method} {pattern} ({param}) and {existing_pattern} ({existing_param})"
    )]
    ParamConflict {
        /// Method of the route that triggered the conflict.
        method: Method,
        /// Pattern of the route that triggered the conflict.
        pattern: String,
        /// The rejected parametric segment.
        param: String,
        /// Pattern that first claimed the position.
        existing_pattern: String,
        /// The parametric segment already installed.
        existing_param: String,
    },

    /// Two routes for the same method end in a wildcard at the same position.
    #[error("conflicting wildcard routes: {method} {pattern} and {existing_pattern}")]
    WildcardConflict {
        /// Method shared by both routes.
        method: Method,
        /// Pattern of the later registration.
        pattern: String,
        /// Pattern of the earlier registration.
        existing_pattern: String,
    },

    /// The same method and exact pattern were registered twice.
    #[error("duplicate route: {method} {pattern} (already mapped by {existing_pattern})")]
    DuplicateRoute {
        /// Method shared by both routes.
        method: Method,
        /// Pattern of the later registration.
        pattern: String,
        /// Pattern of the earlier registration.
        existing_pattern: String,
    },

    /// Several errors were found in one compile pass.
    #[error("{} routing errors:\n{}", .0.len(), .0.iter().map(|e| format!("  - {e}")).collect::<Vec<_>>().join("\n"))]
    Multiple(Vec<RouteFormatError>),
}

impl RouteFormatError {
    /// Collapses a list of errors: `None` when empty, the error itself when
    /// there is exactly one, [`RouteFormatError::Multiple`] otherwise.
    #[must_use]
    pub fn aggregate(mut errors: Vec<Self>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Multiple(errors)),
        }
    }

    /// Returns the individual errors, flattening [`RouteFormatError::Multiple`].
    #[must_use]
    pub fn errors(&self) -> Vec<&Self> {
        match self {
            Self::Multiple(errors) => errors.iter().flat_map(Self::errors).collect(),
            other => vec![other],
        }
    }
}

/// A request path that cannot be split into segments.
///
/// Distinct from "no route matched" so callers can answer 400 instead of 404.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathFormatError {
    /// The path contains an empty internal segment (`//`).
    #[error("malformed request path '{path}': empty path segment")]
    EmptySegment {
        /// The offending path.
        path: String,
    },
}

/// Errors from [`ExceptionMapper`](crate::ExceptionMapper) registration.
#[derive(Debug, Error)]
pub enum ExceptionMapError {
    /// A handler is already bound to this error class.
    #[error("an error handler is already mapped for {0}")]
    AlreadyMapped(String),
}

/// Errors raised while loading a [`RouteManifest`](crate::RouteManifest).
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Reading the manifest file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The manifest is not valid JSON or does not fit the schema.
    #[error("invalid manifest: {0}")]
    Json(#[from] serde_json::Error),

    /// The resolver did not recognise a handler name.
    #[error("unknown handler '{0}'")]
    UnknownHandler(String),

    /// A route declared an empty method list.
    #[error("route '{path}' declares no methods")]
    NoMethods {
        /// The route's path pattern.
        path: String,
    },

    /// A parameter was typed with an unknown matcher kind.
    #[error("unknown matcher kind '{kind}' for parameter '{param}'")]
    UnknownMatcher {
        /// The parameter being typed.
        param: String,
        /// The unrecognised kind.
        kind: String,
    },

    /// Registration or compilation failed.
    #[error(transparent)]
    Route(#[from] RouteFormatError),
}

/// An HTTP method name that is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown HTTP method: {0}")]
pub struct UnknownMethod(pub String);

/// An error returned by route handlers and filters.
///
/// The [`ErrorClass`] selects the error handler through the dispatcher's
/// [`ExceptionMapper`](crate::ExceptionMapper).
#[derive(Debug, Clone, Error)]
#[error("{class}: {message}")]
pub struct HttpError {
    /// Position of this error in the error hierarchy.
    pub class: ErrorClass,
    /// Human-readable detail.
    pub message: String,
}

impl HttpError {
    /// Creates a new error of the given class.
    pub fn new(class: ErrorClass, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
        }
    }

    /// Creates a 400 Bad Request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::BadRequest, message)
    }

    /// Creates a 401 Not Authorized error.
    pub fn not_authorized(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::NotAuthorized, message)
    }

    /// Creates a 404 Not Found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::NotFound, message)
    }

    /// Creates a 405 Method Not Allowed error.
    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::MethodNotAllowed, message)
    }

    /// Creates a 500 Internal Server Error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InternalServerError, message)
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.class.status()
    }
}

/// Result type alias for route registration.
pub type Result<T> = std::result::Result<T, RouteFormatError>;
