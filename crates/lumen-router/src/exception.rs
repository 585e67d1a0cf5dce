//! Nearest-ancestor error handler resolution.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use crate::error::ExceptionMapError;

/// A closed error hierarchy: every class except the root has one parent.
pub trait ErrorHierarchy: Copy + Eq + Hash + fmt::Debug {
    /// Returns the direct parent class, or `None` for the root.
    fn parent(self) -> Option<Self>;

    /// Iterates from `self` up to the root, `self` first.
    fn ancestors(self) -> impl Iterator<Item = Self> {
        std::iter::successors(Some(self), |class| class.parent())
    }
}

/// Error classes understood by the [`Dispatcher`](crate::Dispatcher).
///
/// ```text
/// Any
/// ├── Recoverable
/// │   └── Http
/// │       ├── BadRequest, NotAuthorized, AccessViolation, NotFound
/// │       └── MethodNotAllowed, NotImplemented, InternalServerError
/// └── Fatal
///     └── Panic
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Root of the hierarchy.
    Any,
    /// Errors a request can recover from.
    Recoverable,
    /// Errors carrying an HTTP status.
    Http,
    /// 400
    BadRequest,
    /// 401
    NotAuthorized,
    /// 403
    AccessViolation,
    /// 404
    NotFound,
    /// 405
    MethodNotAllowed,
    /// 501
    NotImplemented,
    /// 500
    InternalServerError,
    /// Errors that should not be handled as ordinary failures.
    Fatal,
    /// A handler panicked.
    Panic,
}

impl ErrorClass {
    /// Returns the HTTP status code answered for this class.
    #[must_use]
    pub const fn status(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::NotAuthorized => 401,
            Self::AccessViolation => 403,
            Self::NotFound => 404,
            Self::MethodNotAllowed => 405,
            Self::NotImplemented => 501,
            Self::Any
            | Self::Recoverable
            | Self::Http
            | Self::InternalServerError
            | Self::Fatal
            | Self::Panic => 500,
        }
    }

    /// Returns the class for an HTTP error status, defaulting to `InternalServerError`.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            400 => Self::BadRequest,
            401 => Self::NotAuthorized,
            403 => Self::AccessViolation,
            404 => Self::NotFound,
            405 => Self::MethodNotAllowed,
            501 => Self::NotImplemented,
            _ => Self::InternalServerError,
        }
    }
}

impl ErrorHierarchy for ErrorClass {
    fn parent(self) -> Option<Self> {
        match self {
            Self::Any => None,
            Self::Recoverable | Self::Fatal => Some(Self::Any),
            Self::Http => Some(Self::Recoverable),
            Self::Panic => Some(Self::Fatal),
            Self::BadRequest
            | Self::NotAuthorized
            | Self::AccessViolation
            | Self::NotFound
            | Self::MethodNotAllowed
            | Self::NotImplemented
            | Self::InternalServerError => Some(Self::Http),
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Any => "error",
            Self::Recoverable => "recoverable error",
            Self::Http => "HTTP error",
            Self::BadRequest => "bad request",
            Self::NotAuthorized => "not authorized",
            Self::AccessViolation => "access violation",
            Self::NotFound => "not found",
            Self::MethodNotAllowed => "method not allowed",
            Self::NotImplemented => "not implemented",
            Self::InternalServerError => "internal server error",
            Self::Fatal => "fatal error",
            Self::Panic => "panic",
        };
        f.write_str(name)
    }
}

/// Maps error classes to values, resolving unbound classes to their nearest
/// bound ancestor.
///
/// Lookups do not cache, so a mapper behind a shared reference is never
/// mutated by request threads.
#[derive(Debug, Clone)]
pub struct ExceptionMapper<K, V> {
    bindings: HashMap<K, V>,
}

impl<K: ErrorHierarchy, V> Default for ExceptionMapper<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ErrorHierarchy, V> ExceptionMapper<K, V> {
    /// Creates an empty mapper.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// Binds `value` to `class`.
    ///
    /// # Errors
    ///
    /// Returns [`ExceptionMapError::AlreadyMapped`] if `class` is already bound.
    pub fn map(&mut self, class: K, value: V) -> Result<(), ExceptionMapError> {
        if self.bindings.contains_key(&class) {
            return Err(ExceptionMapError::AlreadyMapped(format!("{class:?}")));
        }
        self.bindings.insert(class, value);
        Ok(())
    }

    /// Returns the value bound to `class` or to its nearest bound ancestor.
    #[must_use]
    pub fn get(&self, class: K) -> Option<&V> {
        class.ancestors().find_map(|c| self.bindings.get(&c))
    }

    /// Returns true if [`Self::get`] would find a value.
    #[must_use]
    pub fn has(&self, class: K) -> bool {
        self.get(class).is_some()
    }

    /// Removes every binding.
    pub fn clear(&mut self) {
        self.bindings.clear();
    }

    /// Returns the number of direct bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns true if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
