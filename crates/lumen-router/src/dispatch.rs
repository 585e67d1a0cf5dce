//! Request dispatch over a compiled route table and a filter mapper.
//!
//! For each request the dispatcher:
//! 1. resolves the filters and runs the before-filters in order, exposing
//!    each filter's own params and wildcards on the request;
//! 2. unless a before-filter halted, runs the matched route handler (or
//!    answers 404 / 405);
//! 3. runs every after-filter, whatever happened before.
//!
//! Errors returned by filters and handlers are turned into responses through
//! an [`ExceptionMapper`] keyed by [`ErrorClass`].

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::error::{ExceptionMapError, HttpError};
use crate::exception::{ErrorClass, ExceptionMapper};
use crate::filter::{FilterBinding, FilterMapper};
use crate::request::Request;
use crate::response::Response;
use crate::route::RouteTable;

/// A boxed async route handler.
pub type Handler =
    Arc<dyn Fn(Request) -> BoxFuture<'static, Result<Response, HttpError>> + Send + Sync>;

/// Turns an error into a response.
pub type ErrorHandler = Arc<dyn Fn(&HttpError) -> Response + Send + Sync>;

/// Wraps an async function as a [`Handler`].
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, HttpError>> + Send + 'static,
{
    Arc::new(move |req| Box::pin(f(req)))
}

/// Wraps a function as an [`ErrorHandler`].
pub fn error_handler<F>(f: F) -> ErrorHandler
where
    F: Fn(&HttpError) -> Response + Send + Sync + 'static,
{
    Arc::new(f)
}

/// What a before-filter decided.
#[derive(Debug)]
pub enum FilterOutcome {
    /// Continue with the next filter, then the route.
    Continue,
    /// Skip the remaining before-filters and the route, answering this response.
    Halt(Response),
}

/// A filter wrapping route handlers.
///
/// Both hooks default to doing nothing, so a filter only implements the phase
/// it is registered for.
///
/// # Example
///
/// ```
/// use futures::future::BoxFuture;
/// use lumen_router::{Filter, FilterOutcome, HttpError, Request, Response};
///
/// struct RequireToken;
///
/// impl Filter for RequireToken {
///     fn before<'a>(
///         &'a self,
///         req: &'a mut Request,
///     ) -> BoxFuture<'a, Result<FilterOutcome, HttpError>> {
///         Box::pin(async move {
///             if req.get_header("Authorization").is_some() {
///                 Ok(FilterOutcome::Continue)
///             } else {
///                 Err(HttpError::not_authorized("missing token"))
///             }
///         })
///     }
/// }
/// ```
pub trait Filter: Send + Sync {
    /// Runs before the route handler. May modify the request or halt.
    fn before<'a>(
        &'a self,
        _req: &'a mut Request,
    ) -> BoxFuture<'a, Result<FilterOutcome, HttpError>> {
        Box::pin(async { Ok(FilterOutcome::Continue) })
    }

    /// Runs after the route handler. May replace the response.
    fn after<'a>(
        &'a self,
        _req: &'a Request,
        res: Response,
    ) -> BoxFuture<'a, Result<Response, HttpError>> {
        Box::pin(async move { Ok(res) })
    }
}

/// Serves requests from a compiled route table and a filter mapper.
pub struct Dispatcher {
    routes: RouteTable<Handler>,
    filters: FilterMapper<Arc<dyn Filter>>,
    errors: ExceptionMapper<ErrorClass, ErrorHandler>,
}

impl Dispatcher {
    /// Creates a dispatcher with no custom error handlers.
    #[must_use]
    pub fn new(routes: RouteTable<Handler>, filters: FilterMapper<Arc<dyn Filter>>) -> Self {
        Self {
            routes,
            filters,
            errors: ExceptionMapper::new(),
        }
    }

    /// Binds an error handler to `class` and every unbound class below it.
    ///
    /// # Errors
    ///
    /// Fails if `class` already has a handler.
    pub fn with_error_handler(
        mut self,
        class: ErrorClass,
        handler: ErrorHandler,
    ) -> Result<Self, ExceptionMapError> {
        self.errors.map(class, handler)?;
        Ok(self)
    }

    /// Returns the route table.
    #[must_use]
    pub const fn routes(&self) -> &RouteTable<Handler> {
        &self.routes
    }

    /// Handles one request.
    pub fn handle(&self, mut request: Request) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let path = request.path.clone();
            let method = request.method;

            let filters = match self.filters.lookup(&path, method) {
                Ok(filters) => filters,
                Err(e) => {
                    warn!(%method, path = %path, error = %e, "malformed request path");
                    return self.error_response(&HttpError::bad_request(e.to_string()));
                }
            };

            let mut halted = None;
            for binding in filters.before_filters() {
                expose(&mut request, binding, &path);
                let hook = binding.handler();
                let outcome = guarded(async { hook.before(&mut request).await }, || {
                    format!("before-filter for {} panicked", binding.pattern())
                })
                .await;
                match outcome {
                    Ok(FilterOutcome::Continue) => {}
                    Ok(FilterOutcome::Halt(response)) => {
                        debug!(pattern = %binding.pattern(), "request halted by filter");
                        halted = Some(response);
                        break;
                    }
                    Err(e) => {
                        halted = Some(self.error_response(&e));
                        break;
                    }
                }
            }

            let mut response = match halted {
                Some(response) => response,
                None => self.route(&mut request).await,
            };

            for binding in filters.after_filters() {
                expose(&mut request, binding, &path);
                let hook = binding.handler();
                let outcome = guarded(async { hook.after(&request, response).await }, || {
                    format!("after-filter for {} panicked", binding.pattern())
                })
                .await;
                response = match outcome {
                    Ok(response) => response,
                    Err(e) => self.error_response(&e),
                };
            }

            response
        })
    }

    async fn route(&self, request: &mut Request) -> Response {
        let method = request.method;
        let found = match self.routes.lookup(method, &request.path) {
            Ok(found) => found,
            Err(e) => return self.error_response(&HttpError::bad_request(e.to_string())),
        };

        let Some(found) = found else {
            let allowed = self.routes.allowed_methods(&request.path).unwrap_or_default();
            if allowed.is_empty() {
                return self.error_response(&HttpError::not_found(format!(
                    "no route for {}",
                    request.path
                )));
            }
            let allow = allowed
                .iter()
                .map(|m| m.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            return self
                .error_response(&HttpError::method_not_allowed(format!(
                    "{method} is not allowed for {}",
                    request.path
                )))
                .header("Allow", allow);
        };

        request.params = found.params;
        request.wildcards = found.wildcards;

        let route = found.route;
        let req = request.clone();
        let outcome = guarded(async move { (route.handler)(req).await }, || {
            format!("handler for {} panicked", route.pattern)
        })
        .await;
        match outcome {
            Ok(response) => response,
            Err(e) => self.error_response(&e),
        }
    }

    fn error_response(&self, error: &HttpError) -> Response {
        warn!(class = ?error.class, status = error.status(), %error, "request failed");
        match self.errors.get(error.class) {
            Some(handler) => handler(error),
            None => Response::from_error(error),
        }
    }
}

/// Runs `fut`, turning a panic while building or polling it into an
/// [`ErrorClass::Panic`] error.
async fn guarded<T, F>(fut: F, describe: impl FnOnce() -> String) -> Result<T, HttpError>
where
    F: Future<Output = Result<T, HttpError>>,
{
    AssertUnwindSafe(fut)
        .catch_unwind()
        .await
        .unwrap_or_else(|_| Err(HttpError::new(ErrorClass::Panic, describe())))
}

/// Replaces the request's params and wildcards with the ones `binding` binds.
fn expose(request: &mut Request, binding: &FilterBinding<Arc<dyn Filter>>, path: &str) {
    request.params = binding.params(path).unwrap_or_default();
    request.wildcards = binding.wildcards(path).unwrap_or_default();
}
