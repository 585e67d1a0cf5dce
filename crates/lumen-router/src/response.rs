//! HTTP response type.

use std::collections::HashMap;

use crate::error::HttpError;

/// An HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: Vec<u8>,
}

impl Response {
    /// Creates an empty response with the given status.
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// Creates a 200 OK response.
    #[must_use]
    pub fn ok() -> Self {
        Self::new(200)
    }

    /// Creates a 200 response with plain text content.
    pub fn text(body: impl Into<String>) -> Self {
        let body: String = body.into();
        Self::ok()
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(body)
    }

    /// Creates a 200 response with JSON content.
    pub fn json<T: serde::Serialize>(data: &T) -> Self {
        match serde_json::to_vec(data) {
            Ok(body) => Self::ok()
                .header("Content-Type", "application/json")
                .body(body),
            Err(_) => Self::error(500),
        }
    }

    /// Creates a plain text error response carrying the status text.
    #[must_use]
    pub fn error(status: u16) -> Self {
        Self::text(status_text(status)).status(status)
    }

    /// Creates a plain text response for a handler error.
    #[must_use]
    pub fn from_error(error: &HttpError) -> Self {
        Self::text(error.message.clone()).status(error.status())
    }

    /// Sets a header.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Sets the status code.
    #[must_use]
    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Gets a header value, case-insensitively.
    #[must_use]
    pub fn get_header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the body as a string.
    #[must_use]
    pub fn body_string(&self) -> Option<String> {
        String::from_utf8(self.body.clone()).ok()
    }

    /// Returns the status text for the current status code.
    #[must_use]
    pub const fn status_text(&self) -> &'static str {
        status_text(self.status)
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::ok()
    }
}

const fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        _ => "Unknown",
    }
}
