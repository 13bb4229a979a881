//! Immutable description of one request.
//!
//! A descriptor is built with consuming `with_*` methods, handed to
//! `RequestLifecycleController::execute`, and consumed there. Fields are
//! private; once built it cannot be altered.

use std::time::Duration;

use serde::Serialize;

use crate::error::ApiError;
use crate::http::{FilePart, HttpMethod, RequestBody};

#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    path: String,
    method: HttpMethod,
    body: Option<RequestBody>,
    headers: Option<Vec<(String, String)>>,
    timeout: Option<Duration>,
}

impl RequestDescriptor {
    /// A `GET` for `path`. A path beginning with `http://` or `https://` is
    /// used as-is; anything else is joined onto the controller's base URL.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: HttpMethod::default(),
            body: None,
            headers: None,
            timeout: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(path)
    }

    pub fn post_json<T: Serialize + ?Sized>(
        path: impl Into<String>,
        payload: &T,
    ) -> Result<Self, ApiError> {
        let body =
            serde_json::to_string(payload).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        Ok(Self::new(path)
            .with_method(HttpMethod::Post)
            .with_body(RequestBody::Json(body)))
    }

    pub fn post_file(path: impl Into<String>, part: FilePart) -> Self {
        Self::new(path)
            .with_method(HttpMethod::Post)
            .with_body(RequestBody::Multipart(part))
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Replace the default headers entirely, including the cache-defeating
    /// pair. Pass an empty list to send no extra headers at all.
    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Per-call timeout, overriding the controller default.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    pub fn headers(&self) -> Option<&[(String, String)]> {
        self.headers.as_deref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        String,
        HttpMethod,
        Option<RequestBody>,
        Option<Vec<(String, String)>>,
    ) {
        (self.path, self.method, self.body, self.headers)
    }
}
