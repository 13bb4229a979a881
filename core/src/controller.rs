//! One network round trip reduced to one `Outcome`.
//!
//! # Design
//! `RequestLifecycleController` holds only a base URL, a default timeout and
//! an immutable transport handle, so any number of `execute` calls can run
//! concurrently against `&self`. Each call is split into three steps:
//!
//! 1. `build_request` turns the descriptor into an `HttpRequest` (URL join,
//!    default method, cache-defeating headers, content type).
//! 2. The transport future is raced against `tokio::time::timeout`. Whichever
//!    finishes first decides the call; the loser is dropped, which cancels
//!    the in-flight request or the pending timer.
//! 3. `classify` maps the response to `Success`, `http-error` or `network`.
//!
//! Steps 1 and 3 are pure and usable without any I/O.

use std::time::{Duration, Instant};

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ClientSettings;
use crate::descriptor::RequestDescriptor;
use crate::http::{find_header, HttpRequest, HttpResponse, RequestBody};
use crate::outcome::{CallState, Failure, Outcome};
use crate::transport::{ReqwestTransport, Transport, TransportError};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const CACHE_HEADERS: [(&str, &str); 2] = [("Cache-Control", "no-cache"), ("Pragma", "no-cache")];

#[derive(Debug, Clone)]
pub struct RequestLifecycleController<T = ReqwestTransport> {
    base_url: String,
    default_timeout: Duration,
    transport: T,
}

impl RequestLifecycleController<ReqwestTransport> {
    /// Controller over a fresh `ReqwestTransport` with the 30 second default.
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        Ok(Self::with_transport(base_url, ReqwestTransport::new()?))
    }

    pub fn from_settings(settings: &ClientSettings) -> Result<Self, TransportError> {
        Ok(Self::new(&settings.base_url)?.with_default_timeout(settings.default_timeout()))
    }
}

impl<T: Transport> RequestLifecycleController<T> {
    pub fn with_transport(base_url: &str, transport: T) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            default_timeout: DEFAULT_TIMEOUT,
            transport,
        }
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Timeout that `execute` would apply to `descriptor`.
    pub fn effective_timeout(&self, descriptor: &RequestDescriptor) -> Duration {
        descriptor.timeout().unwrap_or(self.default_timeout)
    }

    /// Produce the request `execute` would send for `descriptor`.
    pub fn build_request(&self, descriptor: RequestDescriptor) -> HttpRequest {
        let (path, method, body, headers) = descriptor.into_parts();

        let mut headers = headers.unwrap_or_else(|| {
            CACHE_HEADERS
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect()
        });
        if matches!(body, Some(RequestBody::Json(_)))
            && find_header(&headers, "content-type").is_none()
        {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }

        HttpRequest {
            method,
            url: self.resolve(&path),
            headers,
            body,
        }
    }

    fn resolve(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    /// Perform one round trip. Always settles exactly once, never errors.
    pub async fn execute(&self, descriptor: RequestDescriptor) -> Outcome {
        let timeout = self.effective_timeout(&descriptor);
        let request = self.build_request(descriptor);
        let method = request.method;
        let url = request.url.clone();

        let state = CallState::Idle.begin();
        let started = Instant::now();
        debug!(%method, %url, timeout_ms = timeout.as_millis() as u64, "dispatching request");

        let outcome = match tokio::time::timeout(timeout, self.transport.send(request)).await {
            Ok(Ok(response)) => classify(response),
            Ok(Err(err)) if err.is_timeout() => Outcome::Failure(Failure::Timeout { after: timeout }),
            Ok(Err(err)) => Outcome::Failure(Failure::Network {
                detail: err.to_string(),
            }),
            Err(_) => Outcome::Failure(Failure::Timeout { after: timeout }),
        };

        let state = state.settle(&outcome);
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Outcome::Success { status, .. } => {
                info!(%method, %url, status, elapsed_ms, ?state, "request settled");
            }
            Outcome::Failure(Failure::HttpError { status, .. }) => {
                info!(
                    %method,
                    %url,
                    status,
                    elapsed_ms,
                    ?state,
                    error = outcome.error_message().unwrap_or(""),
                    "request settled"
                );
            }
            Outcome::Failure(Failure::Timeout { .. }) => {
                warn!(%method, %url, elapsed_ms, ?state, "request timed out; transport cancelled");
            }
            Outcome::Failure(Failure::Network { detail }) => {
                warn!(%method, %url, elapsed_ms, ?state, %detail, "request failed");
            }
        }
        outcome
    }

    /// Like `execute`, but abandons the call when `token` is cancelled first.
    ///
    /// Returns `None` if the caller cancelled before settlement; the transport
    /// future is dropped and no outcome is ever delivered for that call.
    pub async fn execute_cancellable(
        &self,
        descriptor: RequestDescriptor,
        token: &CancellationToken,
    ) -> Option<Outcome> {
        let url = self.resolve(descriptor.path());
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                info!(%url, "request cancelled by caller");
                None
            }
            outcome = self.execute(descriptor) => Some(outcome),
        }
    }
}

/// Classify a received response.
///
/// The body is always decoded as JSON first; a body that does not decode,
/// including an empty one, is a `network` failure whatever the status.
pub fn classify(response: HttpResponse) -> Outcome {
    let body: Value = match serde_json::from_str(&response.body) {
        Ok(body) => body,
        Err(e) => {
            return Outcome::Failure(Failure::Network {
                detail: format!("invalid JSON in HTTP {} response: {e}", response.status),
            })
        }
    };
    if response.is_success() {
        Outcome::Success {
            status: response.status,
            body,
        }
    } else {
        Outcome::Failure(Failure::HttpError {
            status: response.status,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::future::pending;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::http::{FilePart, HttpMethod};
    use crate::outcome::FailureReason;

    const BASE_URL: &str = "http://localhost:8080";

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    /// Answers every request with the same canned response and records it.
    struct Canned {
        status: u16,
        body: String,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl Canned {
        fn new(status: u16, body: &str) -> Self {
            Self {
                status,
                body: body.to_string(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Transport for Canned {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.seen.lock().unwrap().push(request);
            Ok(response(self.status, &self.body))
        }
    }

    /// Never answers. Flags `dropped` when its in-flight future is dropped.
    #[derive(Default)]
    struct Stalled {
        started: AtomicUsize,
        dropped: Arc<AtomicBool>,
    }

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Transport for Stalled {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            let _flag = DropFlag(self.dropped.clone());
            pending().await
        }
    }

    struct Failing(fn() -> TransportError);

    #[async_trait]
    impl Transport for Failing {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
            Err((self.0)())
        }
    }

    /// Answers after `delay` of (virtual) time.
    struct Slow {
        delay: Duration,
    }

    #[async_trait]
    impl Transport for Slow {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
            tokio::time::sleep(self.delay).await;
            Ok(response(200, r#"{"status":"healthy"}"#))
        }
    }

    fn controller<T: Transport>(transport: T) -> RequestLifecycleController<T> {
        RequestLifecycleController::with_transport(BASE_URL, transport)
    }

    // --- build_request ---

    #[test]
    fn build_request_adds_cache_defeating_headers() {
        let c = controller(Canned::new(200, "{}"));
        let req = c.build_request(RequestDescriptor::get("/api/v1/ml/health"));
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:8080/api/v1/ml/health");
        assert_eq!(req.header("Cache-Control"), Some("no-cache"));
        assert_eq!(req.header("Pragma"), Some("no-cache"));
        assert!(req.body.is_none());
    }

    #[test]
    fn explicit_headers_replace_defaults() {
        let c = controller(Canned::new(200, "{}"));
        let descriptor = RequestDescriptor::get("/api/v1/ml/info")
            .with_headers(vec![("X-Trace".to_string(), "abc".to_string())]);
        let req = c.build_request(descriptor);
        assert_eq!(req.headers, vec![("X-Trace".to_string(), "abc".to_string())]);
    }

    #[test]
    fn json_body_gets_content_type_once() {
        let c = controller(Canned::new(200, "{}"));
        let req = c.build_request(
            RequestDescriptor::post_json("/api/v1/ml/predict", &json!([])).unwrap(),
        );
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.header("content-type"), Some("application/json"));

        let descriptor = RequestDescriptor::post_json("/api/v1/ml/predict", &json!([]))
            .unwrap()
            .with_headers(vec![(
                "content-type".to_string(),
                "application/json; charset=utf-8".to_string(),
            )]);
        let req = c.build_request(descriptor);
        assert_eq!(req.headers.len(), 1);
    }

    #[test]
    fn multipart_body_has_no_json_content_type() {
        let c = controller(Canned::new(200, "{}"));
        let part = FilePart {
            field: "file".to_string(),
            file_name: "batch.json".to_string(),
            content: b"[]".to_vec(),
        };
        let req = c.build_request(RequestDescriptor::post_file("/api/v1/ml/upload", part));
        assert!(req.header("content-type").is_none());
        assert!(matches!(req.body, Some(RequestBody::Multipart(_))));
    }

    #[test]
    fn url_joining_handles_slashes_and_absolute_urls() {
        let c = RequestLifecycleController::with_transport(
            "http://localhost:8080/",
            Canned::new(200, "{}"),
        );
        assert_eq!(c.base_url(), "http://localhost:8080");
        assert_eq!(
            c.build_request(RequestDescriptor::get("api/v1/task3/depots")).url,
            "http://localhost:8080/api/v1/task3/depots"
        );
        assert_eq!(
            c.build_request(RequestDescriptor::get("https://maps.example/overview.html"))
                .url,
            "https://maps.example/overview.html"
        );
    }

    #[test]
    fn timeout_defaults_and_overrides() {
        let c = controller(Canned::new(200, "{}"));
        assert_eq!(c.effective_timeout(&RequestDescriptor::get("/")), DEFAULT_TIMEOUT);
        let c = c.with_default_timeout(Duration::from_secs(5));
        assert_eq!(
            c.effective_timeout(&RequestDescriptor::get("/")),
            Duration::from_secs(5)
        );
        assert_eq!(
            c.effective_timeout(&RequestDescriptor::get("/").with_timeout(Duration::from_secs(1))),
            Duration::from_secs(1)
        );
    }

    // --- classify ---

    #[test]
    fn classify_2xx_json_is_success() {
        assert_eq!(
            classify(response(200, "{}")),
            Outcome::Success {
                status: 200,
                body: json!({})
            }
        );
    }

    #[test]
    fn classify_non_2xx_json_is_http_error() {
        let outcome = classify(response(404, r#"{"error":"not found"}"#));
        assert_eq!(
            outcome,
            Outcome::Failure(Failure::HttpError {
                status: 404,
                body: json!({"error": "not found"})
            })
        );
        assert_eq!(outcome.error_message(), Some("not found"));
    }

    #[test]
    fn classify_malformed_body_is_network_even_on_200() {
        let outcome = classify(response(200, "<html>not json</html>"));
        assert_eq!(outcome.reason(), Some(FailureReason::Network));
    }

    #[test]
    fn classify_empty_body_is_network() {
        assert_eq!(
            classify(response(204, "")).reason(),
            Some(FailureReason::Network)
        );
        assert_eq!(
            classify(response(500, "")).reason(),
            Some(FailureReason::Network)
        );
    }

    // --- execute ---

    #[tokio::test]
    async fn execute_success_returns_decoded_body() {
        let c = controller(Canned::new(200, "{}"));
        let outcome = c.execute(RequestDescriptor::get("/api/v1/ml/health")).await;
        assert_eq!(
            outcome,
            Outcome::Success {
                status: 200,
                body: json!({})
            }
        );
        let seen = c.transport().seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].header("Pragma"), Some("no-cache"));
    }

    #[tokio::test]
    async fn execute_is_repeatable_for_identical_descriptors() {
        let c = controller(Canned::new(200, r#"{"status":"healthy"}"#));
        let first = c.execute(RequestDescriptor::get("/api/v1/ml/health")).await;
        let second = c.execute(RequestDescriptor::get("/api/v1/ml/health")).await;
        assert_eq!(first, second);
    }

    #[tokio::test(start_paused = true)]
    async fn execute_times_out_and_drops_transport() {
        let c = controller(Stalled::default());
        let descriptor = RequestDescriptor::post_json(
            "/api/v1/ml/predict",
            &json!([{
                "locomotive_series": "VL80",
                "locomotive_number": 123,
                "depo": "Depo1",
                "steel_num": "Steel1",
                "mileage_start": 50000
            }]),
        )
        .unwrap();

        let started = tokio::time::Instant::now();
        let outcome = c.execute(descriptor).await;

        assert_eq!(
            outcome,
            Outcome::Failure(Failure::Timeout {
                after: DEFAULT_TIMEOUT
            })
        );
        assert!(started.elapsed() >= DEFAULT_TIMEOUT);
        assert_eq!(c.transport().started.load(Ordering::SeqCst), 1);
        assert!(c.transport().dropped.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn per_call_timeout_overrides_default() {
        let c = controller(Slow {
            delay: Duration::from_secs(2),
        });
        let fast = c
            .execute(RequestDescriptor::get("/").with_timeout(Duration::from_secs(1)))
            .await;
        assert_eq!(fast.reason(), Some(FailureReason::Timeout));

        let patient = c.execute(RequestDescriptor::get("/")).await;
        assert!(patient.is_success());
    }

    #[tokio::test]
    async fn transport_timeout_error_is_classified_as_timeout() {
        let c = controller(Failing(|| TransportError::Timeout("deadline".into())));
        let outcome = c.execute(RequestDescriptor::get("/")).await;
        assert_eq!(outcome.reason(), Some(FailureReason::Timeout));
    }

    #[tokio::test]
    async fn transport_error_is_network_with_detail() {
        let c = controller(Failing(|| TransportError::Connect("connection refused".into())));
        let outcome = c.execute(RequestDescriptor::get("/")).await;
        assert_eq!(
            outcome,
            Outcome::Failure(Failure::Network {
                detail: "connection failed: connection refused".to_string()
            })
        );
    }

    #[tokio::test]
    async fn execute_http_error_keeps_body() {
        let c = controller(Canned::new(400, r#"{"success":false,"error":"too many items (max 1000)"}"#));
        let outcome = c.execute(RequestDescriptor::get("/")).await;
        assert_eq!(outcome.status(), Some(400));
        assert_eq!(outcome.error_message(), Some("too many items (max 1000)"));
    }

    // --- execute_cancellable ---

    #[tokio::test(start_paused = true)]
    async fn caller_cancellation_suppresses_outcome_and_drops_transport() {
        let c = controller(Stalled::default());
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let started = tokio::time::Instant::now();
        let outcome = c
            .execute_cancellable(RequestDescriptor::get("/api/v1/task3/depots"), &token)
            .await;

        assert!(outcome.is_none());
        assert!(started.elapsed() < DEFAULT_TIMEOUT);
        assert!(c.transport().dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn pre_cancelled_token_never_starts_transport() {
        let c = controller(Stalled::default());
        let token = CancellationToken::new();
        token.cancel();
        let outcome = c
            .execute_cancellable(RequestDescriptor::get("/"), &token)
            .await;
        assert!(outcome.is_none());
        assert_eq!(c.transport().started.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancelling_after_settlement_changes_nothing() {
        let c = controller(Canned::new(200, "{}"));
        let token = CancellationToken::new();
        let outcome = c
            .execute_cancellable(RequestDescriptor::get("/"), &token)
            .await;
        token.cancel();
        assert!(outcome.is_some_and(|o| o.is_success()));
    }
}
