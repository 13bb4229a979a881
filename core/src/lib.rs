//! Request lifecycle core for the locomotive analytics API.
//!
//! # Overview
//! Every call the application makes (health checks, data loads, prediction
//! and map-generation submissions) goes through one
//! `RequestLifecycleController::execute`, which enforces a uniform timeout
//! and cache-busting headers and reduces the round trip to exactly one
//! `Outcome`.
//!
//! # Design
//! - `RequestLifecycleController` keeps no per-call state; concurrent calls
//!   share nothing mutable.
//! - Failures are `Outcome` values (`timeout`, `network`, `http-error`), never
//!   errors. `ApiError` only covers input validation and typed decoding.
//! - The network is behind the `Transport` trait; `ReqwestTransport` is the
//!   production implementation.
//! - `ApiClient` builds descriptors for each endpoint; DTOs in `types` are
//!   defined independently from the mock-server crate and integration tests
//!   catch schema drift.

pub mod api;
pub mod config;
pub mod controller;
pub mod descriptor;
pub mod error;
pub mod http;
pub mod outcome;
pub mod transport;
pub mod types;

pub use api::ApiClient;
pub use config::{load_settings, read_settings, ClientSettings};
pub use controller::{classify, RequestLifecycleController, DEFAULT_TIMEOUT};
pub use descriptor::RequestDescriptor;
pub use error::ApiError;
pub use http::{FilePart, HttpMethod, HttpRequest, HttpResponse, RequestBody};
pub use outcome::{CallState, Failure, FailureReason, Outcome};
pub use transport::{ReqwestTransport, Transport, TransportError};
pub use types::{
    DepotInfo, DepotsList, GenerateMapsRequest, GenerateMapsResponse, HealthStatus, LocomotiveMap,
    MapsList, ModelInfo, PredictionResponse, WheelInput,
};
pub use tokio_util::sync::CancellationToken;
