//! DTOs for the analytics API payloads.
//!
//! # Design
//! These mirror the server's JSON but are defined independently of the
//! mock-server crate; integration tests catch drift between the two. Response
//! types are lenient (`#[serde(default)]` on optional fields) because the
//! server omits empty fields.

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// One wheel-wear prediction input row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WheelInput {
    pub locomotive_series: String,
    pub locomotive_number: i64,
    pub depo: String,
    pub steel_num: String,
    pub mileage_start: f64,
}

impl WheelInput {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.locomotive_series.trim().is_empty() {
            return Err(ApiError::Validation("locomotive series cannot be empty".into()));
        }
        if self.locomotive_number <= 0 {
            return Err(ApiError::Validation("locomotive number must be positive".into()));
        }
        if self.depo.trim().is_empty() {
            return Err(ApiError::Validation("depo cannot be empty".into()));
        }
        if self.steel_num.trim().is_empty() {
            return Err(ApiError::Validation("steel number cannot be empty".into()));
        }
        if self.mileage_start.is_nan() || self.mileage_start < 0.0 {
            return Err(ApiError::Validation("mileage must be non-negative".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthStatus {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelInfo {
    pub model_type: String,
    pub features_count: u32,
    pub version: String,
    #[serde(default)]
    pub features: Vec<String>,
}

/// Response of `/ml/predict` and `/ml/upload`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub predictions: Vec<f64>,
    #[serde(default)]
    pub inputs: Vec<WheelInput>,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub processed_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DepotsList {
    pub total: usize,
    pub depots: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DepotInfo {
    pub depo_id: String,
    pub region: String,
    pub locomotive_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerateMapsRequest {
    pub depo_id: String,
    pub max_locomotives: u32,
}

impl GenerateMapsRequest {
    pub const MAX_LOCOMOTIVES: u32 = 20;

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.depo_id.trim().is_empty() {
            return Err(ApiError::Validation("depo_id is required".into()));
        }
        if !(1..=Self::MAX_LOCOMOTIVES).contains(&self.max_locomotives) {
            return Err(ApiError::Validation(format!(
                "max_locomotives must be between 1 and {}",
                Self::MAX_LOCOMOTIVES
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerateMapsResponse {
    pub depot_id: String,
    pub generated_at: String,
    pub maps: MapsList,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MapsList {
    pub overview: String,
    pub heatmap: String,
    #[serde(default)]
    pub locomotives: Vec<LocomotiveMap>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocomotiveMap {
    pub key: String,
    pub model: String,
    pub number: String,
    pub url: String,
    pub trip_count: u32,
}
