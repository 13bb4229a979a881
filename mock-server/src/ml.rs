//! `/api/v1/ml/*`: health, model info, batch prediction and file upload.
//!
//! Predictions come from a deterministic formula rather than a trained model,
//! so the same input always yields the same number.

use axum::{
    extract::{rejection::JsonRejection, Multipart},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::ErrorBody;

pub const MAX_ITEMS: usize = 1000;
pub const MAX_FILE_SIZE: usize = 10 << 20;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WheelInput {
    pub locomotive_series: String,
    pub locomotive_number: i64,
    pub depo: String,
    pub steel_num: String,
    pub mileage_start: f64,
}

impl WheelInput {
    fn validate(&self) -> Result<(), &'static str> {
        if self.locomotive_series.is_empty() {
            return Err("locomotive series cannot be empty");
        }
        if self.locomotive_number <= 0 {
            return Err("locomotive number must be positive");
        }
        if self.depo.is_empty() {
            return Err("depo cannot be empty");
        }
        if self.steel_num.is_empty() {
            return Err("steel number cannot be empty");
        }
        if self.mileage_start < 0.0 {
            return Err("mileage must be non-negative");
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub predictions: Vec<f64>,
    pub inputs: Vec<WheelInput>,
    pub count: usize,
    pub processed_at: String,
}

type MlResult = Result<Json<PredictionResponse>, (StatusCode, Json<ErrorBody>)>;

fn ml_error(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<ErrorBody>) {
    (
        status,
        Json(ErrorBody {
            success: Some(false),
            error: message.into(),
        }),
    )
}

/// Wear estimate in millimetres for one wheel set.
pub fn predict_wear(input: &WheelInput) -> f64 {
    let steel_factor = 1.0 + (input.steel_num.len() % 3) as f64 * 0.05;
    let wear = 0.35 + input.mileage_start * 2.0e-6 * steel_factor;
    (wear * 1000.0).round() / 1000.0
}

fn predict_batch(inputs: &[WheelInput]) -> Result<Vec<f64>, String> {
    if inputs.is_empty() {
        return Err("no input items".to_string());
    }
    if inputs.len() > MAX_ITEMS {
        return Err(format!("too many items (max {MAX_ITEMS})"));
    }
    inputs
        .iter()
        .enumerate()
        .map(|(i, input)| {
            input
                .validate()
                .map(|()| predict_wear(input))
                .map_err(|e| format!("item {i}: {e}"))
        })
        .collect()
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

pub async fn info() -> Json<Value> {
    Json(json!({
        "model_type": "CatBoost",
        "features_count": 5,
        "features": ["locomotive_series", "locomotive_number", "depo", "steel_num", "mileage_start"],
        "version": "1.0.0",
        "output_format": "array of numbers"
    }))
}

pub async fn predict(payload: Result<Json<Vec<WheelInput>>, JsonRejection>) -> MlResult {
    let Json(inputs) = payload.map_err(|rejection| {
        ml_error(
            StatusCode::BAD_REQUEST,
            format!("Invalid JSON format: {}", rejection.body_text()),
        )
    })?;
    let predictions =
        predict_batch(&inputs).map_err(|e| ml_error(StatusCode::BAD_REQUEST, e))?;
    info!(count = predictions.len(), "predict batch served");
    Ok(Json(PredictionResponse {
        success: true,
        message: None,
        count: predictions.len(),
        predictions,
        inputs,
        processed_at: Utc::now().to_rfc3339(),
    }))
}

pub async fn upload(mut multipart: Multipart) -> MlResult {
    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ml_error(StatusCode::BAD_REQUEST, format!("File required: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ml_error(StatusCode::BAD_REQUEST, format!("Failed to read file: {e}")))?;
        file = Some((name, bytes));
    }
    let (name, bytes) = file.ok_or_else(|| ml_error(StatusCode::BAD_REQUEST, "File required"))?;

    if bytes.len() > MAX_FILE_SIZE {
        return Err(ml_error(
            StatusCode::BAD_REQUEST,
            format!("File too large. Max size: {MAX_FILE_SIZE} bytes"),
        ));
    }
    let lower = name.to_ascii_lowercase();
    if !(lower.ends_with(".json") || lower.ends_with(".jsonl")) {
        return Err(ml_error(StatusCode::BAD_REQUEST, "Only JSON files are allowed"));
    }

    let inputs = parse_batch(&bytes).map_err(|e| ml_error(StatusCode::BAD_REQUEST, e))?;
    let predictions =
        predict_batch(&inputs).map_err(|e| ml_error(StatusCode::BAD_REQUEST, e))?;
    info!(file = %name, count = predictions.len(), "upload batch served");
    Ok(Json(PredictionResponse {
        success: true,
        message: Some(format!("Successfully processed {} records", predictions.len())),
        count: predictions.len(),
        predictions,
        inputs,
        processed_at: Utc::now().to_rfc3339(),
    }))
}

/// A JSON array, or JSON Lines with blank lines skipped.
pub fn parse_batch(content: &[u8]) -> Result<Vec<WheelInput>, String> {
    if content.iter().all(u8::is_ascii_whitespace) {
        return Err("file is empty".to_string());
    }
    if let Ok(inputs) = serde_json::from_slice::<Vec<WheelInput>>(content) {
        return Ok(inputs);
    }
    let text = std::str::from_utf8(content).map_err(|_| "invalid JSON format".to_string())?;
    let mut inputs = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let input = serde_json::from_str(line)
            .map_err(|e| format!("invalid JSON at line {}: {e}", i + 1))?;
        inputs.push(input);
    }
    Ok(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wheel(mileage: f64) -> WheelInput {
        WheelInput {
            locomotive_series: "VL80".into(),
            locomotive_number: 123,
            depo: "Depo1".into(),
            steel_num: "Steel1".into(),
            mileage_start: mileage,
        }
    }

    #[test]
    fn wear_is_deterministic_and_grows_with_mileage() {
        let low = predict_wear(&wheel(10_000.0));
        let high = predict_wear(&wheel(90_000.0));
        assert_eq!(low, predict_wear(&wheel(10_000.0)));
        assert!(high > low);
        // "Steel1" has 6 chars: factor 1.0, so 0.35 + 0.1 = 0.45
        assert_eq!(predict_wear(&wheel(50_000.0)), 0.45);
    }

    #[test]
    fn batch_limits_are_enforced() {
        assert!(predict_batch(&[]).is_err());
        assert!(predict_batch(&vec![wheel(1.0); MAX_ITEMS + 1]).is_err());
        let err = predict_batch(&[wheel(1.0), wheel(-1.0)]).unwrap_err();
        assert_eq!(err, "item 1: mileage must be non-negative");
    }

    #[test]
    fn parses_array_and_json_lines() {
        let array = serde_json::to_vec(&vec![wheel(1.0), wheel(2.0)]).unwrap();
        assert_eq!(parse_batch(&array).unwrap().len(), 2);

        let mut lines = serde_json::to_string(&wheel(1.0)).unwrap();
        lines.push_str("\n\n");
        lines.push_str(&serde_json::to_string(&wheel(2.0)).unwrap());
        lines.push('\n');
        let parsed = parse_batch(lines.as_bytes()).unwrap();
        assert_eq!(parsed[1].mileage_start, 2.0);
    }

    #[test]
    fn reports_bad_line_number() {
        let err = parse_batch(b"{\"locomotive_series\":1}\n").unwrap_err();
        assert!(err.starts_with("invalid JSON at line 1"), "{err}");
        assert_eq!(parse_batch(b"  \n").unwrap_err(), "file is empty");
    }
}
