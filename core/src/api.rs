//! Descriptor builders for every analytics API endpoint.
//!
//! # Design
//! `ApiClient` is stateless: each method validates caller input and returns a
//! `RequestDescriptor`, nothing more. Executing it and interpreting the
//! `Outcome` stay with the caller, so one controller serves every endpoint.

use crate::descriptor::RequestDescriptor;
use crate::error::ApiError;
use crate::http::FilePart;
use crate::types::{GenerateMapsRequest, WheelInput};

pub const ML_PREFIX: &str = "/api/v1/ml";
pub const MAX_BATCH_ITEMS: usize = 1000;
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, Default)]
pub struct ApiClient;

impl ApiClient {
    pub fn new() -> Self {
        Self
    }

    pub fn health(&self) -> RequestDescriptor {
        RequestDescriptor::get(format!("{ML_PREFIX}/health"))
    }

    pub fn model_info(&self) -> RequestDescriptor {
        RequestDescriptor::get(format!("{ML_PREFIX}/info"))
    }

    pub fn predict(&self, inputs: &[WheelInput]) -> Result<RequestDescriptor, ApiError> {
        if inputs.is_empty() {
            return Err(ApiError::Validation("at least one input is required".into()));
        }
        if inputs.len() > MAX_BATCH_ITEMS {
            return Err(ApiError::Validation(format!(
                "too many items (max {MAX_BATCH_ITEMS})"
            )));
        }
        for (index, input) in inputs.iter().enumerate() {
            input.validate().map_err(|e| match e {
                ApiError::Validation(msg) => ApiError::Validation(format!("item {index}: {msg}")),
                other => other,
            })?;
        }
        RequestDescriptor::post_json(format!("{ML_PREFIX}/predict"), inputs)
    }

    /// Multipart upload of a `.json` or `.jsonl` batch file, at most 10 MiB.
    pub fn upload(&self, file_name: &str, content: Vec<u8>) -> Result<RequestDescriptor, ApiError> {
        let lower = file_name.to_ascii_lowercase();
        if !(lower.ends_with(".json") || lower.ends_with(".jsonl")) {
            return Err(ApiError::UnsupportedFileType(file_name.to_string()));
        }
        if content.len() > MAX_UPLOAD_BYTES {
            return Err(ApiError::FileTooLarge {
                size: content.len(),
                max: MAX_UPLOAD_BYTES,
            });
        }
        Ok(RequestDescriptor::post_file(
            format!("{ML_PREFIX}/upload"),
            FilePart {
                field: "file".to_string(),
                file_name: file_name.to_string(),
                content,
            },
        ))
    }

    pub fn branches(&self) -> RequestDescriptor {
        RequestDescriptor::get("/api/v1/task1/branches")
    }

    pub fn task1_depots(&self) -> RequestDescriptor {
        RequestDescriptor::get("/api/v1/task1/depots")
    }

    pub fn depot_branches(&self, depo: &str) -> RequestDescriptor {
        RequestDescriptor::get(format!(
            "/api/v1/task1/depots/{}/branches",
            encode_segment(depo)
        ))
    }

    pub fn popular_directions(&self) -> RequestDescriptor {
        RequestDescriptor::get("/api/v1/popular-direction")
    }

    pub fn locomotive_popular_direction(&self, series: &str, number: &str) -> RequestDescriptor {
        RequestDescriptor::get(format!(
            "/api/v1/locomotives/{}/{}/popular-direction",
            encode_segment(series),
            encode_segment(number)
        ))
    }

    pub fn depots(&self) -> RequestDescriptor {
        RequestDescriptor::get("/api/v1/task3/depots")
    }

    pub fn depot(&self, depo_id: &str) -> RequestDescriptor {
        RequestDescriptor::get(format!("/api/v1/task3/depots/{}", encode_segment(depo_id)))
    }

    pub fn generate_maps(
        &self,
        request: &GenerateMapsRequest,
    ) -> Result<RequestDescriptor, ApiError> {
        request.validate()?;
        RequestDescriptor::post_json("/api/v1/task3/generate", request)
    }
}

/// Percent-encode one path segment (spaces as `%20`, not `+`).
fn encode_segment(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
