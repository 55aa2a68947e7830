// src/models.rs
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::Serialize;

use crate::grader::{GradeResult, GradeSummary};

/// Body of a successful `POST /api/grade/`.
#[derive(Serialize, Clone, Debug)]
pub struct GradeResponse {
    pub success: bool,
    pub graded_images: Vec<String>,
    pub grades: Vec<GradeSummary>,
}

impl GradeResponse {
    pub fn from_results(results: &[GradeResult]) -> Self {
        Self {
            success: true,
            graded_images: results
                .iter()
                .map(|r| format!("data:image/jpeg;base64,{}", STANDARD.encode(&r.annotated_image)))
                .collect(),
            grades: results.iter().map(GradeSummary::from).collect(),
        }
    }
}

/// Body of every failed request.
#[derive(Serialize, Clone, Debug)]
pub struct ApiError {
    pub success: bool,
    pub error: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>) -> Self {
        Self { success: false, error: error.into() }
    }
}
