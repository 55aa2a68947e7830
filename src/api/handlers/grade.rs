// src/api/handlers/grade.rs
use actix_web::{web, HttpRequest, HttpResponse, Result};

use crate::api::AppState;
use crate::api::submission::read_submission;
use crate::errors::GraderError;
use crate::grader::BatchGrader;
use crate::models::{ApiError, GradeResponse};
use crate::providers::VisionProvider;

/// POST /api/grade/ - Grade a batch of exam papers
pub async fn grade_papers<P: VisionProvider + 'static>(
    state: web::Data<AppState<P>>,
    req: HttpRequest,
    payload: web::Payload,
) -> Result<HttpResponse> {
    let limit = state.config.server.max_payload_bytes;

    let submission = match read_submission(&req, payload, limit).await {
        Ok(submission) => submission,
        Err(e) => return Ok(server_error(e)),
    };

    if submission.images.is_empty() {
        return Ok(HttpResponse::BadRequest().json(ApiError::new(GraderError::NoImagesProvided.to_string())));
    }

    let instructions = submission.instructions.clone();
    let images = match submission.into_image_bytes() {
        Ok(images) => images,
        Err(e) => return Ok(server_error(e)),
    };

    let grader = BatchGrader::new(&*state.provider, &state.annotator, &state.config.grading);
    let outcome = grader.process(&images, &instructions).await;

    if !outcome.success {
        let error = outcome
            .error
            .unwrap_or_else(|| "Unknown error occurred".to_string());
        return Ok(HttpResponse::InternalServerError().json(ApiError::new(error)));
    }

    Ok(HttpResponse::Ok().json(GradeResponse::from_results(&outcome.results)))
}

fn server_error(e: GraderError) -> HttpResponse {
    log::error!("Grading request failed: {}", e);
    HttpResponse::InternalServerError().json(ApiError::new(format!("Server error: {}", e)))
}
