// src/grader.rs
use image::DynamicImage;
use serde::Serialize;
use std::time::Instant;
use uuid::Uuid;

use crate::annotator::Annotator;
use crate::config::GradingConfig;
use crate::errors::{GraderError, Result};
use crate::providers::{parse_model_string, PaperImage, VisionProvider};

/// Grade used when the model's answer has no `GRADE:` line.
pub const SENTINEL_GRADE: &str = "N/A";

const GRADE_MARKER: &str = "GRADE:";
const FEEDBACK_MARKER: &str = "FEEDBACK:";

/// One graded paper.
#[derive(Debug, Clone)]
pub struct GradeResult {
    pub grade: String,
    pub feedback: String,
    /// The paper with its grade banner, JPEG encoded.
    pub annotated_image: Vec<u8>,
}

/// Result of a whole batch. `results` is empty whenever `success` is false.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub success: bool,
    pub results: Vec<GradeResult>,
    pub error: Option<String>,
}

impl From<Result<Vec<GradeResult>>> for BatchOutcome {
    fn from(result: Result<Vec<GradeResult>>) -> Self {
        match result {
            Ok(results) => BatchOutcome { success: true, results, error: None },
            Err(e) => BatchOutcome { success: false, results: Vec::new(), error: Some(e.to_string()) },
        }
    }
}

/// Grade and feedback as returned to callers.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GradeSummary {
    pub grade: String,
    pub feedback: String,
}

impl From<&GradeResult> for GradeSummary {
    fn from(result: &GradeResult) -> Self {
        Self { grade: result.grade.clone(), feedback: result.feedback.clone() }
    }
}

/// Builds the grading prompt sent alongside each paper.
pub fn build_prompt(instructions: &str) -> String {
    let instructions = if instructions.is_empty() { "None" } else { instructions };

    format!(
        r#"You are an expert teacher grading exam papers.
Analyze this exam paper image carefully and provide:
1. A numerical grade/score (e.g., 85/100, 92/100, or appropriate format)
2. Brief feedback on the student's performance

Additional Instructions from Teacher: {}

Be fair, constructive, and professional in your evaluation.

Provide your response in the following format:
GRADE: [score]
FEEDBACK: [your brief feedback]"#,
        instructions
    )
}

/// Splits a model answer into `(grade, feedback)`.
///
/// Without a `GRADE:` marker the grade is `N/A` and the feedback is the whole
/// answer. With one, the grade runs up to the first `FEEDBACK:`; if there is no
/// `FEEDBACK:` the feedback is again the whole answer.
pub fn parse_grade_response(response: &str) -> (String, String) {
    if !response.contains(GRADE_MARKER) {
        return (SENTINEL_GRADE.to_string(), response.to_string());
    }

    let (head, feedback) = match response.split_once(FEEDBACK_MARKER) {
        Some((head, tail)) => (head, tail.trim().to_string()),
        None => (response, response.to_string()),
    };

    // GRADE: may only appear after FEEDBACK:, in which case the whole head is the grade
    let grade = match head.split_once(GRADE_MARKER) {
        Some((_, grade)) => grade,
        None => head,
    };

    (grade.trim().to_string(), feedback)
}

/// Drives one batch: grade, annotate, advance, stop at the first failure.
pub struct BatchGrader<'a, P: VisionProvider> {
    provider: &'a P,
    annotator: &'a Annotator,
    model: String,
    temperature: f32,
}

impl<'a, P: VisionProvider> BatchGrader<'a, P> {
    pub fn new(provider: &'a P, annotator: &'a Annotator, config: &GradingConfig) -> Self {
        let (_, model) = parse_model_string(&config.model);
        Self { provider, annotator, model, temperature: config.temperature }
    }

    /// Grades every paper in order and never returns partial results.
    pub async fn process(&self, images: &[Vec<u8>], instructions: &str) -> BatchOutcome {
        let batch_id = Uuid::new_v4();
        let start = Instant::now();

        log::info!("📝 Batch {} started with {} paper(s)", batch_id, images.len());

        let outcome = BatchOutcome::from(self.grade_all(images, instructions).await);

        match &outcome.error {
            None => log::info!(
                "✅ Batch {} graded {} paper(s) in {}ms",
                batch_id,
                outcome.results.len(),
                start.elapsed().as_millis()
            ),
            Some(error) => log::error!("❌ Batch {} failed: {}", batch_id, error),
        }

        outcome
    }

    pub async fn grade_all(&self, images: &[Vec<u8>], instructions: &str) -> Result<Vec<GradeResult>> {
        if images.is_empty() {
            return Err(GraderError::NoImagesProvided);
        }

        let prompt = build_prompt(instructions);
        let mut results = Vec::with_capacity(images.len());

        for (index, image_bytes) in images.iter().enumerate() {
            let (grade, feedback, page) = self
                .grade_paper(image_bytes.clone(), &prompt)
                .await
                .map_err(|e| GraderError::Grading { index, source: Box::new(e) })?;

            let annotator = self.annotator.clone();
            let banner_grade = grade.clone();
            let annotated_image = run_blocking(move || annotator.annotate_page(page, &banner_grade))
                .await
                .map_err(|e| GraderError::Annotation { index, source: Box::new(e) })?;

            log::info!("📄 Paper {} graded: {}", index, grade);

            results.push(GradeResult { grade, feedback, annotated_image });
        }

        Ok(results)
    }

    /// Decodes the paper before the model sees it, so unreadable bytes never
    /// cost a model call. Hands the decoded page back for annotation.
    async fn grade_paper(&self, image_bytes: Vec<u8>, prompt: &str) -> Result<(String, String, DynamicImage)> {
        let (image, page) = run_blocking(move || PaperImage::decode(image_bytes)).await?;
        let (response, latency_ms) = self
            .provider
            .generate(&self.model, prompt, &image, self.temperature)
            .await?;

        log::debug!("Model answered in {}ms:\n{}", latency_ms, response);

        let (grade, feedback) = parse_grade_response(&response);
        Ok((grade, feedback, page))
    }
}

/// Runs CPU-bound image work off the async workers. Papers are still handled
/// one at a time: each call is awaited before the next begins.
async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| GraderError::Blocking(e.to_string()))?
}
