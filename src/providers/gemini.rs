// src/providers/gemini.rs

use reqwest::Client;
use serde_json::json;
use std::time::Instant;

use crate::config::GeminiConfig;
use crate::errors::{GraderError, Result};
use crate::providers::{PaperImage, VisionProvider};

/// A provider for interacting with Google's Gemini models.
pub struct GeminiProvider {
    client: Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    /// Creates a new `GeminiProvider`.
    pub fn new(client: Client, config: GeminiConfig) -> Self {
        Self { client, config }
    }
}

impl VisionProvider for GeminiProvider {
    /// Calls `generateContent` with the prompt and an inline image part.
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        image: &PaperImage,
        temperature: f32,
    ) -> Result<(String, u64)> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.api_base.trim_end_matches('/'),
            model
        );

        log::info!("📡 Calling Gemini: {} with model: {}", url, model);

        let body = json!({
            "contents": [{
                "parts": [
                    {"text": prompt},
                    {"inline_data": {"mime_type": image.mime_type, "data": image.to_base64()}}
                ]
            }],
            "generationConfig": {"temperature": temperature}
        });

        let start = Instant::now();

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let latency_ms = start.elapsed().as_millis() as u64;

        log::info!("📥 Gemini response status: {} ({}ms)", status, latency_ms);

        if !status.is_success() {
            let error_body = resp
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error body".to_string());
            return Err(GraderError::ApiError {
                status: status.as_u16(),
                body: error_body,
            });
        }

        let response_json: serde_json::Value = resp.json().await?;
        let output = extract_text(&response_json)?;

        Ok((output, latency_ms))
    }
}

/// Joins the text parts of the first candidate.
fn extract_text(response_json: &serde_json::Value) -> Result<String> {
    if let Some(error) = response_json.get("error") {
        return Err(GraderError::ApiResponse(error.to_string()));
    }

    let parts = response_json
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .ok_or_else(|| GraderError::UnexpectedResponse(response_json.to_string()))?;

    let output: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();

    if output.is_empty() {
        return Err(GraderError::EmptyResponse);
    }

    Ok(output)
}
