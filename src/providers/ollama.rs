// src/providers/ollama.rs

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::OllamaConfig;
use crate::errors::{GraderError, Result};
use crate::providers::{PaperImage, VisionProvider};

/// A provider for local Ollama vision models (llava, llama3.2-vision, ...).
pub struct OllamaProvider {
    client: Client,
    config: OllamaConfig,
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    images: Vec<String>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaProvider {
    /// Creates a new `OllamaProvider`.
    pub fn new(client: Client, config: OllamaConfig) -> Self {
        Self { client, config }
    }
}

impl VisionProvider for OllamaProvider {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        image: &PaperImage,
        temperature: f32,
    ) -> Result<(String, u64)> {
        let url = format!("{}/api/generate", self.config.api_base.trim_end_matches('/'));

        log::info!("📡 Calling Ollama: {} with model: {}", url, model);

        let body = OllamaRequest {
            model,
            prompt,
            images: vec![image.to_base64()],
            stream: false,
            options: OllamaOptions { temperature },
        };

        let start = Instant::now();

        let resp = self.client.post(&url).json(&body).send().await?;

        let status = resp.status();
        let latency_ms = start.elapsed().as_millis() as u64;

        log::info!("📥 Ollama response status: {} ({}ms)", status, latency_ms);

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

        let ollama_resp: OllamaResponse = resp.json().await?;
        if ollama_resp.response.is_empty() {
            return Err(GraderError::EmptyResponse);
        }

        Ok((ollama_resp.response, latency_ms))
    }
}
