// src/providers/openai.rs

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::OpenAIConfig;
use crate::errors::{GraderError, Result};
use crate::providers::{PaperImage, VisionProvider};

/// A provider for interacting with OpenAI vision models.
pub struct OpenAIProvider {
    client: Client,
    config: OpenAIConfig,
}

#[derive(Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    content: Option<String>,
}

impl OpenAIProvider {
    /// Creates a new `OpenAIProvider`.
    pub fn new(client: Client, config: OpenAIConfig) -> Self {
        Self { client, config }
    }
}

impl VisionProvider for OpenAIProvider {
    /// Calls chat completions with a text part and a data-URL image part.
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        image: &PaperImage,
        temperature: f32,
    ) -> Result<(String, u64)> {
        let url = format!("{}/chat/completions", self.config.api_base.trim_end_matches('/'));

        log::info!("📡 Calling OpenAI: {} with model: {}", url, model);

        let body = OpenAIRequest {
            model,
            messages: vec![Message {
                role: "user",
                content: vec![
                    ContentPart::Text { text: prompt },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: image.to_data_url() },
                    },
                ],
            }],
            temperature,
        };

        let start = Instant::now();

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let latency_ms = start.elapsed().as_millis() as u64;

        log::info!("📥 OpenAI response status: {} ({}ms)", status, latency_ms);

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

        let openai_resp: OpenAIResponse = resp.json().await?;

        let output = openai_resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GraderError::UnexpectedResponse("No choices in response".to_string()))?
            .message
            .content
            .unwrap_or_default();

        if output.is_empty() {
            return Err(GraderError::EmptyResponse);
        }

        Ok((output, latency_ms))
    }
}
