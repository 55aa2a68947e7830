// src/providers/anthropic.rs

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::AnthropicConfig;
use crate::errors::{GraderError, Result};
use crate::providers::{PaperImage, VisionProvider};

/// A provider for interacting with Anthropic Claude models.
pub struct AnthropicProvider {
    client: Client,
    config: AnthropicConfig,
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
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
    Image { source: ImageSource<'a> },
    Text { text: &'a str },
}

#[derive(Serialize)]
struct ImageSource<'a> {
    #[serde(rename = "type")]
    source_type: &'a str,
    media_type: &'a str,
    data: String,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

impl AnthropicProvider {
    /// Creates a new `AnthropicProvider`.
    pub fn new(client: Client, config: AnthropicConfig) -> Self {
        Self { client, config }
    }
}

impl VisionProvider for AnthropicProvider {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        image: &PaperImage,
        temperature: f32,
    ) -> Result<(String, u64)> {
        let url = format!("{}/v1/messages", self.config.api_base.trim_end_matches('/'));

        log::info!("📡 Calling Anthropic: {} with model: {}", url, model);

        let body = AnthropicRequest {
            model,
            messages: vec![Message {
                role: "user",
                content: vec![
                    ContentPart::Image {
                        source: ImageSource {
                            source_type: "base64",
                            media_type: image.mime_type,
                            data: image.to_base64(),
                        },
                    },
                    ContentPart::Text { text: prompt },
                ],
            }],
            max_tokens: 1024,
            temperature,
        };

        let start = Instant::now();

        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let latency_ms = start.elapsed().as_millis() as u64;

        log::info!("📥 Anthropic response status: {} ({}ms)", status, latency_ms);

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

        let anthropic_resp: AnthropicResponse = resp.json().await?;

        let output = anthropic_resp
            .content
            .iter()
            .find(|block| block.content_type == "text")
            .and_then(|block| block.text.as_ref())
            .ok_or_else(|| GraderError::UnexpectedResponse("No text content in response".to_string()))?;

        if output.is_empty() {
            return Err(GraderError::EmptyResponse);
        }

        Ok((output.to_string(), latency_ms))
    }
}
