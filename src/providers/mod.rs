// src/providers/mod.rs

use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::{DynamicImage, ImageFormat};
use reqwest::Client;
use std::io::Cursor;

use crate::config::AppConfig;
use crate::errors::{GraderError, Result};

pub mod anthropic;
pub mod gemini;
pub mod ollama;
pub mod openai;

use anthropic::AnthropicProvider;
use gemini::GeminiProvider;
use ollama::OllamaProvider;
use openai::OpenAIProvider;

/// Encodings every provider accepts as-is. Anything else is re-encoded to PNG.
const PASS_THROUGH_FORMATS: &[ImageFormat] = &[ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::WebP];

/// A scanned paper as it is handed to a vision model.
#[derive(Debug, Clone)]
pub struct PaperImage {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
}

impl PaperImage {
    /// Fully decodes the caller's bytes, failing with `Decode` on anything
    /// unreadable. Returns the upload form of the paper alongside the decoded
    /// page. JPEG, PNG and WebP are forwarded untouched.
    pub fn decode(bytes: Vec<u8>) -> Result<(Self, DynamicImage)> {
        let format = image::guess_format(&bytes)?;
        let page = image::load_from_memory_with_format(&bytes, format)?;

        if PASS_THROUGH_FORMATS.contains(&format) {
            return Ok((Self { bytes, mime_type: format.to_mime_type() }, page));
        }

        log::debug!("Re-encoding {:?} paper as PNG", format);
        let mut png = Vec::new();
        page.to_rgba8()
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| GraderError::Encode(e.to_string()))?;

        Ok((Self { bytes: png, mime_type: ImageFormat::Png.to_mime_type() }, page))
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }
}

/// A common trait for vision-capable Large Language Model (LLM) providers.
///
/// Each call carries one prompt and one image and returns free text.
/// Like the rest of the providers this uses a plain `impl Future` return
/// rather than `async_trait`.
pub trait VisionProvider: Send + Sync {
    /// Generates a response from the model for a prompt plus a single image.
    ///
    /// # Returns
    /// A `Result` containing the generated `String` and the latency in milliseconds (`u64`).
    fn generate(
        &self,
        model: &str,
        prompt: &str,
        image: &PaperImage,
        temperature: f32,
    ) -> impl std::future::Future<Output = Result<(String, u64)>> + Send;
}

/// Parses a model string like "provider:model_name" and returns the provider and model.
/// Defaults to "gemini" if no provider is specified.
pub fn parse_model_string(model_str: &str) -> (String, String) {
    match model_str.split_once(':') {
        Some((provider, model)) => (provider.to_string(), model.to_string()),
        None => ("gemini".to_string(), model_str.to_string()),
    }
}

/// The provider selected by `GRADER_MODEL`.
pub enum Provider {
    Gemini(GeminiProvider),
    OpenAI(OpenAIProvider),
    Anthropic(AnthropicProvider),
    Ollama(OllamaProvider),
}

impl Provider {
    /// Builds the provider named by the configured model string. Fails when that
    /// provider has no configuration.
    pub fn from_config(config: &AppConfig, client: Client) -> Result<Self> {
        let (provider_name, _) = parse_model_string(&config.grading.model);

        match provider_name.as_str() {
            "gemini" => {
                let gemini_config = config.gemini.as_ref()
                    .ok_or_else(|| GraderError::ProviderNotFound("gemini".to_string()))?;
                Ok(Provider::Gemini(GeminiProvider::new(client, gemini_config.clone())))
            }
            "openai" => {
                let openai_config = config.openai.as_ref()
                    .ok_or_else(|| GraderError::ProviderNotFound("openai".to_string()))?;
                Ok(Provider::OpenAI(OpenAIProvider::new(client, openai_config.clone())))
            }
            "anthropic" => {
                let anthropic_config = config.anthropic.as_ref()
                    .ok_or_else(|| GraderError::ProviderNotFound("anthropic".to_string()))?;
                Ok(Provider::Anthropic(AnthropicProvider::new(client, anthropic_config.clone())))
            }
            "ollama" => {
                let ollama_config = config.ollama.as_ref()
                    .ok_or_else(|| GraderError::ProviderNotFound("ollama".to_string()))?;
                Ok(Provider::Ollama(OllamaProvider::new(client, ollama_config.clone())))
            }
            other => Err(GraderError::ProviderNotFound(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::Gemini(_) => "gemini",
            Provider::OpenAI(_) => "openai",
            Provider::Anthropic(_) => "anthropic",
            Provider::Ollama(_) => "ollama",
        }
    }
}

impl VisionProvider for Provider {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        image: &PaperImage,
        temperature: f32,
    ) -> Result<(String, u64)> {
        match self {
            Provider::Gemini(p) => p.generate(model, prompt, image, temperature).await,
            Provider::OpenAI(p) => p.generate(model, prompt, image, temperature).await,
            Provider::Anthropic(p) => p.generate(model, prompt, image, temperature).await,
            Provider::Ollama(p) => p.generate(model, prompt, image, temperature).await,
        }
    }
}
