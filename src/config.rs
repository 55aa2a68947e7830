// src/config.rs
use serde::Deserialize;
use std::path::{Path, PathBuf};
use crate::errors::{Result, GraderError};

pub const DEFAULT_MODEL: &str = "gemini:gemini-1.5-flash";
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Configuration for the Gemini provider.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_base: String,
    pub api_key: String,
}

/// Configuration for the OpenAI provider (or any OpenAI-compatible endpoint).
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    pub api_base: String,
    pub api_key: String,
}

/// Configuration for the Anthropic provider.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_base: String,
    pub api_key: String,
}

/// Configuration for the Ollama provider.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub api_base: String,
}

/// How papers are graded and marked.
#[derive(Debug, Clone)]
pub struct GradingConfig {
    /// Model in `provider:model_name` form, e.g. `gemini:gemini-1.5-flash`.
    pub model: String,
    pub temperature: f32,
    /// Preferred banner font. Tried before the system font candidates.
    pub font_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_payload_bytes: usize,
}

/// High-level application configuration loaded from an optional TOML file
/// and environment variables. Environment variables win.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini: Option<GeminiConfig>,
    pub openai: Option<OpenAIConfig>,
    pub anthropic: Option<AnthropicConfig>,
    pub ollama: Option<OllamaConfig>,
    pub grading: GradingConfig,
    pub server: ServerConfig,
}

/// Shape of the optional `GRADER_CONFIG` file.
#[derive(Deserialize, Debug, Default, Clone)]
pub struct FileConfig {
    #[serde(default)]
    pub grading: FileGrading,
    #[serde(default)]
    pub server: FileServer,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct FileGrading {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub font_path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct FileServer {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub max_payload_bytes: Option<usize>,
}

impl FileConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }
}

impl AppConfig {
    /// Load configuration from `GRADER_CONFIG` (if set) and environment variables.
    pub fn from_env() -> Result<Self> {
        let file = match std::env::var("GRADER_CONFIG") {
            Ok(path) => {
                log::info!("Loading configuration file {}", path);
                FileConfig::load(path)?
            }
            Err(_) => FileConfig::default(),
        };
        Self::from_sources(file, |key| std::env::var(key).ok())
    }

    /// Build the configuration from a parsed file and a variable lookup.
    pub fn from_sources<F>(file: FileConfig, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let gemini = env("GEMINI_API_KEY")
            .or_else(|| env("GOOGLE_API_KEY"))
            .map(|api_key| GeminiConfig {
                api_base: env("GEMINI_API_BASE")
                    .unwrap_or_else(|| "https://generativelanguage.googleapis.com".to_string()),
                api_key,
            });

        let openai = env("OPENAI_API_KEY").map(|api_key| OpenAIConfig {
            api_base: env("OPENAI_API_BASE")
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            api_key,
        });

        let anthropic = env("ANTHROPIC_API_KEY").map(|api_key| AnthropicConfig {
            api_base: env("ANTHROPIC_API_BASE")
                .unwrap_or_else(|| "https://api.anthropic.com".to_string()),
            api_key,
        });

        let ollama = env("OLLAMA_API_BASE").map(|api_base| OllamaConfig { api_base });

        if gemini.is_none() && openai.is_none() && anthropic.is_none() && ollama.is_none() {
            return Err(GraderError::Config(
                "No LLM providers configured. Please set GEMINI_API_KEY, OPENAI_API_KEY, ANTHROPIC_API_KEY or OLLAMA_API_BASE.".to_string()
            ));
        }

        let temperature = match env("GRADER_TEMPERATURE") {
            Some(raw) => parse_var("GRADER_TEMPERATURE", &raw)?,
            None => file.grading.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        };

        let grading = GradingConfig {
            model: env("GRADER_MODEL")
                .or(file.grading.model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature,
            font_path: env("GRADER_FONT_PATH").map(PathBuf::from).or(file.grading.font_path),
        };

        let port = match env("PORT") {
            Some(raw) => parse_var("PORT", &raw)?,
            None => file.server.port.unwrap_or(8080),
        };
        let max_payload_bytes = match env("MAX_PAYLOAD_BYTES") {
            Some(raw) => parse_var("MAX_PAYLOAD_BYTES", &raw)?,
            None => file.server.max_payload_bytes.unwrap_or(DEFAULT_MAX_PAYLOAD_BYTES),
        };

        let server = ServerConfig {
            host: env("HOST")
                .or(file.server.host)
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            max_payload_bytes,
        };

        Ok(AppConfig { gemini, openai, anthropic, ollama, grading, server })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| GraderError::Config(format!("{} has an invalid value: '{}'", name, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_with_gemini_key() {
        let config = AppConfig::from_sources(
            FileConfig::default(),
            lookup(&[("GEMINI_API_KEY", "secret")]),
        )
        .unwrap();

        let gemini = config.gemini.unwrap();
        assert_eq!(gemini.api_key, "secret");
        assert_eq!(gemini.api_base, "https://generativelanguage.googleapis.com");
        assert_eq!(config.grading.model, DEFAULT_MODEL);
        assert!((config.grading.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(config.grading.font_path.is_none());
    }

    #[test]
    fn test_google_api_key_is_accepted() {
        let config = AppConfig::from_sources(
            FileConfig::default(),
            lookup(&[("GOOGLE_API_KEY", "legacy")]),
        )
        .unwrap();
        assert_eq!(config.gemini.unwrap().api_key, "legacy");
    }

    #[test]
    fn test_no_provider_is_an_error() {
        let err = AppConfig::from_sources(FileConfig::default(), lookup(&[])).unwrap_err();
        assert!(matches!(err, GraderError::Config(_)));
    }

    #[test]
    fn test_file_values_are_overridden_by_env() {
        let file = FileConfig::from_toml_str(
            r#"
            [grading]
            model = "ollama:llava"
            temperature = 0.1
            font_path = "/opt/fonts/Bold.ttf"

            [server]
            port = 9000
            max_payload_bytes = 1024
            "#,
        )
        .unwrap();

        let config = AppConfig::from_sources(
            file,
            lookup(&[("OLLAMA_API_BASE", "http://localhost:11434"), ("PORT", "9100")]),
        )
        .unwrap();

        assert_eq!(config.grading.model, "ollama:llava");
        assert!((config.grading.temperature - 0.1).abs() < f32::EPSILON);
        assert_eq!(config.grading.font_path, Some(PathBuf::from("/opt/fonts/Bold.ttf")));
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.max_payload_bytes, 1024);
    }

    #[test]
    fn test_invalid_temperature() {
        let err = AppConfig::from_sources(
            FileConfig::default(),
            lookup(&[("GEMINI_API_KEY", "k"), ("GRADER_TEMPERATURE", "warm")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("GRADER_TEMPERATURE"));
    }
}
