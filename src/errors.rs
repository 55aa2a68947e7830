// src/errors.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraderError {
    #[error("No images provided")]
    NoImagesProvided,

    #[error("Error grading paper {index}: {source}")]
    Grading {
        index: usize,
        #[source]
        source: Box<GraderError>,
    },

    #[error("Error adding marks to image {index}: {source}")]
    Annotation {
        index: usize,
        #[source]
        source: Box<GraderError>,
    },

    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Invalid base64 image data: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse TOML config: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Background image task failed: {0}")]
    Blocking(String),

    #[error("Failed to read request body: {0}")]
    Payload(String),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API request failed with status {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("API returned an error: {0}")]
    ApiResponse(String),

    #[error("Unexpected response structure: {0}")]
    UnexpectedResponse(String),

    #[error("Received empty text response from model")]
    EmptyResponse,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Provider '{0}' not found")]
    ProviderNotFound(String),
}

pub type Result<T> = std::result::Result<T, GraderError>;
