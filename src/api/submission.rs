// src/api/submission.rs
//! Reading a grading request body: JSON, multipart form, or urlencoded form.

use actix_multipart::Multipart;
use actix_web::{web, HttpMessage, HttpRequest};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use futures::StreamExt;
use serde::Deserialize;

use crate::errors::{GraderError, Result};

/// One paper as the caller sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Base64 text, optionally with a data-URL prefix.
    Encoded(String),
    /// Raw bytes from a file upload.
    Upload(Vec<u8>),
}

impl ImageSource {
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            ImageSource::Encoded(encoded) => decode_base64_image(&encoded),
            ImageSource::Upload(bytes) => Ok(bytes),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub images: Vec<ImageSource>,
    pub instructions: String,
}

impl Submission {
    /// Decodes every image, failing on the first bad one.
    pub fn into_image_bytes(self) -> Result<Vec<Vec<u8>>> {
        self.images.into_iter().map(ImageSource::into_bytes).collect()
    }
}

#[derive(Deserialize)]
struct JsonSubmission {
    #[serde(default)]
    images: Option<Vec<String>>,
    #[serde(default)]
    instructions: Option<String>,
}

impl From<JsonSubmission> for Submission {
    fn from(body: JsonSubmission) -> Self {
        Self {
            images: body
                .images
                .unwrap_or_default()
                .into_iter()
                .map(ImageSource::Encoded)
                .collect(),
            instructions: body.instructions.unwrap_or_default(),
        }
    }
}

/// Strips an optional `data:...,` prefix and decodes the base64 payload.
/// Embedded whitespace (line-wrapped base64) is ignored.
pub fn decode_base64_image(encoded: &str) -> Result<Vec<u8>> {
    let payload = match encoded.split_once(',') {
        Some((_, payload)) => payload,
        None => encoded,
    };
    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    Ok(STANDARD.decode(compact)?)
}

pub fn parse_json_submission(body: &[u8]) -> Result<Submission> {
    let parsed: JsonSubmission = serde_json::from_slice(body)?;
    Ok(parsed.into())
}

/// Each `images` pair is one base64 paper. The last `instructions` wins.
pub fn parse_form_submission(body: &[u8]) -> Result<Submission> {
    let pairs: Vec<(String, String)> =
        serde_urlencoded::from_bytes(body).map_err(|e| GraderError::Payload(e.to_string()))?;

    let mut submission = Submission::default();
    for (key, value) in pairs {
        match key.as_str() {
            "images" => submission.images.push(ImageSource::Encoded(value)),
            "instructions" => submission.instructions = value,
            _ => log::debug!("Ignoring form field '{}'", key),
        }
    }
    Ok(submission)
}

/// Reads the request body according to its content type. Any other content
/// type carries no images.
pub async fn read_submission(
    req: &HttpRequest,
    payload: web::Payload,
    limit: usize,
) -> Result<Submission> {
    let content_type = req.content_type().to_string();

    match content_type.as_str() {
        "application/json" => {
            let body = read_body(payload, limit).await?;
            parse_json_submission(&body)
        }
        "application/x-www-form-urlencoded" => {
            let body = read_body(payload, limit).await?;
            parse_form_submission(&body)
        }
        "multipart/form-data" => read_multipart(req, payload, limit).await,
        other => {
            log::warn!("Unsupported content type '{}' on grading request", other);
            Ok(Submission::default())
        }
    }
}

async fn read_body(mut payload: web::Payload, limit: usize) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| GraderError::Payload(e.to_string()))?;
        if body.len() + chunk.len() > limit {
            return Err(GraderError::Payload(format!("body exceeds {} bytes", limit)));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Repeated `images` fields become papers; file uploads win over text fields.
/// A file part with an empty filename is an unfilled file input and is dropped.
async fn read_multipart(req: &HttpRequest, payload: web::Payload, limit: usize) -> Result<Submission> {
    let mut multipart = Multipart::new(req.headers(), payload);
    let mut encoded = Vec::new();
    let mut uploads = Vec::new();
    let mut instructions = String::new();
    let mut total = 0usize;

    while let Some(field) = multipart.next().await {
        let mut field = field.map_err(|e| GraderError::Payload(e.to_string()))?;

        let (name, filename) = match field.content_disposition() {
            Some(cd) => (
                cd.get_name().unwrap_or_default().to_string(),
                cd.get_filename().map(str::to_string),
            ),
            None => (String::new(), None),
        };

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| GraderError::Payload(e.to_string()))?;
            total += chunk.len();
            if total > limit {
                return Err(GraderError::Payload(format!("body exceeds {} bytes", limit)));
            }
            data.extend_from_slice(&chunk);
        }

        match (name.as_str(), filename.as_deref()) {
            ("images", Some("")) => log::debug!("Skipping empty file input"),
            ("images", Some(_)) => uploads.push(data),
            ("images", None) => encoded.push(String::from_utf8_lossy(&data).into_owned()),
            ("instructions", _) => instructions = String::from_utf8_lossy(&data).into_owned(),
            _ => log::debug!("Ignoring form field '{}'", name),
        }
    }

    let images = if uploads.is_empty() {
        encoded.into_iter().map(ImageSource::Encoded).collect()
    } else {
        uploads.into_iter().map(ImageSource::Upload).collect()
    };

    Ok(Submission { images, instructions })
}
