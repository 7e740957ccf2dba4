//! Generator client — the single point of entry for calls to the remote
//! generation endpoint.
//!
//! The endpoint is an opaque collaborator: one multipart POST carrying
//! identity fields, the resume document, and the job description; the
//! response body is the generated artifact. Everything else the daemon
//! does to that artifact happens locally.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(120);
const FALLBACK_CONTENT_TYPE: &str = "application/pdf";

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("generator returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("stored resume payload is not a valid base64 data URL")]
    InvalidResume,
}

/// Everything the endpoint needs for one generation.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub linkedin_url: String,
    pub location: String,
    pub job_description: String,
    /// Decoded resume document bytes.
    pub resume: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct GeneratedArtifact {
    pub bytes: Bytes,
    pub content_type: String,
}

/// Seam between the coordinator and the network. Tests substitute a stub.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(&self, job: GenerationJob) -> Result<GeneratedArtifact, GeneratorError>;
}

pub struct HttpGenerator {
    client: Client,
    url: String,
}

impl HttpGenerator {
    pub fn new(url: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
            url,
        }
    }
}

#[async_trait]
impl GenerationBackend for HttpGenerator {
    async fn generate(&self, job: GenerationJob) -> Result<GeneratedArtifact, GeneratorError> {
        let resume_part = Part::bytes(job.resume)
            .file_name("resume.pdf")
            .mime_str(FALLBACK_CONTENT_TYPE)?;

        let form = Form::new()
            .text("name", job.name)
            .text("email", job.email)
            .text("phone", job.phone)
            .text("linkedin_link", job.linkedin_url)
            .text("location", job.location)
            .text("job_description", job.job_description)
            .part("resume_file", resume_part);

        debug!("sending generation request to {}", self.url);
        let response = self.client.post(&self.url).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = if body.is_empty() {
                status.to_string()
            } else {
                body
            };
            return Err(GeneratorError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_string();
        let bytes = response.bytes().await?;
        debug!("received {} artifact bytes ({content_type})", bytes.len());

        Ok(GeneratedArtifact {
            bytes,
            content_type,
        })
    }
}

/// Decodes a `data:<mime>;base64,<payload>` string (or a bare base64
/// payload) into raw bytes.
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>, GeneratorError> {
    let payload = data_url
        .splitn(2, ',')
        .nth(1)
        .unwrap_or(data_url);
    STANDARD
        .decode(payload.trim())
        .map_err(|_| GeneratorError::InvalidResume)
}
