use std::fs;
use std::time::Duration;

use reqwest::blocking::{multipart, Client};

use crate::config::EwwwOptions;
use crate::converter::{ConversionRequest, Converter};
use crate::error::BackendFailure;

/// Uploads the source to the EWWW Image Optimizer cloud API.
pub struct EwwwConverter {
    options: EwwwOptions,
}

impl EwwwConverter {
    pub fn new(options: EwwwOptions) -> Self {
        Self { options }
    }

    fn key(&self) -> Option<&str> {
        self.options.key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

impl Converter for EwwwConverter {
    fn name(&self) -> &str {
        "ewww"
    }

    fn available(&self) -> bool {
        self.key().is_some()
    }

    fn convert(&self, request: &ConversionRequest) -> Result<(), BackendFailure> {
        let key = self
            .key()
            .ok_or_else(|| BackendFailure::Unavailable("no ewww api key configured".into()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(self.options.timeout_secs))
            .build()
            .map_err(|e| BackendFailure::Failed(format!("failed to build http client: {e}")))?;

        let form = multipart::Form::new()
            .text("api_key", key.to_string())
            .text("webp", "1")
            .text("domain", "webp-convert")
            .text("quality", request.quality.to_string())
            .text("metadata", if request.strip_metadata { "0" } else { "1" })
            .file("file", &request.source)
            .map_err(|e| BackendFailure::io(&request.source, e))?;

        let response = client
            .post(&self.options.endpoint)
            .multipart(form)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    BackendFailure::Failed("ewww request timed out".into())
                } else {
                    BackendFailure::Failed(format!("ewww request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendFailure::Failed(format!("ewww returned HTTP {status}")));
        }

        let body = response
            .bytes()
            .map_err(|e| BackendFailure::Failed(format!("failed to read ewww response: {e}")))?;

        check_webp(&body)?;

        fs::write(&request.destination, &body)
            .map_err(|e| BackendFailure::io(&request.destination, e))
    }
}

/// The API answers errors (bad key, exceeded quota) with a 200 and a text body.
fn check_webp(body: &[u8]) -> Result<(), BackendFailure> {
    if body.len() >= 12 && &body[0..4] == b"RIFF" && &body[8..12] == b"WEBP" {
        return Ok(());
    }
    let text = String::from_utf8_lossy(&body[..body.len().min(200)]);
    let text = text.trim();
    Err(BackendFailure::Failed(if text.is_empty() {
        "ewww returned an empty response".to_string()
    } else {
        format!("ewww did not return a WebP image: {text}")
    }))
}
