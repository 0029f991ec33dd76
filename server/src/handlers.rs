use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response, Json},
};
use serde::Serialize;
use tempfile::TempDir;

use webp_convert_core::{
    Attempt, ConversionReport, ConvertConfig, ConvertError, Dispatcher, SourceFormat,
};

/// Winning report and the WebP bytes.
type Converted = (ConversionReport, Vec<u8>);

#[derive(Debug, Serialize)]
struct ApiError {
    success: bool,
    kind: &'static str,
    error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attempts: Vec<Attempt>,
}

fn bad_request(message: impl Into<String>) -> Response {
    error_response(StatusCode::BAD_REQUEST, "bad_request", message.into(), Vec::new())
}

/// Form booleans: `true`/`false`, `1`/`0`, `yes`/`no`, `on`/`off`.
fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn error_response(
    status: StatusCode,
    kind: &'static str,
    error: String,
    attempts: Vec<Attempt>,
) -> Response {
    let body = ApiError {
        success: false,
        kind,
        error,
        attempts,
    };
    (status, Json(body)).into_response()
}

fn convert_error_response(err: ConvertError) -> Response {
    let status = match &err {
        ConvertError::UnsupportedExtension { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ConvertError::NoAvailableConverter { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let kind = err.kind();
    let message = err.to_string();
    let attempts = match err {
        ConvertError::NoAvailableConverter { attempts } => attempts,
        _ => Vec::new(),
    };
    error_response(status, kind, message, attempts)
}

/// GET /converters
///
/// Converter names in the order `/convert` tries them.
pub async fn converters(State(config): State<Arc<ConvertConfig>>) -> Json<serde_json::Value> {
    let dispatcher = Dispatcher::new((*config).clone());
    Json(serde_json::json!({
        "order": dispatcher.converter_order(),
        "converters": dispatcher.registry().descriptors(),
        "exclude_non_preferred": config.preferences.exclude_non_preferred,
    }))
}

/// POST /convert
///
/// Convert an uploaded JPEG/PNG to WebP.
///
/// Form fields:
/// - file: binary file data (the filename's extension selects the format)
/// - quality (optional): 0-100 (default: server config, 85)
/// - strip_metadata (optional): true/false (default: true)
/// - order (optional): comma-separated converter names to try first
/// - only_preferred (optional): true/false, only try `order`
pub async fn convert(
    State(config): State<Arc<ConvertConfig>>,
    mut multipart: Multipart,
) -> Response {
    let mut config = (*config).clone();
    let mut upload: Option<(String, Vec<u8>)> = None;
    let mut order: Option<Vec<String>> = None;
    let mut only_preferred = false;

    // Parse multipart form
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(f)) => f,
            Ok(None) => break,
            Err(e) => return bad_request(format!("invalid multipart body: {e}")),
        };

        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("").to_string();
                let bytes = match field.bytes().await {
                    Ok(b) => b,
                    Err(e) => return bad_request(format!("failed to read upload: {e}")),
                };
                upload = Some((file_name, bytes.to_vec()));
            }
            "quality" | "strip_metadata" | "order" | "only_preferred" => {
                let text = match field.text().await {
                    Ok(text) => text,
                    Err(e) => return bad_request(format!("failed to read field {name}: {e}")),
                };
                match name.as_str() {
                    "quality" => match text.trim().parse::<u8>() {
                        Ok(q) if q <= 100 => config.quality = q,
                        _ => return bad_request(format!("invalid quality: {text}")),
                    },
                    "strip_metadata" => match parse_bool(&text) {
                        Some(flag) => config.strip_metadata = flag,
                        None => return bad_request(format!("invalid strip_metadata: {text}")),
                    },
                    "only_preferred" => match parse_bool(&text) {
                        Some(flag) => only_preferred = flag,
                        None => return bad_request(format!("invalid only_preferred: {text}")),
                    },
                    _ => {
                        order = Some(
                            text.split(',')
                                .map(|s| s.trim().to_string())
                                .filter(|s| !s.is_empty())
                                .collect(),
                        );
                    }
                }
            }
            _ => {}
        }
    }

    let Some((file_name, data)) = upload else {
        return bad_request("missing file field");
    };

    if let Some(order) = order {
        config.set_converter_order(order, only_preferred);
    }

    // Uploads are confined to a scratch directory.
    let extension = std::path::Path::new(&file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    if SourceFormat::from_extension(&extension).is_none() {
        return error_response(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "unsupported_extension",
            format!("unsupported file extension: {extension:?}"),
            Vec::new(),
        );
    }

    let result = tokio::task::spawn_blocking(move || -> Result<Converted, Response> {
        let scratch = TempDir::new().map_err(|e| {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "io", e.to_string(), Vec::new())
        })?;
        let source = scratch.path().join(format!("upload.{extension}"));
        let destination = scratch.path().join("out/upload.webp");
        std::fs::write(&source, &data).map_err(|e| {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "io", e.to_string(), Vec::new())
        })?;

        config.sandbox = Some(scratch.path().to_path_buf());
        let dispatcher = Dispatcher::new(config);
        let report = dispatcher
            .convert(&dispatcher.request(&source, &destination))
            .map_err(convert_error_response)?;
        let webp = std::fs::read(&destination).map_err(|e| {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "io", e.to_string(), Vec::new())
        })?;
        Ok((report, webp))
    })
    .await;

    match result {
        Ok(Ok((report, webp))) => {
            log::info!("Converted {} with {} ({} bytes)", file_name, report.converter, webp.len());
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "image/webp".to_string()),
                    (header::HeaderName::from_static("x-converter"), report.converter),
                ],
                webp,
            )
                .into_response()
        }
        Ok(Err(response)) => response,
        Err(e) => {
            log::error!("Conversion task failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal", e.to_string(), Vec::new())
        }
    }
}
