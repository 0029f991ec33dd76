//! JPEG/PNG to WebP conversion with backend fallback.
//!
//! A [`Dispatcher`] validates the source, prepares the destination and then
//! tries each registered [`Converter`] in preference order until one of them
//! produces the WebP file.

pub mod config;
pub mod converter;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod paths;
pub mod registry;

use std::path::Path;

pub use config::{ConvertConfig, ConverterOptions, Preferences, DEFAULT_QUALITY};
pub use converter::{ConversionRequest, Converter};
pub use dispatch::{Attempt, ConversionOutcome, ConversionReport, Dispatcher};
pub use error::{BackendFailure, ConvertError};
pub use format::SourceFormat;
pub use registry::{list_ordered_converters, Backend, ConverterDescriptor, Registry};

/// Convert `source` to WebP at `destination` using the built-in backends.
///
/// `quality` and `strip_metadata` override `config.quality` and
/// `config.strip_metadata`; only the preferences, backend options and
/// sandbox are taken from `config`. Use [`Dispatcher::request`] to build a
/// request from the config defaults instead.
pub fn convert(
    source: impl AsRef<Path>,
    destination: impl AsRef<Path>,
    quality: u8,
    strip_metadata: bool,
    config: &ConvertConfig,
) -> Result<ConversionReport, ConvertError> {
    let dispatcher = Dispatcher::new(config.clone());
    let request = request_overriding(
        &dispatcher,
        source.as_ref(),
        destination.as_ref(),
        quality,
        strip_metadata,
    );
    dispatcher.convert(&request)
}

fn request_overriding(
    dispatcher: &Dispatcher,
    source: &Path,
    destination: &Path,
    quality: u8,
    strip_metadata: bool,
) -> ConversionRequest {
    dispatcher
        .request(source, destination)
        .with_quality(quality)
        .with_strip_metadata(strip_metadata)
}
