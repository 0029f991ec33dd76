pub mod cwebp;
pub mod ewww;
pub mod exec;
pub mod imagemagick;
pub mod libwebp;

use std::path::{Path, PathBuf};

use crate::config::DEFAULT_QUALITY;
use crate::error::BackendFailure;

/// One conversion job: read `source`, write WebP to `destination`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// 0-100
    pub quality: u8,
    pub strip_metadata: bool,
}

impl ConversionRequest {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            quality: DEFAULT_QUALITY,
            strip_metadata: true,
        }
    }

    /// Values above 100 are clamped.
    pub fn with_quality(mut self, quality: u8) -> Self {
        if quality > 100 {
            log::warn!("Quality {quality} out of range, using 100");
        }
        self.quality = quality.min(100);
        self
    }

    pub fn with_strip_metadata(mut self, strip_metadata: bool) -> Self {
        self.strip_metadata = strip_metadata;
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }
}

/// A backend able to turn a JPEG/PNG file into a WebP file.
///
/// Implementations report "not usable here" conditions through
/// [`BackendFailure`] instead of panicking, so the dispatcher can fall back
/// to the next backend. Returning `Ok(())` claims the destination now exists;
/// the dispatcher verifies that claim.
pub trait Converter: Send + Sync {
    /// Lowercase identifier used in preference lists.
    fn name(&self) -> &str;

    /// Cheap check whether the backend could run here at all.
    fn available(&self) -> bool {
        true
    }

    fn convert(&self, request: &ConversionRequest) -> Result<(), BackendFailure>;
}
