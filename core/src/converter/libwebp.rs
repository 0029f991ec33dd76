use std::fs;

use crate::config::LibwebpOptions;
use crate::converter::{ConversionRequest, Converter};
use crate::error::BackendFailure;
use crate::format::SourceFormat;

/// In-process conversion: `image` decodes, libwebp (via the `webp` crate) encodes.
///
/// Output never carries metadata, whatever the request asks for.
pub struct LibwebpConverter {
    options: LibwebpOptions,
}

impl LibwebpConverter {
    pub fn new(options: LibwebpOptions) -> Self {
        Self { options }
    }
}

impl Converter for LibwebpConverter {
    fn name(&self) -> &str {
        "libwebp"
    }

    fn convert(&self, request: &ConversionRequest) -> Result<(), BackendFailure> {
        let format = SourceFormat::from_path(&request.source).ok_or_else(|| {
            BackendFailure::Unavailable("unrecognised source extension".into())
        })?;

        if format == SourceFormat::Png && !self.options.convert_pngs {
            return Err(BackendFailure::Unavailable(
                "PNG conversion is disabled (enable convert_pngs)".into(),
            ));
        }

        if !request.strip_metadata {
            log::debug!("libwebp does not copy metadata, output will be stripped");
        }

        let input = fs::read(&request.source).map_err(|e| BackendFailure::io(&request.source, e))?;
        let encoded = encode(&input, format, request.quality)?;

        fs::write(&request.destination, encoded)
            .map_err(|e| BackendFailure::io(&request.destination, e))
    }
}

fn encode(input: &[u8], format: SourceFormat, quality: u8) -> Result<Vec<u8>, BackendFailure> {
    let img = image::load_from_memory_with_format(input, format.image_format())
        .map_err(|e| BackendFailure::Failed(format!("failed to decode {}: {e}", format.as_str())))?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    log::debug!("Encoding {}x{} {} at quality {}", width, height, format.as_str(), quality);

    let encoded = webp::Encoder::from_rgba(rgba.as_raw(), width, height).encode(quality as f32);
    Ok(encoded.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn write_sample(path: &std::path::Path) {
        let img = RgbImage::from_fn(8, 8, |x, y| Rgb([(x * 30) as u8, (y * 30) as u8, 128]));
        img.save(path).unwrap();
    }

    #[test]
    fn test_converts_jpeg() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("in.jpg");
        let dest = dir.path().join("out.webp");
        write_sample(&source);

        LibwebpConverter::new(LibwebpOptions::default())
            .convert(&ConversionRequest::new(&source, &dest).with_quality(75))
            .unwrap();

        let out = fs::read(&dest).unwrap();
        assert_eq!(&out[0..4], b"RIFF");
        assert_eq!(&out[8..12], b"WEBP");
    }

    #[test]
    fn test_png_requires_opt_in() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("in.png");
        let dest = dir.path().join("out.webp");
        write_sample(&source);
        let request = ConversionRequest::new(&source, &dest);

        let err = LibwebpConverter::new(LibwebpOptions::default())
            .convert(&request)
            .unwrap_err();
        assert!(matches!(err, BackendFailure::Unavailable(_)));
        assert!(!dest.exists());

        LibwebpConverter::new(LibwebpOptions { convert_pngs: true })
            .convert(&request)
            .unwrap();
        assert!(dest.exists());
    }

    #[test]
    fn test_corrupt_input_fails() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("broken.jpg");
        fs::write(&source, b"not a jpeg").unwrap();

        let err = LibwebpConverter::new(LibwebpOptions::default())
            .convert(&ConversionRequest::new(&source, dir.path().join("out.webp")))
            .unwrap_err();
        assert!(matches!(err, BackendFailure::Failed(_)));
    }
}
