use std::ffi::OsString;
use std::path::PathBuf;

use crate::config::ImagemagickOptions;
use crate::converter::{exec, ConversionRequest, Converter};
use crate::error::BackendFailure;

/// Shells out to ImageMagick (`magick`, or the v6 `convert` entry point).
pub struct ImagemagickConverter {
    options: ImagemagickOptions,
}

impl ImagemagickConverter {
    pub fn new(options: ImagemagickOptions) -> Self {
        Self { options }
    }

    fn binary(&self) -> Option<PathBuf> {
        match &self.options.binary {
            Some(path) => path.is_file().then(|| path.clone()),
            None => exec::find_binary("magick").or_else(|| exec::find_binary("convert")),
        }
    }
}

impl Converter for ImagemagickConverter {
    fn name(&self) -> &str {
        "imagemagick"
    }

    fn available(&self) -> bool {
        self.binary().is_some()
    }

    fn convert(&self, request: &ConversionRequest) -> Result<(), BackendFailure> {
        let binary = self
            .binary()
            .ok_or_else(|| BackendFailure::Unavailable("imagemagick binary not found".into()))?;

        let mut cmd = exec::command(&binary, false);
        cmd.args(args(request));
        exec::run(cmd)
    }
}

fn args(request: &ConversionRequest) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        request.source.clone().into_os_string(),
        "-quality".into(),
        request.quality.to_string().into(),
    ];
    if request.strip_metadata {
        args.push("-strip".into());
    }
    args.push("-define".into());
    args.push("webp:method=6".into());

    // The prefix forces WebP output whatever the destination extension is.
    let mut target = OsString::from("webp:");
    target.push(request.destination.as_os_str());
    args.push(target);
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(req: &ConversionRequest) -> Vec<String> {
        args(req)
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_args_strip() {
        let req = ConversionRequest::new("in.jpg", "out/img.bin");
        assert_eq!(
            strings(&req),
            vec![
                "in.jpg",
                "-quality",
                "85",
                "-strip",
                "-define",
                "webp:method=6",
                "webp:out/img.bin"
            ]
        );
    }

    #[test]
    fn test_args_keep_metadata() {
        let req = ConversionRequest::new("in.jpg", "out.webp").with_strip_metadata(false);
        assert!(!strings(&req).contains(&"-strip".to_string()));
    }
}
