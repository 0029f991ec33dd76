use std::path::PathBuf;

use crate::config::CwebpOptions;
use crate::converter::{exec, ConversionRequest, Converter};
use crate::error::BackendFailure;

/// Shells out to Google's `cwebp` encoder.
pub struct CwebpConverter {
    options: CwebpOptions,
}

impl CwebpConverter {
    pub fn new(options: CwebpOptions) -> Self {
        Self { options }
    }

    fn binary(&self) -> Option<PathBuf> {
        match &self.options.binary {
            Some(path) => path.is_file().then(|| path.clone()),
            None => exec::find_binary("cwebp"),
        }
    }
}

impl Converter for CwebpConverter {
    fn name(&self) -> &str {
        "cwebp"
    }

    fn available(&self) -> bool {
        self.binary().is_some()
    }

    fn convert(&self, request: &ConversionRequest) -> Result<(), BackendFailure> {
        let binary = self
            .binary()
            .ok_or_else(|| BackendFailure::Unavailable("cwebp binary not found".into()))?;

        let mut cmd = exec::command(&binary, self.options.use_nice);
        cmd.args(args(request)).arg("-o").arg(&request.destination);
        exec::run(cmd)
    }
}

/// Arguments up to and including the source path.
fn args(request: &ConversionRequest) -> Vec<std::ffi::OsString> {
    let metadata = if request.strip_metadata { "none" } else { "all" };
    vec![
        "-q".into(),
        request.quality.to_string().into(),
        "-metadata".into(),
        metadata.into(),
        "-quiet".into(),
        request.source.clone().into_os_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args() {
        let req = ConversionRequest::new("in.png", "out.webp")
            .with_quality(60)
            .with_strip_metadata(false);
        let args: Vec<String> = args(&req)
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args, vec!["-q", "60", "-metadata", "all", "-quiet", "in.png"]);
    }

    #[test]
    fn test_missing_binary_is_unavailable() {
        let converter = CwebpConverter::new(CwebpOptions {
            binary: Some(PathBuf::from("/nonexistent/cwebp")),
            use_nice: false,
        });
        let err = converter
            .convert(&ConversionRequest::new("in.png", "out.webp"))
            .unwrap_err();
        assert!(matches!(err, BackendFailure::Unavailable(_)));
    }
}
