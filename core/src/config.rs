use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Quality used when the caller does not pick one.
pub const DEFAULT_QUALITY: u8 = 85;

/// Ordering hint for the fallback chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Backend names to try first, in this order. Unknown names are ignored.
    pub order: Vec<String>,
    /// Only try the backends named in `order`.
    pub exclude_non_preferred: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CwebpOptions {
    /// Explicit binary path; looked up on `PATH` when unset.
    pub binary: Option<PathBuf>,
    /// Run the binary through `nice` when it is available.
    pub use_nice: bool,
}

impl Default for CwebpOptions {
    fn default() -> Self {
        Self {
            binary: None,
            use_nice: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EwwwOptions {
    /// API key for the EWWW Image Optimizer cloud service.
    pub key: Option<String>,
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for EwwwOptions {
    fn default() -> Self {
        Self {
            key: None,
            endpoint: "https://optimize.exactlywww.com/v2/".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagemagickOptions {
    /// Explicit binary path; `magick` then `convert` are looked up when unset.
    pub binary: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibwebpOptions {
    /// Allow PNG sources. Off by default: the lossy encoder handles
    /// palette images poorly.
    pub convert_pngs: bool,
}

/// Per-backend options, passed through untouched to each converter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterOptions {
    pub cwebp: CwebpOptions,
    pub ewww: EwwwOptions,
    pub imagemagick: ImagemagickOptions,
    pub libwebp: LibwebpOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Default quality 0-100 for requests built from this config
    pub quality: u8,
    /// Default metadata handling for requests built from this config
    pub strip_metadata: bool,
    pub preferences: Preferences,
    pub options: ConverterOptions,
    /// Destination folders may only be created below this directory
    pub sandbox: Option<PathBuf>,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            strip_metadata: true,
            preferences: Preferences::default(),
            options: ConverterOptions::default(),
            sandbox: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl ConvertConfig {
    /// Load a JSON config file. Missing keys take their default values.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Replace the preference list. The last call wins.
    pub fn set_converter_order<I, S>(&mut self, order: I, exclude_non_preferred: bool)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preferences = Preferences {
            order: order.into_iter().map(Into::into).collect(),
            exclude_non_preferred,
        };
    }

    /// Old key/value option setter.
    ///
    /// Understands `("ewww", "key")` and `("gd", "convert_pngs")`, the latter
    /// addressing the native libwebp backend. Returns whether the pair was
    /// recognised; anything else is ignored.
    #[deprecated(note = "set fields on `ConvertConfig::options` instead")]
    pub fn set_converter_option(&mut self, converter: &str, option: &str, value: &str) -> bool {
        match (converter, option) {
            ("ewww", "key") => {
                self.options.ewww.key = Some(value.to_string());
                true
            }
            ("gd", "convert_pngs") => {
                self.options.libwebp.convert_pngs = parse_flag(value);
                true
            }
            _ => {
                log::debug!("Ignoring unknown converter option {converter}.{option}");
                false
            }
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
