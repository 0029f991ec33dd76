use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use webp_convert_core::ConvertConfig;

/// Convert JPEG/PNG images to WebP, falling back across available backends
#[derive(Debug, Parser)]
#[command(name = "webp-convert", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Convert images to WebP
    Convert {
        /// Input file or directory
        input: PathBuf,

        /// Output file or directory (default: next to each input, with a .webp extension)
        output: Option<PathBuf>,

        /// Process directories recursively
        #[arg(short, long)]
        recursive: bool,

        #[command(flatten)]
        settings: Settings,
    },

    /// List converters in the order they would be tried
    Converters {
        #[command(flatten)]
        settings: Settings,
    },
}

/// Flags shared by every command that builds a conversion config.
#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// JSON config file; flags below override its values
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Quality 0–100 (default: 85)
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub quality: Option<u8>,

    /// Keep EXIF/XMP/ICC metadata where the backend supports it
    #[arg(long)]
    pub keep_metadata: bool,

    /// Preferred converters, tried first in this order
    #[arg(long, value_delimiter = ',', value_name = "NAMES")]
    pub order: Vec<String>,

    /// Only try the converters given with --order
    #[arg(long, requires = "order")]
    pub only_preferred: bool,

    /// API key for the ewww cloud converter
    #[arg(long, env = "EWWW_API_KEY", hide_env_values = true)]
    pub ewww_key: Option<String>,

    /// Let the native libwebp converter handle PNG sources
    #[arg(long)]
    pub convert_pngs: bool,

    /// Run cwebp at normal priority instead of through `nice`
    #[arg(long)]
    pub no_nice: bool,

    /// Refuse to create output folders outside this directory
    #[arg(long, value_name = "DIR")]
    pub sandbox: Option<PathBuf>,
}

impl Settings {
    pub fn to_config(&self) -> Result<ConvertConfig> {
        let mut config = match &self.config {
            Some(path) => ConvertConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => ConvertConfig::default(),
        };

        if let Some(quality) = self.quality {
            config.quality = quality;
        }
        if self.keep_metadata {
            config.strip_metadata = false;
        }
        if !self.order.is_empty() {
            config.set_converter_order(self.order.iter().map(|s| s.trim()), self.only_preferred);
        }
        if let Some(key) = &self.ewww_key {
            config.options.ewww.key = Some(key.clone());
        }
        if self.convert_pngs {
            config.options.libwebp.convert_pngs = true;
        }
        if self.no_nice {
            config.options.cwebp.use_nice = false;
        }
        if let Some(sandbox) = &self.sandbox {
            config.sandbox = Some(sandbox.clone());
        }

        Ok(config)
    }
}
