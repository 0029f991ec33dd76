use std::fmt;
use std::fs;

use serde::Serialize;

use crate::config::ConvertConfig;
use crate::converter::{ConversionRequest, Converter};
use crate::error::{BackendFailure, ConvertError};
use crate::paths;
use crate::registry::{list_ordered_converters, Registry};

/// What happened when one backend was tried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum ConversionOutcome {
    Success,
    Skipped(String),
    Failed(String),
}

impl fmt::Display for ConversionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Skipped(reason) => write!(f, "skipped: {reason}"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

impl From<BackendFailure> for ConversionOutcome {
    fn from(failure: BackendFailure) -> Self {
        match failure {
            BackendFailure::Unavailable(reason) => Self::Skipped(reason),
            other => Self::Failed(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attempt {
    pub converter: String,
    pub outcome: ConversionOutcome,
}

/// Result of a successful dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionReport {
    /// Backend that produced the destination file
    pub converter: String,
    /// Every backend tried, in order, the winner last
    pub attempts: Vec<Attempt>,
}

/// Tries converters one after another until one produces the destination file.
pub struct Dispatcher {
    registry: Registry,
    config: ConvertConfig,
}

impl Dispatcher {
    /// Dispatcher over every built-in backend.
    pub fn new(config: ConvertConfig) -> Self {
        let registry = Registry::builtin(&config.options);
        Self { registry, config }
    }

    pub fn with_registry(registry: Registry, config: ConvertConfig) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn set_converter_order<I, S>(&mut self, order: I, exclude_non_preferred: bool)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.set_converter_order(order, exclude_non_preferred);
    }

    /// Names in the order `convert` will try them.
    pub fn converter_order(&self) -> Vec<String> {
        let names = self.registry.names();
        list_ordered_converters(names.as_slice(), &self.config.preferences)
    }

    /// Request for `source` → `destination` using this dispatcher's default
    /// quality and metadata settings.
    pub fn request(
        &self,
        source: impl Into<std::path::PathBuf>,
        destination: impl Into<std::path::PathBuf>,
    ) -> ConversionRequest {
        ConversionRequest::new(source, destination)
            .with_quality(self.config.quality)
            .with_strip_metadata(self.config.strip_metadata)
    }

    pub fn convert(&self, request: &ConversionRequest) -> Result<ConversionReport, ConvertError> {
        paths::validate_source(&request.source)?;
        paths::prepare_destination(&request.destination, self.config.sandbox.as_deref())?;

        let mut attempts = Vec::new();

        for converter in self.registry.ordered(&self.config.preferences) {
            let name = converter.name().to_string();
            log::debug!(
                "Trying {} for {} → {}",
                name,
                request.source.display(),
                request.destination.display()
            );

            let outcome = attempt(converter, request);
            let success = outcome == ConversionOutcome::Success;
            attempts.push(Attempt {
                converter: name.clone(),
                outcome,
            });

            if success {
                log::info!("Converted {} with {}", request.source.display(), name);
                return Ok(ConversionReport {
                    converter: name,
                    attempts,
                });
            }

            if let Some(last) = attempts.last() {
                log::warn!("{}: {}", name, last.outcome);
            }
            discard_partial_output(request);
        }

        Err(ConvertError::NoAvailableConverter { attempts })
    }
}

fn attempt(converter: &dyn Converter, request: &ConversionRequest) -> ConversionOutcome {
    match converter.convert(request) {
        Ok(()) if request.destination.is_file() => ConversionOutcome::Success,
        Ok(()) => ConversionOutcome::Failed(
            "reported success but no destination file was produced".into(),
        ),
        Err(failure) => failure.into(),
    }
}

/// Leave the destination absent for the next converter.
fn discard_partial_output(request: &ConversionRequest) {
    let destination = &request.destination;
    let removed = if destination.is_dir() {
        fs::remove_dir_all(destination)
    } else if destination.exists() {
        fs::remove_file(destination)
    } else {
        Ok(())
    };
    if let Err(e) = removed {
        log::warn!("Failed to remove partial output {}: {}", destination.display(), e);
    }
}
