use std::path::{Path, PathBuf};

use thiserror::Error;

/// Failures while wiring up the adapters a run needs.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("cannot prepare output directory `{}`: {source}", path.display())]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
    #[error("configuration error: {message}")]
    Configuration { message: String },
}

impl InfraError {
    pub fn output_directory(path: &Path, source: std::io::Error) -> Self {
        Self::OutputDirectory {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}
