use std::error::Error as StdError;

use thiserror::Error;

use crate::application::export::ExportError;
use crate::application::ports::{SourceError, TransportError};
use crate::domain::error::ValidationError;
use crate::infra::error::InfraError;

/// Error chain flattened into displayable lines, outermost first.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            let message = inner.to_string();
            if messages.last() != Some(&message) {
                messages.push(message);
            }
            current = inner.source();
        }
        Self { source, messages }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Document(#[from] SourceError),
    #[error("API request failed: {0}")]
    Api(#[from] TransportError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Validation(_)
            | AppError::Export(ExportError::Validation(_))
            | AppError::Infra(InfraError::Configuration { .. }) => 2,
            _ => 1,
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Export(ExportError::Validation(err))
    }
}
