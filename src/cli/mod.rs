//! CLI support for pipegen
//!
//! Provides programmatic access to pipegen CLI functionality for embedding
//! in build tooling.

mod decode;
mod generate;

pub use decode::{execute_decode, DecodeOptions};
pub use generate::{execute_generate, GenerateOptions};

use std::io;

/// Errors that can occur during CLI operations
#[derive(Debug)]
pub enum CliError {
    /// Schema parse error
    Format(crate::FormatError),
    /// Stage generation error
    Gen(crate::GenError),
    /// Pipeline template error
    Render(crate::RenderError),
    /// Register dump error
    Decode(crate::DecodeError),
    /// IO error
    Io(io::Error),
    /// No input provided
    NoInput,
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Format(e) => write!(f, "Schema error: {}", e),
            CliError::Gen(e) => write!(f, "Generation error: {}", e),
            CliError::Render(e) => write!(f, "Template error: {}", e),
            CliError::Decode(e) => write!(f, "Dump error: {}", e),
            CliError::Io(e) => write!(f, "IO error: {}", e),
            CliError::NoInput => write!(f, "No input provided. Pass a file path or pipe to stdin."),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Format(e) => Some(e),
            CliError::Gen(e) => Some(e),
            CliError::Render(e) => Some(e),
            CliError::Decode(e) => Some(e),
            CliError::Io(e) => Some(e),
            CliError::NoInput => None,
        }
    }
}

impl From<crate::FormatError> for CliError {
    fn from(e: crate::FormatError) -> Self {
        CliError::Format(e)
    }
}

impl From<crate::GenError> for CliError {
    fn from(e: crate::GenError) -> Self {
        CliError::Gen(e)
    }
}

impl From<crate::RenderError> for CliError {
    fn from(e: crate::RenderError) -> Self {
        CliError::Render(e)
    }
}

impl From<crate::DecodeError> for CliError {
    fn from(e: crate::DecodeError) -> Self {
        CliError::Decode(e)
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}
