//! Core error types and the error taxonomy shared by every helmion crate

use thiserror::Error;

/// Broad category of a failure
///
/// Every helmion error type maps onto exactly one of these through its
/// `kind()` method, so callers can react without matching on variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed chart metadata, unknown apiVersion, bad processor setup
    Configuration,
    /// Misuse of an engine API
    Parameter,
    /// YAML/tar parse failures and missing archive files
    InputOutput,
    /// Non-success HTTP responses and connection failures
    Network,
    /// Template engine process failures
    TemplateEngine,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Configuration => "configuration",
            Self::Parameter => "parameter",
            Self::InputOutput => "input/output",
            Self::Network => "network",
            Self::TemplateEngine => "template engine",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CoreError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Parameter error: {message}")]
    Parameter { message: String },

    #[error("Input/output error: {message}")]
    InputOutput { message: String },

    #[error("Patch failed on {resource}: {message}")]
    Patch { resource: String, message: String },
}

impl CoreError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn parameter(message: impl Into<String>) -> Self {
        Self::Parameter {
            message: message.into(),
        }
    }

    pub fn input_output(message: impl Into<String>) -> Self {
        Self::InputOutput {
            message: message.into(),
        }
    }

    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration { .. } | Self::Patch { .. } => ErrorKind::Configuration,
            Self::Parameter { .. } => ErrorKind::Parameter,
            Self::InputOutput { .. } => ErrorKind::InputOutput,
        }
    }
}

impl From<serde_yaml::Error> for CoreError {
    fn from(e: serde_yaml::Error) -> Self {
        CoreError::InputOutput {
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::InputOutput {
            message: e.to_string(),
        }
    }
}

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::InputOutput {
            message: e.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
