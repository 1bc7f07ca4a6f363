//! Engine error types with diagnostic formatting

use helmion_core::{CoreError, ErrorKind};
use miette::Diagnostic;
use thiserror::Error;

/// Template engine driver errors
///
/// Process failures keep the exact command line and everything the engine
/// printed so a failed render can be reproduced by hand.
#[derive(Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum EngineError {
    #[error(transparent)]
    #[diagnostic(code(helmion::engine::core))]
    Core(#[from] CoreError),

    #[error("Failed to start template engine: {command}")]
    #[diagnostic(
        code(helmion::engine::spawn),
        help("check that `{program}` is installed and on PATH")
    )]
    Spawn {
        command: String,
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Template engine exited with {status}: {command}")]
    #[diagnostic(code(helmion::engine::command_failed), help("{stderr}"))]
    CommandFailed {
        command: String,
        status: String,
        stdout: String,
        stderr: String,
    },

    #[error("Template engine output is not valid UTF-8: {command}")]
    #[diagnostic(code(helmion::engine::encoding))]
    InvalidEncoding { command: String },

    #[error("Template engine output could not be parsed: {message}")]
    #[diagnostic(code(helmion::engine::parse))]
    OutputParse {
        command: String,
        message: String,
        stdout: String,
    },

    #[error("Document {index} of the template output is not a mapping: {document}")]
    #[diagnostic(code(helmion::engine::not_a_mapping))]
    NotAMapping { index: usize, document: String },

    #[error("Failed to write values file: {source}")]
    #[diagnostic(code(helmion::engine::values_file))]
    ValuesFile {
        #[source]
        source: std::io::Error,
    },
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Core(e) => e.kind(),
            Self::ValuesFile { .. } => ErrorKind::InputOutput,
            Self::Spawn { .. }
            | Self::CommandFailed { .. }
            | Self::InvalidEncoding { .. }
            | Self::OutputParse { .. }
            | Self::NotAMapping { .. } => ErrorKind::TemplateEngine,
        }
    }
}
