//! CLI error type with exit code mapping

use helmion_core::CoreError;
use helmion_engine::EngineError;
use helmion_repo::RepoError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// Everything a command can fail with
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error(transparent)]
    #[diagnostic(code(helmion::core))]
    Core(#[from] CoreError),

    #[error(transparent)]
    #[diagnostic(code(helmion::repo))]
    Repo(#[from] RepoError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Engine(#[from] EngineError),

    /// Writing output failed
    #[error("IO error: {message}")]
    #[diagnostic(code(helmion::cli::io))]
    Io {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Runtime setup or other unexpected failure
    #[error("Internal error: {message}")]
    #[diagnostic(code(helmion::cli::internal))]
    Internal { message: String },
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Core(e) => exit_codes::for_kind(e.kind()),
            CliError::Repo(e) => exit_codes::for_kind(e.kind()),
            CliError::Engine(e) => exit_codes::for_kind(e.kind()),
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Internal { .. } => exit_codes::ERROR,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// IO failure on `path`
    pub fn io(path: &std::path::Path, err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{}: {}", path.display(), err),
            help: None,
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_follow_kind() {
        let err = CliError::from(CoreError::parameter("bad --set"));
        assert_eq!(err.exit_code(), exit_codes::PARAMETER_ERROR);

        let err = CliError::from(RepoError::HttpError {
            url: "https://charts.example.com/index.yaml".to_string(),
            status: 503,
        });
        assert_eq!(err.exit_code(), exit_codes::NETWORK_ERROR);

        let err = CliError::from(EngineError::NotAMapping {
            index: 0,
            document: "\"text\"".to_string(),
        });
        assert_eq!(err.exit_code(), exit_codes::TEMPLATE_ERROR);
    }

    #[test]
    fn test_engine_diagnostic_forwarded() {
        let err = CliError::from(EngineError::CommandFailed {
            command: "helm template web nginx".to_string(),
            status: "exit status: 1".to_string(),
            stdout: String::new(),
            stderr: "Error: boom".to_string(),
        });
        assert_eq!(
            err.code().map(|c| c.to_string()),
            Some("helmion::engine::command_failed".to_string())
        );
    }
}
