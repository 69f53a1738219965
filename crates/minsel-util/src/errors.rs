use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all minsel operations.
#[derive(Debug, Error, Diagnostic)]
pub enum MinselError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or malformed module graph file.
    #[error("Graph file error: {message}")]
    #[diagnostic(help("Check the module graph file for syntax errors"))]
    GraphFile { message: String },

    /// A module version could not be resolved by the requirement provider.
    #[error("Module error: {message}")]
    Module { message: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

/// Convenience alias for `miette::Result<T>`.
pub type MinselResult<T> = miette::Result<T>;
