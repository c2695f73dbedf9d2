use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all Hoist operations.
#[derive(Debug, Error, Diagnostic)]
pub enum HoistError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or malformed run configuration.
    #[error("Configuration error: {message}")]
    #[diagnostic(help("Check your hoist.toml for syntax errors"))]
    Config { message: String },

    /// A repository query failed at the transport level.
    #[error("Repository error: {message}")]
    Repository { message: String },

    /// A repository type name has no registered factory.
    #[error("Unknown repository type `{name}`")]
    #[diagnostic(help("Built-in repository types: directory"))]
    UnknownRepositoryType { name: String },

    /// The configured digest algorithm is not supported.
    #[error("Digest algorithm `{name}` is not available")]
    #[diagnostic(help("Supported algorithms: SHA-1, SHA-256, MD5"))]
    DigestAlgorithmUnavailable { name: String },

    /// Two chosen modules plan an artifact at the same file path.
    #[error("Duplicate artifact path: {file}")]
    DuplicateArtifact { file: String },

    /// An artifact transfer failed after exhausting retries.
    #[error("Transfer failed: {message}")]
    Transfer { message: String },

    /// The persisted state file could not be parsed.
    #[error("State file is corrupt: {message}")]
    StateFileCorrupt { message: String },

    /// The run was cancelled before completion.
    #[error("Run cancelled")]
    Cancelled,

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

/// Convenience alias for `miette::Result<T>`.
pub type HoistResult<T> = miette::Result<T>;
