//! Error types for Panela

use std::path::PathBuf;
use thiserror::Error;

/// Result type for Panela operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Panela
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid declaration
    #[error("Declaration error: {0}")]
    Declaration(#[from] DeclarationError),

    /// Compilation aborted
    #[error("Compilation error: {0}")]
    Compilation(#[from] CompilationError),

    /// Process-handler server error
    #[error("Server error: {0}")]
    Server(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Raised synchronously while a topology is being declared.
///
/// A failed declaration never mutates the route it was issued on, so the
/// caller can fix the arguments and retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeclarationError {
    #[error("Missing name. Must be a non-empty string")]
    MissingName,

    #[error("Missing hostname. Must be a non-empty string")]
    MissingHostname,

    #[error("Missing arguments: a pathname and a handler, or a handler, must be provided")]
    MissingArguments,

    #[error("Endpoint pathname must not be empty")]
    EmptyPathname,

    #[error("Endpoint '{pathname}' declares no verbs")]
    MissingVerbs { pathname: String },

    #[error("Endpoint '{pathname}' has {count} handlers; exactly one file path or one callable is supported")]
    HandlerCount { pathname: String, count: usize },

    #[error("Endpoint '{pathname}' mixes the static marker with HTTP verbs")]
    StaticMarkerMixed { pathname: String },

    #[error("Static endpoint '{pathname}' must be served from a directory path, not a callable")]
    StaticRequiresDirectory { pathname: String },

    #[error("Middleware '{pathname}' needs exactly one callable handler")]
    MiddlewareRequiresCallable { pathname: String },

    #[error("Unknown verb '{verb}'")]
    UnknownVerb { verb: String },
}

/// Aborts a whole compiler run. No configuration file is written and no
/// listener is left behind when one of these is returned.
#[derive(Error, Debug)]
pub enum CompilationError {
    #[error("Route '{pathname}' is nested deeper than the limit of {limit}")]
    NestingTooDeep { pathname: String, limit: usize },

    #[error("Location '{pathname}' on host '{hostname}' is declared as both {first} and {second}")]
    ConflictingLocation {
        hostname: String,
        pathname: String,
        first: &'static str,
        second: &'static str,
    },

    #[error("Failed to write configuration to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Process-handler routes cannot be served together: {0}")]
    ConflictingRoutes(String),

    #[error("Process-handler server failed: {0}")]
    Backend(String),
}

/// Builder step failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("There are no steps to process")]
    NoSteps,

    #[error("Step {index} failed: {message}")]
    Step { index: usize, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_error_converts() {
        let err: Error = DeclarationError::MissingHostname.into();
        assert!(matches!(err, Error::Declaration(DeclarationError::MissingHostname)));
        assert!(err.to_string().contains("hostname"));
    }

    #[test]
    fn test_handler_count_message() {
        let err = DeclarationError::HandlerCount {
            pathname: "/api".to_string(),
            count: 2,
        };
        assert_eq!(
            err.to_string(),
            "Endpoint '/api' has 2 handlers; exactly one file path or one callable is supported"
        );
    }
}
