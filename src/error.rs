//! Crate-level errors.
//!
//! Script failures are not errors here: they come back as
//! [`EvaluationResult::Failure`](crate::sandbox::EvaluationResult). These types
//! cover the trusted side, meaning operator configuration and hook handlers.

use std::path::PathBuf;

use thiserror::Error;

/// Error type handlers may fail with.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Invalid or missing boot-time configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("no evaluator has been registered")]
    NoEvaluator,
    #[error("timeoutMs is required")]
    MissingTimeout,
    #[error("timeoutMs must be a positive number of milliseconds")]
    InvalidTimeout,
    #[error("limit {name} must be between 1 and {max}, got {value}")]
    InvalidLimit {
        name: &'static str,
        value: usize,
        max: usize,
    },
    #[error("cannot read {path}: {message}")]
    Io { path: PathBuf, message: String },
    #[error("invalid configuration in {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("unsupported configuration format for {0} (expected .json or .toml)")]
    UnsupportedFormat(PathBuf),
}

/// A handler could not be added to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookRegistrationError {
    #[error("extension point '{point}' carries {registered}, not {attempted}")]
    SignatureMismatch {
        point: String,
        registered: &'static str,
        attempted: &'static str,
    },
}

/// A hook call failed.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("handler for '{point}' failed: {source}")]
    HandlerFailed {
        point: String,
        #[source]
        source: BoxError,
    },
    #[error("extension point '{point}' carries {registered}, not {requested}")]
    SignatureMismatch {
        point: String,
        registered: &'static str,
        requested: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    HookRegistration(#[from] HookRegistrationError),
    #[error(transparent)]
    Hook(#[from] HookError),
}
