use miette::Diagnostic;
use thiserror::Error;

/// Main error type for tailor operations.
///
/// Only genuine configuration and plugin declaration problems are errors.
/// Candidates that fail to parse or match are dropped silently and never
/// surface here.
#[derive(Error, Diagnostic, Debug)]
pub enum TailorError {
    #[error("IO error: {0}")]
    #[diagnostic(code(tailor::io))]
    IoError(#[from] std::io::Error),

    #[error("IO error with {path}: {message}")]
    #[diagnostic(code(tailor::io))]
    Io {
        path: std::path::PathBuf,
        message: String,
    },

    #[error("Config error: {message}")]
    #[diagnostic(code(tailor::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Circular theme reference: {}", cycle.join(" -> "))]
    #[diagnostic(
        code(tailor::config::cycle),
        help("A theme function resolves a key that depends on itself")
    )]
    CycleDetected { cycle: Vec<String> },

    #[error("Invalid utility registration: {message}")]
    #[diagnostic(code(tailor::plugin))]
    UtilityRegistration {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("CSS error: {message}")]
    #[diagnostic(code(tailor::css))]
    Css {
        message: String,
        #[help]
        help: Option<String>,
    },
}

impl TailorError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        TailorError::Config {
            message: message.into(),
            help: None,
        }
    }

    pub(crate) fn registration(message: impl Into<String>) -> Self {
        TailorError::UtilityRegistration {
            message: message.into(),
            help: None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TailorError>;
