//! Error types for the tutoring engine.
//!
//! Two families live here. [`TutorError`] covers structural problems
//! (configuration, curriculum loading, out-of-range navigation) that are
//! surfaced to the caller. [`GenerationError`] covers generation backend
//! failures, which the gateway always recovers from locally.

use std::path::PathBuf;

/// A specialized `Result` type for tutoring engine operations.
pub type Result<T> = std::result::Result<T, TutorError>;

/// Errors that can occur while configuring or driving a tutoring session.
///
/// Error variants are organized by subsystem and include actionable suggestions
/// where possible.
#[derive(Debug, thiserror::Error)]
pub enum TutorError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid JSON syntax in configuration file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your tutor.json with a JSON linter")]
    ConfigParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    // ========================================================================
    // Curriculum Loading Errors
    // ========================================================================
    /// Curriculum file was not found at the specified path.
    #[error("Curriculum not found: '{path}'\n\nSuggestion: Check the 'curriculum' field in tutor.json or pass the path explicitly")]
    CurriculumNotFound {
        /// Path where the curriculum was expected.
        path: PathBuf,
    },

    /// Curriculum file exceeds the size limit.
    #[error("Curriculum exceeds size limit (1024KB): '{path}' is {size_kb}KB\n\nSuggestion: Split the exercise into several smaller exercises")]
    CurriculumTooLarge {
        /// Path to the oversized curriculum.
        path: PathBuf,
        /// Actual size in kilobytes.
        size_kb: u64,
    },

    /// Curriculum file contains non-UTF-8 content.
    #[error("Curriculum has invalid encoding: '{path}'\n\nSuggestion: Convert the file to UTF-8 encoding")]
    CurriculumEncodingError {
        /// Path to the curriculum with encoding issues.
        path: PathBuf,
    },

    /// Curriculum file is not a valid exercise document.
    #[error("Invalid curriculum '{path}': {message}\n\nSuggestion: Compare the file against the exercise format (metadata, first_message, end_message, checkpoints)")]
    CurriculumParseError {
        /// Path to the curriculum file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Curriculum structure violates the numbering or content rules.
    #[error("Malformed curriculum: {message}\n\nSuggestion: {suggestion}")]
    CurriculumValidationError {
        /// Description of the structural problem.
        message: String,
        /// Actionable suggestion for the author.
        suggestion: String,
    },

    // ========================================================================
    // Progression Errors
    // ========================================================================
    /// A lookup was attempted past the last checkpoint.
    #[error("Checkpoint {checkpoint} is out of range: the exercise has {available} checkpoint(s)")]
    CheckpointOutOfRange {
        /// The checkpoint the pointer refers to.
        checkpoint: usize,
        /// Number of checkpoints in the curriculum.
        available: usize,
    },

    /// A navigation target does not exist.
    #[error("Checkpoint {requested} does not exist. Available: 1-{available}")]
    InvalidCheckpoint {
        /// The requested checkpoint number.
        requested: usize,
        /// Number of checkpoints in the curriculum.
        available: usize,
    },

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// No session is registered under the given id.
    #[error("Session not found: '{id}'")]
    SessionNotFound {
        /// The unknown session id.
        id: String,
    },

    // ========================================================================
    // General I/O Errors
    // ========================================================================
    /// General I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TutorError {
    /// Creates a new `ConfigParseError` with the given path and message.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `CurriculumNotFound` error.
    #[must_use]
    pub fn curriculum_not_found(path: impl Into<PathBuf>) -> Self {
        Self::CurriculumNotFound { path: path.into() }
    }

    /// Creates a new `CurriculumTooLarge` error.
    #[must_use]
    pub fn curriculum_too_large(path: impl Into<PathBuf>, size_kb: u64) -> Self {
        Self::CurriculumTooLarge {
            path: path.into(),
            size_kb,
        }
    }

    /// Creates a new `CurriculumEncodingError`.
    #[must_use]
    pub fn curriculum_encoding(path: impl Into<PathBuf>) -> Self {
        Self::CurriculumEncodingError { path: path.into() }
    }

    /// Creates a new `CurriculumParseError`.
    #[must_use]
    pub fn curriculum_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::CurriculumParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `CurriculumValidationError`.
    #[must_use]
    pub fn curriculum_validation(
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::CurriculumValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `CheckpointOutOfRange` error.
    #[must_use]
    pub const fn checkpoint_out_of_range(checkpoint: usize, available: usize) -> Self {
        Self::CheckpointOutOfRange {
            checkpoint,
            available,
        }
    }

    /// Creates a new `InvalidCheckpoint` error.
    #[must_use]
    pub const fn invalid_checkpoint(requested: usize, available: usize) -> Self {
        Self::InvalidCheckpoint {
            requested,
            available,
        }
    }

    /// Creates a new `SessionNotFound` error.
    #[must_use]
    pub fn session_not_found(id: impl Into<String>) -> Self {
        Self::SessionNotFound { id: id.into() }
    }
}

// ============================================================================
// Generation Errors
// ============================================================================

/// Categories of generation backend failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationErrorKind {
    /// The attempt exceeded its time budget.
    Timeout,
    /// Network or connection failure.
    Transport,
    /// Authentication failure (missing or invalid API key).
    Authentication,
    /// Rate limit exceeded.
    RateLimit,
    /// Server error (5xx responses).
    Server,
    /// The backend answered, but not with the requested structure.
    MalformedOutput,
    /// Other unclassified errors.
    Other,
}

impl std::fmt::Display for GenerationErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Transport => write!(f, "transport"),
            Self::Authentication => write!(f, "authentication"),
            Self::RateLimit => write!(f, "rate_limit"),
            Self::Server => write!(f, "server"),
            Self::MalformedOutput => write!(f, "malformed_output"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl GenerationErrorKind {
    /// Maps an HTTP status code returned by a backend to an error kind.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Authentication,
            408 => Self::Timeout,
            429 => Self::RateLimit,
            500..=599 => Self::Server,
            _ => Self::Other,
        }
    }
}

/// A single failed attempt against one generation backend.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind} error from backend '{backend}': {message}")]
pub struct GenerationError {
    /// Name of the backend that failed.
    pub backend: String,
    /// Category of the failure.
    pub kind: GenerationErrorKind,
    /// Detailed error message.
    pub message: String,
}

impl GenerationError {
    /// Creates a new `GenerationError`.
    #[must_use]
    pub fn new(
        backend: impl Into<String>,
        kind: GenerationErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            backend: backend.into(),
            kind,
            message: message.into(),
        }
    }

    /// Creates a timeout error for the given backend.
    #[must_use]
    pub fn timeout(backend: impl Into<String>, timeout: std::time::Duration) -> Self {
        Self::new(
            backend,
            GenerationErrorKind::Timeout,
            format!("no answer within {}ms", timeout.as_millis()),
        )
    }

    /// Creates a malformed-output error for the given backend.
    #[must_use]
    pub fn malformed(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(backend, GenerationErrorKind::MalformedOutput, message)
    }

    /// Returns `true` if a later attempt against the same backend could succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            GenerationErrorKind::Timeout
                | GenerationErrorKind::Transport
                | GenerationErrorKind::RateLimit
                | GenerationErrorKind::Server
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = TutorError::curriculum_not_found("/path/to/exercise.json");
        let msg = err.to_string();
        assert!(msg.contains("Curriculum not found"));
        assert!(msg.contains("/path/to/exercise.json"));
        assert!(msg.contains("Suggestion"));
    }

    #[test]
    fn test_invalid_checkpoint_display() {
        let err = TutorError::invalid_checkpoint(5, 3);
        assert_eq!(err.to_string(), "Checkpoint 5 does not exist. Available: 1-3");
    }

    #[test]
    fn test_checkpoint_out_of_range_display() {
        let err = TutorError::checkpoint_out_of_range(4, 3);
        let msg = err.to_string();
        assert!(msg.contains("Checkpoint 4"));
        assert!(msg.contains("3 checkpoint(s)"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: TutorError = io_err.into();
        assert!(matches!(err, TutorError::Io(_)));
    }

    #[test]
    fn test_curriculum_too_large_display() {
        let err = TutorError::curriculum_too_large("/big/exercise.json", 2048);
        let msg = err.to_string();
        assert!(msg.contains("2048KB"));
        assert!(msg.contains("1024KB"));
    }

    #[test]
    fn test_generation_error_kind_display() {
        assert_eq!(GenerationErrorKind::RateLimit.to_string(), "rate_limit");
        assert_eq!(
            GenerationErrorKind::MalformedOutput.to_string(),
            "malformed_output"
        );
    }

    #[test]
    fn test_generation_error_kind_from_status() {
        assert_eq!(
            GenerationErrorKind::from_status(401),
            GenerationErrorKind::Authentication
        );
        assert_eq!(
            GenerationErrorKind::from_status(429),
            GenerationErrorKind::RateLimit
        );
        assert_eq!(
            GenerationErrorKind::from_status(503),
            GenerationErrorKind::Server
        );
        assert_eq!(
            GenerationErrorKind::from_status(400),
            GenerationErrorKind::Other
        );
    }

    #[test]
    fn test_generation_error_is_transient() {
        let timeout = GenerationError::timeout("gpt-4o", std::time::Duration::from_secs(5));
        assert!(timeout.is_transient());
        assert!(timeout.to_string().contains("5000ms"));

        let malformed = GenerationError::malformed("gpt-4o", "not json");
        assert!(!malformed.is_transient());

        let auth = GenerationError::new("gpt-4o", GenerationErrorKind::Authentication, "bad key");
        assert!(!auth.is_transient());
    }
}
