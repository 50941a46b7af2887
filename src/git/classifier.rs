use crate::error::GitError;

/// Marker git prints when the working directory is outside any repository
pub const NOT_A_REPOSITORY_MARKER: &str = "fatal: not a git repository";

/// Marker prefix for every other fatal condition
pub const FATAL_MARKER: &str = "fatal";

/// Outcome of scanning command output for failure markers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    None,
    NotARepository,
    GenericFailure(String),
}

/// Which classifier hits an operation treats as failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalCheck {
    /// Only the not-a-repository marker fails the call
    NotARepositoryOnly,
    /// Any fatal marker fails the call
    AnyFatal,
}

/// Scan output text for known failure markers
///
/// The not-a-repository marker wins over any other fatal text.
pub fn classify(output: &str) -> Classification {
    if output.contains(NOT_A_REPOSITORY_MARKER) {
        Classification::NotARepository
    } else if output.contains(FATAL_MARKER) {
        Classification::GenericFailure(output.to_string())
    } else {
        Classification::None
    }
}

impl Classification {
    /// Convert a classifier hit into the error an operation reports
    pub fn into_error(self, check: FatalCheck) -> Option<GitError> {
        match (self, check) {
            (Classification::None, _) => None,
            (Classification::NotARepository, _) => Some(GitError::NotARepository),
            (Classification::GenericFailure(_), FatalCheck::NotARepositoryOnly) => None,
            (Classification::GenericFailure(text), FatalCheck::AnyFatal) => {
                Some(GitError::OutputError(text))
            }
        }
    }
}
