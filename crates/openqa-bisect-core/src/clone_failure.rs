//! Classification of failed clone invocations.
//!
//! The clone tool reports missing maintenance repositories only as free text on
//! its error stream, so the match below is a plain substring check. It is kept
//! in one place so the pattern can follow changes of the tool's wording.

pub const REPOSITORIES_UNAVAILABLE_MARKER: &str =
    "repositories for the below updates are unavailable";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneFailureKind {
    /// Required update repositories are gone; not a defect of the run.
    RepositoriesUnavailable,
    Fatal,
}

impl CloneFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RepositoriesUnavailable => "repositories_unavailable",
            Self::Fatal => "fatal",
        }
    }
}

pub fn classify_clone_failure(error_output: &str) -> CloneFailureKind {
    if error_output
        .to_ascii_lowercase()
        .contains(REPOSITORIES_UNAVAILABLE_MARKER)
    {
        CloneFailureKind::RepositoriesUnavailable
    } else {
        CloneFailureKind::Fatal
    }
}
