//! Failure categories a run can end with.
//!
//! Stage code returns `anyhow::Result` and raises these through `bail!` or
//! `.into()`, so callers can `downcast_ref::<PipelineError>()` to pick an
//! exit status.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required credential is not set.
    #[error("missing required credential: {0}")]
    MissingCredential(&'static str),
    /// A setting is present but unusable.
    #[error("invalid setting {name}={value:?}: {reason}")]
    InvalidSetting {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
    /// A required external program is not on `PATH`.
    #[error("required tool not found in PATH: {0}")]
    MissingTool(&'static str),
    /// A caption override file exists but is not a JSON array of strings.
    #[error("invalid override file {}", .path.display())]
    InvalidOverride {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// Every keyword was searched and no candidate passed the filters.
    #[error("no acceptable candidate for keywords [{}]", .keywords.join(", "))]
    NoAcceptableCandidate { keywords: Vec<String> },
    /// The audio search came back empty.
    #[error("no audio candidate for query {query:?}")]
    NoAudioCandidate { query: String },
    /// ffmpeg exited with a non-zero status.
    #[error("encoder failed ({status}): {args}")]
    EncoderFailed { status: String, args: String },
    /// The file host answered with something that is not a link.
    #[error("upload rejected by file host: {0}")]
    UploadRejected(String),
    /// The used-set record exists but cannot be parsed.
    #[error("corrupt used-set record {}", .path.display())]
    CorruptUsedSet {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl PipelineError {
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            PipelineError::MissingCredential(_)
                | PipelineError::InvalidSetting { .. }
                | PipelineError::MissingTool(_)
                | PipelineError::InvalidOverride { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_search_lists_keywords() {
        let err = PipelineError::NoAcceptableCandidate {
            keywords: vec!["dog".to_string(), "cat".to_string()],
        };
        assert_eq!(err.to_string(), "no acceptable candidate for keywords [dog, cat]");
        assert!(!err.is_configuration());
    }

    #[test]
    fn credential_errors_are_configuration() {
        assert!(PipelineError::MissingCredential("PIXABAY_API_KEY").is_configuration());
        assert!(PipelineError::MissingTool("ffprobe").is_configuration());
    }
}
