use crate::sequence::SequenceError;
use std::path::PathBuf;
use thiserror::Error;

/// Conditions that end a pipeline run with a non-zero exit.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("no news story found")]
    NoStory,

    #[error("no visual assets")]
    NoVisualAssets,

    #[error("no narration audio: {0}")]
    NoNarration(String),

    #[error("missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("input file does not exist: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("{program} exited with {status}")]
    Subprocess { program: String, status: String },

    #[error(transparent)]
    Sequence(#[from] SequenceError),
}

impl PipelineError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoStory => "NO_STORY",
            Self::NoVisualAssets => "NO_VISUAL_ASSETS",
            Self::NoNarration(_) => "NO_NARRATION",
            Self::MissingCredential(_) => "MISSING_CREDENTIAL",
            Self::MissingInput(_) => "MISSING_INPUT",
            Self::Subprocess { .. } => "SUBPROCESS_FAILED",
            Self::Sequence(SequenceError::NoVisualAssets) => "NO_VISUAL_ASSETS",
            Self::Sequence(_) => "SEQUENCE_INVALID",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_errors_keep_their_message() {
        let err: PipelineError = SequenceError::NoVisualAssets.into();
        assert_eq!(err.to_string(), "no visual assets");
        assert_eq!(err.code(), "NO_VISUAL_ASSETS");
    }

    #[test]
    fn sequence_errors_survive_anyhow() {
        let err: anyhow::Error = PipelineError::from(SequenceError::InvalidTarget(0.0)).into();
        let code = err.downcast_ref::<PipelineError>().map(PipelineError::code);
        assert_eq!(code, Some("SEQUENCE_INVALID"));
    }

    #[test]
    fn subprocess_error_names_the_program() {
        let err = PipelineError::Subprocess {
            program: "ffmpeg".to_string(),
            status: "exit status: 1".to_string(),
        };
        assert_eq!(err.to_string(), "ffmpeg exited with exit status: 1");
        assert_eq!(err.code(), "SUBPROCESS_FAILED");
    }
}
