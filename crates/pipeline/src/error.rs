use std::path::PathBuf;

use detectq_inference::InferenceError;

use crate::codec::CodecError;

/// Why a job failed.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    /// A processing stage panicked. The message is the panic payload when
    /// it was a string.
    #[error("Processing panicked: {0}")]
    Panicked(String),
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Short name of the stage that failed, for logs.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Io { .. } => "io",
            Self::Codec(CodecError::Decode(_)) => "decode",
            Self::Codec(CodecError::Encode(_)) => "encode",
            Self::Inference(_) => "inference",
            Self::Panicked(_) => "panic",
        }
    }

    /// Whether the submitted bytes themselves were at fault, as opposed to
    /// the server or the model.
    pub fn is_bad_input(&self) -> bool {
        matches!(self, Self::Codec(CodecError::Decode(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_failures_are_bad_input() {
        let err = PipelineError::from(crate::codec::decode(b"not an image").unwrap_err());
        assert!(err.is_bad_input());
        assert_eq!(err.stage(), "decode");
    }

    #[test]
    fn engine_failures_are_not_bad_input() {
        let err = PipelineError::from(InferenceError::Unavailable("loading".into()));
        assert!(!err.is_bad_input());
        assert_eq!(err.stage(), "inference");
    }

    #[test]
    fn panics_report_their_message() {
        let err = PipelineError::Panicked("boom".into());
        assert_eq!(err.to_string(), "Processing panicked: boom");
    }
}
